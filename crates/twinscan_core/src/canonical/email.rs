//! Email canonicalization.
//!
//! # Invariants
//! - Canonical form is trimmed, lower-case and free of literal `%20`.
//! - Valid addresses end in a label from the TLD reference set.

use super::tld::is_known_tld;
use super::{collect_unique, Canonicalizer};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email regex")
});

const URL_ENCODED_SPACE: &str = "%20";

/// Canonicalizer for email addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailCanonicalizer;

impl Canonicalizer for EmailCanonicalizer {
    fn normalize(&self, raw: &str) -> String {
        let mut value = raw.to_string();
        // Removal can splice a new `%20` together (`%2%200`); repeat to a fixpoint.
        while value.contains(URL_ENCODED_SPACE) {
            value = value.replace(URL_ENCODED_SPACE, "");
        }
        value.trim().to_lowercase()
    }

    fn is_valid(&self, canonical: &str) -> bool {
        let Some((local, domain)) = canonical.rsplit_once('@') else {
            return false;
        };
        if local.is_empty() || domain.is_empty() {
            return false;
        }
        match canonical.rsplit_once('.') {
            Some((_, tld)) => is_known_tld(tld),
            None => false,
        }
    }

    /// Shape-only matches produce version strings and file names
    /// (`jquery@3.5.min.js`); the TLD check removes them.
    fn extract(&self, text: &str) -> Vec<String> {
        collect_unique(
            EMAIL_RE.find_iter(text).map(|found| found.as_str()),
            |candidate| self.is_valid(&self.normalize(candidate)),
        )
    }
}
