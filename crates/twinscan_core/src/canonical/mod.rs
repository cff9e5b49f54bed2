//! Identifier canonicalization.
//!
//! # Responsibility
//! - Map raw textual candidates to canonical identifiers.
//! - Reject implausible identifiers after normalization.
//! - Extract identifier-shaped substrings from free text.
//!
//! # Invariants
//! - `normalize` is pure, total and idempotent.
//! - `extract` only returns matches whose normalized form `is_valid`.

mod email;
mod phone;
pub mod tld;

pub use email::EmailCanonicalizer;
pub use phone::PhoneCanonicalizer;

/// Normalization and plausibility contract for one attribute kind.
pub trait Canonicalizer: Sync {
    /// Returns the canonical form of `raw`. Never fails.
    fn normalize(&self, raw: &str) -> String;

    /// Plausibility predicate over a canonical value.
    fn is_valid(&self, canonical: &str) -> bool;

    /// Returns the raw matches found in `text`, first occurrence order,
    /// without duplicates.
    fn extract(&self, text: &str) -> Vec<String>;

    /// Normalizes `raw` and keeps it only when valid.
    fn canonicalize(&self, raw: &str) -> Option<String> {
        let canonical = self.normalize(raw);
        if self.is_valid(&canonical) {
            Some(canonical)
        } else {
            None
        }
    }
}

/// Keeps the first occurrence of every match accepted by `keep`.
fn collect_unique<'t>(
    matches: impl Iterator<Item = &'t str>,
    mut keep: impl FnMut(&str) -> bool,
) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::new();
    for candidate in matches {
        if seen.insert(candidate) && keep(candidate) {
            unique.push(candidate.to_string());
        }
    }
    unique
}
