//! Swiss phone number canonicalization (`+41XXXXXXXXX`).

use super::{collect_unique, Canonicalizer};
use once_cell::sync::Lazy;
use regex::Regex;

// `0041` comes first so the national form cannot claim its leading digits.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"0041\s?\d{2}\s?\d{3}\s?\d{2}\s?\d{2}|\+41\s?\d{2}\s?\d{3}\s?\d{2}\s?\d{2}|0\d{2}\s?\d{3}\s?\d{2}\s?\d{2}",
    )
    .expect("valid phone regex")
});

const COUNTRY_PREFIX: &str = "+41";
const INTERNATIONAL_PREFIX: &str = "0041";
const TRUNK_PREFIX: char = '0';
const BOGUS_PREFIX: &str = "+4100";

/// Canonicalizer for Swiss phone numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneCanonicalizer;

impl Canonicalizer for PhoneCanonicalizer {
    fn normalize(&self, raw: &str) -> String {
        let compact: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '/'))
            .collect();
        let compact = compact.trim();

        if let Some(rest) = compact.strip_prefix(INTERNATIONAL_PREFIX) {
            format!("{COUNTRY_PREFIX}{rest}")
        } else if let Some(rest) = compact.strip_prefix(TRUNK_PREFIX) {
            format!("{COUNTRY_PREFIX}{rest}")
        } else {
            compact.to_string()
        }
    }

    /// `+4100…` comes from normalizing a number that was already
    /// international as if it carried a trunk code.
    fn is_valid(&self, canonical: &str) -> bool {
        canonical.starts_with(COUNTRY_PREFIX) && !canonical.starts_with(BOGUS_PREFIX)
    }

    fn extract(&self, text: &str) -> Vec<String> {
        collect_unique(
            PHONE_RE.find_iter(text).map(|found| found.as_str()),
            |candidate| self.is_valid(&self.normalize(candidate)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::PhoneCanonicalizer;
    use crate::canonical::Canonicalizer;

    #[test]
    fn normalizes_national_and_international_forms() {
        let canon = PhoneCanonicalizer;
        assert_eq!(canon.normalize("079 123 45 67"), "+41791234567");
        assert_eq!(canon.normalize("0041 44 123 45 67"), "+41441234567");
        assert_eq!(canon.normalize("+41 44 123 45 67"), "+41441234567");
        assert_eq!(canon.normalize("044-123/45 67"), "+41441234567");
    }

    #[test]
    fn normalization_is_idempotent() {
        let canon = PhoneCanonicalizer;
        for raw in ["079 123 45 67", "0041791234567", "+41 79 123 45 67", "00123"] {
            let once = canon.normalize(raw);
            assert_eq!(canon.normalize(&once), once);
        }
    }

    #[test]
    fn rejects_foreign_and_bogus_prefixes() {
        let canon = PhoneCanonicalizer;
        assert!(canon.is_valid("+41791234567"));
        assert!(!canon.is_valid("+4100123"));
        assert!(!canon.is_valid("+49301234567"));
        assert!(!canon.is_valid(""));
    }

    #[test]
    fn extracts_all_written_forms() {
        let canon = PhoneCanonicalizer;
        let text = "Tel. +41 79 123 45 67, Fax 044 123 45 68, Hotline 0041 58 123 45 69 \
                    und 0041581234570.";
        let found = canon.extract(text);
        let normalized: Vec<String> = found.iter().map(|raw| canon.normalize(raw)).collect();
        assert_eq!(
            normalized,
            vec![
                "+41791234567".to_string(),
                "+41441234568".to_string(),
                "+41581234569".to_string(),
                "+41581234570".to_string(),
            ]
        );
    }
}
