//! Attribute kinds collected per domain.
//!
//! The set of pipelines is closed: every kind maps to one storage table and,
//! for identifier-like kinds, one canonicalizer.

use crate::canonical::{Canonicalizer, EmailCanonicalizer, PhoneCanonicalizer};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_CANONICALIZER: EmailCanonicalizer = EmailCanonicalizer;
static PHONE_CANONICALIZER: PhoneCanonicalizer = PhoneCanonicalizer;

/// Attribute collected by one scan pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Email addresses seen on archived pages, WHOIS and certificates.
    Email,
    /// Swiss phone numbers seen on archived pages and WHOIS.
    Phone,
    /// Historical URLs from the web archive.
    Endpoint,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 3] = [Self::Email, Self::Phone, Self::Endpoint];

    /// Parses caller input case-insensitively, including a few aliases.
    pub fn parse(value: &str) -> Result<Self, AttributeParseError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" => Err(AttributeParseError::Empty),
            "email" | "mail" => Ok(Self::Email),
            "phone" | "phone_number" => Ok(Self::Phone),
            "endpoint" | "url" | "urls" => Ok(Self::Endpoint),
            _ => Err(AttributeParseError::Unsupported(value.trim().to_string())),
        }
    }

    /// Stable lower-case id used in logs and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Endpoint => "endpoint",
        }
    }

    /// Storage table holding this attribute's snapshots.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Email => "emails",
            Self::Phone => "phones",
            Self::Endpoint => "endpoints",
        }
    }

    /// Canonicalizer for identifier-like kinds; `None` for endpoints.
    pub fn canonicalizer(self) -> Option<&'static dyn Canonicalizer> {
        match self {
            Self::Email => Some(&EMAIL_CANONICALIZER),
            Self::Phone => Some(&PHONE_CANONICALIZER),
            Self::Endpoint => None,
        }
    }

    /// Whether surviving records get a breach lookup.
    pub fn is_enriched(self) -> bool {
        !matches!(self, Self::Endpoint)
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeParseError {
    Empty,
    Unsupported(String),
}

impl Display for AttributeParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "attribute must not be empty"),
            Self::Unsupported(value) => {
                write!(f, "no pipeline registered for attribute `{value}`")
            }
        }
    }
}

impl Error for AttributeParseError {}

#[cfg(test)]
mod tests {
    use super::{AttributeKind, AttributeParseError};

    #[test]
    fn parses_case_insensitively_with_aliases() {
        assert_eq!(AttributeKind::parse("EMAIL").unwrap(), AttributeKind::Email);
        assert_eq!(AttributeKind::parse(" mail ").unwrap(), AttributeKind::Email);
        assert_eq!(AttributeKind::parse("Phone").unwrap(), AttributeKind::Phone);
        assert_eq!(AttributeKind::parse("urls").unwrap(), AttributeKind::Endpoint);
    }

    #[test]
    fn rejects_blank_and_unknown_attributes() {
        assert_eq!(AttributeKind::parse("  "), Err(AttributeParseError::Empty));
        let err = AttributeKind::parse("MX").unwrap_err();
        assert_eq!(err, AttributeParseError::Unsupported("MX".to_string()));
        assert!(err.to_string().contains("`MX`"));
    }

    #[test]
    fn only_identifier_kinds_have_canonicalizers() {
        assert!(AttributeKind::Email.canonicalizer().is_some());
        assert!(AttributeKind::Phone.canonicalizer().is_some());
        assert!(AttributeKind::Endpoint.canonicalizer().is_none());
        assert!(!AttributeKind::Endpoint.is_enriched());
    }

    #[test]
    fn table_names_are_distinct() {
        let mut names: Vec<_> = AttributeKind::ALL.iter().map(|k| k.table_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 3);
    }
}
