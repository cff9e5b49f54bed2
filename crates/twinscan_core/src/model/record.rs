//! Candidate and canonical record shapes.
//!
//! # Responsibility
//! - `RawCandidate`: one unverified observation from one source.
//! - `CanonicalRecord`: the surviving, deduplicated observation per key.
//! - `SnapshotRow`: caller-facing envelope with error/info sentinels.
//!
//! # Invariants
//! - `RawCandidate` is immutable after construction.
//! - Placeholder records are recognized by their display value only.

use crate::model::date::ProvenanceDate;
use crate::model::sentinel::{is_placeholder_text, NO_DATA_FOUND};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Auxiliary key holding breach exposure status.
pub const AUX_LEAKED: &str = "leaked";

/// Source that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Archived page bodies from the web archive.
    Wayback,
    Whois,
    CertificateTransparency,
    /// Web archive link index (CDX API).
    Cdx,
    /// Archived robots.txt rules.
    Robots,
    /// Archived sitemap.xml entries.
    Sitemap,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wayback => "wayback",
            Self::Whois => "whois",
            Self::CertificateTransparency => "certificate_transparency",
            Self::Cdx => "cdx",
            Self::Robots => "robots",
            Self::Sitemap => "sitemap",
        }
    }
}

impl Display for SourceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unverified identifier as returned by a source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    identifier_raw: String,
    provenance_raw: Option<String>,
    source: SourceTag,
}

impl RawCandidate {
    pub fn new(
        identifier_raw: impl Into<String>,
        provenance_raw: Option<String>,
        source: SourceTag,
    ) -> Self {
        Self {
            identifier_raw: identifier_raw.into(),
            provenance_raw,
            source,
        }
    }

    /// Shorthand for candidates with a known provenance text.
    pub fn dated(
        identifier_raw: impl Into<String>,
        provenance_raw: impl Into<String>,
        source: SourceTag,
    ) -> Self {
        Self::new(identifier_raw, Some(provenance_raw.into()), source)
    }

    pub fn identifier_raw(&self) -> &str {
        &self.identifier_raw
    }

    pub fn provenance_raw(&self) -> Option<&str> {
        self.provenance_raw.as_deref()
    }

    pub fn source(&self) -> SourceTag {
        self.source
    }

    /// Parsed provenance; unparseable or missing dates map to MIN.
    pub fn provenance(&self) -> ProvenanceDate {
        ProvenanceDate::parse_opt(self.provenance_raw())
    }
}

/// One deduplicated observation inside a domain snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Canonical identifier used for equality.
    pub key: String,
    /// Serialized as `value` to keep persisted rows compact.
    #[serde(rename = "value")]
    pub display_value: String,
    pub provenance_date: ProvenanceDate,
    /// Day the scan that produced this record ran.
    pub discovered_date: NaiveDate,
    #[serde(default)]
    pub auxiliary: BTreeMap<String, String>,
}

impl CanonicalRecord {
    pub fn new(
        key: impl Into<String>,
        display_value: impl Into<String>,
        provenance_date: ProvenanceDate,
        discovered_date: NaiveDate,
    ) -> Self {
        Self {
            key: key.into(),
            display_value: display_value.into(),
            provenance_date,
            discovered_date,
            auxiliary: BTreeMap::new(),
        }
    }

    /// Synthesized "no data found" record.
    ///
    /// The key stays empty so the record can never collide with real data.
    pub fn placeholder(discovered_date: NaiveDate) -> Self {
        Self::new(
            String::new(),
            NO_DATA_FOUND,
            ProvenanceDate::MIN,
            discovered_date,
        )
    }

    pub fn is_placeholder(&self) -> bool {
        is_placeholder_text(&self.display_value)
    }

    pub fn with_auxiliary(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_auxiliary(key, value);
        self
    }

    pub fn set_auxiliary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.auxiliary.insert(key.into(), value.into());
    }

    pub fn auxiliary(&self, key: &str) -> Option<&str> {
        self.auxiliary.get(key).map(String::as_str)
    }
}

/// Caller-facing result row.
///
/// A single `Error` row signals a failed scan; a single `Info` row signals
/// that nothing has been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotRow {
    Error { error: String },
    Info { info: String },
    Record(CanonicalRecord),
}

impl SnapshotRow {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            info: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn as_record(&self) -> Option<&CanonicalRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<CanonicalRecord> for SnapshotRow {
    fn from(value: CanonicalRecord) -> Self {
        Self::Record(value)
    }
}

/// Returns whether `rows` is the single-error failure shape.
pub fn is_failure(rows: &[SnapshotRow]) -> bool {
    matches!(rows, [row] if row.is_error())
}
