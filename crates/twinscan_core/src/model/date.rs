//! Provenance date value and its lenient parser.
//!
//! # Invariants
//! - Parsing never fails; bad input maps to [`ProvenanceDate::MIN`].
//! - `MIN` sorts below every valid date and renders as `0000-00-00`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Rendered form of [`ProvenanceDate::MIN`].
pub const MIN_DATE_TEXT: &str = "0000-00-00";

/// Date a source claims to have observed an identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProvenanceDate(Option<NaiveDate>);

impl ProvenanceDate {
    /// Minimum-date sentinel for missing or unparseable source dates.
    pub const MIN: Self = Self(None);

    pub fn from_date(date: NaiveDate) -> Self {
        Self(Some(date))
    }

    /// Parses `YYYYMMDD` (optionally followed by more timestamp digits) or
    /// `YYYY-MM-DD` (optionally followed by a `T`/space time part).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self(parse_compact(trimmed).or_else(|| parse_iso(trimmed)))
    }

    /// Same as [`ProvenanceDate::parse`], with `None` mapping to `MIN`.
    pub fn parse_opt(raw: Option<&str>) -> Self {
        raw.map_or(Self::MIN, Self::parse)
    }

    pub fn is_min(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the `YYYYMMDD` form used by archive timestamps.
    pub fn compact(&self) -> Option<String> {
        self.0
            .map(|date| format!("{:04}{:02}{:02}", date.year(), date.month(), date.day()))
    }
}

impl From<NaiveDate> for ProvenanceDate {
    fn from(value: NaiveDate) -> Self {
        Self::from_date(value)
    }
}

impl Display for ProvenanceDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            None => f.write_str(MIN_DATE_TEXT),
        }
    }
}

impl Serialize for ProvenanceDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProvenanceDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

fn parse_compact(value: &str) -> Option<NaiveDate> {
    let head = value.get(..8)?;
    let tail = &value[8..];
    if !head.bytes().all(|b| b.is_ascii_digit()) || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    ymd(&head[..4], &head[4..6], &head[6..8])
}

fn parse_iso(value: &str) -> Option<NaiveDate> {
    let head = value.get(..10)?;
    let tail = &value[10..];
    if !(tail.is_empty() || tail.starts_with('T') || tail.starts_with(' ')) {
        return None;
    }
    let bytes = head.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    ymd(&head[..4], &head[5..7], &head[8..10])
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    if ![year, month, day]
        .iter()
        .all(|part| part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
