//! Breach exposure lookup (`leaked` auxiliary value).
//!
//! # Responsibility
//! - Ask a breach search service whether a plaintext password leaked for
//!   an identifier.
//! - Annotate records sequentially, one lookup per real record.
//!
//! # Invariants
//! - No request is made without credentials.
//! - Placeholder records are never looked up; they carry the "no data
//!   found" sentinel instead.

use crate::config::BreachSettings;
use crate::model::record::{CanonicalRecord, AUX_LEAKED};
use crate::model::sentinel::{NO_DATA_FOUND, NO_QUERY_POSSIBLE};
use crate::source::{HttpClient, SourceError};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEHASHED_SEARCH_URL: &str = "https://api.dehashed.com/v2/search";
const DEHASHED_KEY_HEADER: &str = "Dehashed-Api-Key";
const DEHASHED_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakStatus {
    Leaked,
    NotLeaked,
    NoQueryPossible,
}

impl LeakStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leaked => "yes",
            Self::NotLeaked => "no",
            Self::NoQueryPossible => NO_QUERY_POSSIBLE,
        }
    }
}

#[derive(Debug)]
pub enum LookupError {
    MissingCredentials,
    Http(SourceError),
    Status(u16),
    Parse(String),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "breach lookup has no API key"),
            Self::Http(err) => write!(f, "breach lookup transport failed: {err}"),
            Self::Status(status) => write!(f, "breach lookup returned status {status}"),
            Self::Parse(message) => write!(f, "breach lookup response unreadable: {message}"),
        }
    }
}

impl Error for LookupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for LookupError {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::Status { status, .. } => Self::Status(status),
            SourceError::Parse(message) => Self::Parse(message),
            other => Self::Http(other),
        }
    }
}

/// Breach exposure service.
pub trait BreachLookup {
    fn try_lookup(&self, identifier: &str) -> Result<LeakStatus, LookupError>;

    /// Any failure maps to `NoQueryPossible`.
    fn lookup(&self, identifier: &str) -> LeakStatus {
        self.try_lookup(identifier).unwrap_or_else(|err| {
            warn!("event=breach_lookup module=enrich status=error error={err}");
            LeakStatus::NoQueryPossible
        })
    }
}

/// DeHashed v2 search client.
pub struct DehashedLookup<'a> {
    http: &'a dyn HttpClient,
    api_key: Option<String>,
    timeout: Duration,
}

impl<'a> DehashedLookup<'a> {
    pub fn new(http: &'a dyn HttpClient, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            api_key,
            timeout,
        }
    }

    pub fn from_settings(http: &'a dyn HttpClient, settings: &BreachSettings) -> Self {
        Self::new(http, settings.resolve_api_key(), settings.timeout())
    }
}

impl BreachLookup for DehashedLookup<'_> {
    fn try_lookup(&self, identifier: &str) -> Result<LeakStatus, LookupError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LookupError::MissingCredentials)?;
        let body = json!({
            "query": identifier,
            "page": 1,
            "size": DEHASHED_PAGE_SIZE,
        });
        let response = self.http.post_json(
            DEHASHED_SEARCH_URL,
            &[(DEHASHED_KEY_HEADER, api_key)],
            &body,
            self.timeout,
        )?;
        leak_status_from_response(&response)
    }
}

/// Enrichment switched off: every lookup is `NoQueryPossible`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLookup;

impl BreachLookup for DisabledLookup {
    fn try_lookup(&self, _identifier: &str) -> Result<LeakStatus, LookupError> {
        Ok(LeakStatus::NoQueryPossible)
    }
}

/// `Leaked` when any entry carries a non-blank password.
///
/// `password` may be a string or a list of strings. A response without
/// entries means the identifier is unknown to the service.
pub fn leak_status_from_response(response: &Value) -> Result<LeakStatus, LookupError> {
    let entries = match response.get("entries") {
        None | Some(Value::Null) => return Ok(LeakStatus::NotLeaked),
        Some(entries) => entries,
    };
    let entries = entries
        .as_array()
        .ok_or_else(|| LookupError::Parse("`entries` is not a list".to_string()))?;

    let leaked = entries.iter().any(|entry| match entry.get("password") {
        Some(Value::String(password)) => !password.trim().is_empty(),
        Some(Value::Array(passwords)) => passwords
            .iter()
            .filter_map(Value::as_str)
            .any(|password| !password.trim().is_empty()),
        _ => false,
    });
    Ok(if leaked {
        LeakStatus::Leaked
    } else {
        LeakStatus::NotLeaked
    })
}

/// Sets `leaked` on every record, in order.
pub fn enrich_records(records: &mut [CanonicalRecord], lookup: &dyn BreachLookup) {
    let mut queried = 0usize;
    for record in records.iter_mut() {
        if record.is_placeholder() {
            record.set_auxiliary(AUX_LEAKED, NO_DATA_FOUND);
            continue;
        }
        let status = lookup.lookup(&record.display_value);
        debug!(
            "event=breach_lookup module=enrich identifier={} status={}",
            record.display_value,
            status.as_str()
        );
        record.set_auxiliary(AUX_LEAKED, status.as_str());
        queried += 1;
    }
    info!("event=enrich module=enrich records={} queried={}", records.len(), queried);
}
