//! Best-effort source adapters.
//!
//! # Responsibility
//! - Turn one external source into `RawCandidate`s for a domain.
//! - Contain every transport and parse failure inside the adapter.
//!
//! # Invariants
//! - `SourceAdapter::fetch` never fails; errors are logged and become an
//!   empty candidate list.
//! - Adapters do no canonicalization beyond extraction from free text.

use crate::model::record::{RawCandidate, SourceTag};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub mod catalog;
pub mod crtsh;
pub mod http;
pub mod pacing;
pub mod pages;
pub mod wayback;
pub mod whois;

pub use catalog::{ArchiveSourceCatalog, SourceCatalog};
pub use http::{HttpClient, ReqwestHttpClient};
pub use pacing::Pacer;
pub use pages::{ArchivedPageSource, CrawlTarget};
pub use whois::WhoisSource;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug)]
pub enum SourceError {
    /// Transport failure (connect, TLS, body read).
    Http(String),
    /// Non-success HTTP status.
    Status { url: String, status: u16 },
    Parse(String),
    Timeout,
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(message) => write!(f, "http error: {message}"),
            Self::Status { url, status } => write!(f, "http status {status} from {url}"),
            Self::Parse(message) => write!(f, "unparseable source response: {message}"),
            Self::Timeout => write!(f, "source timed out"),
        }
    }
}

impl Error for SourceError {}

impl From<serde_json::Error> for SourceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// One external source queried per domain.
pub trait SourceAdapter {
    fn tag(&self) -> SourceTag;

    /// Queries the source. Implementations may fail; callers use `fetch`.
    fn try_fetch(&self, domain: &str) -> SourceResult<Vec<RawCandidate>>;

    /// Queries the source, degrading any failure to an empty result.
    fn fetch(&self, domain: &str) -> Vec<RawCandidate> {
        let started_at = Instant::now();
        match self.try_fetch(domain) {
            Ok(candidates) => {
                info!(
                    "event=source_fetch module=source status=ok source={} candidates={} duration_ms={}",
                    self.tag(),
                    candidates.len(),
                    started_at.elapsed().as_millis()
                );
                candidates
            }
            Err(err) => {
                warn!(
                    "event=source_fetch module=source status=error source={} duration_ms={} error={}",
                    self.tag(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Vec::new()
            }
        }
    }
}
