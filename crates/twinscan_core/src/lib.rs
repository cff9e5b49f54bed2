//! Core of twinscan: multi-source attribute reconciliation per domain.
//! This crate owns every snapshot invariant; outer crates only adapt I/O.

pub mod canonical;
pub mod config;
pub mod db;
pub mod enrich;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;
pub mod source;

pub use canonical::tld::{init_tlds, TldError};
pub use canonical::{Canonicalizer, EmailCanonicalizer, PhoneCanonicalizer};
pub use config::{load_config, ConfigError, ScanConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use enrich::{BreachLookup, DehashedLookup, DisabledLookup, LeakStatus};
pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::attribute::{AttributeKind, AttributeParseError};
pub use model::date::ProvenanceDate;
pub use model::record::{CanonicalRecord, RawCandidate, SnapshotRow, SourceTag};
pub use repo::{RepoError, RepoResult, SnapshotRepository, SqliteSnapshotRepository};
pub use service::{ScanError, ScanService};
pub use source::{ArchiveSourceCatalog, SourceAdapter, SourceCatalog};

/// Minimal health-check API for integration smoke tests.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
