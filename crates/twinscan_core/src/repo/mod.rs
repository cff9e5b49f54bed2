//! Persistence contracts for domain snapshots.
//!
//! # Responsibility
//! - Define the snapshot store contract used by the scan service.
//! - Keep SQL details out of orchestration code.
//!
//! # Invariants
//! - Repositories only accept connections with the current schema.

pub mod snapshot_repo;

pub use snapshot_repo::{RepoError, RepoResult, SnapshotRepository, SqliteSnapshotRepository};
