//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate sources, reconciliation and the snapshot store into the
//!   `scan`/`get` use cases.
//! - Keep API and CLI layers free of storage and network details.

pub mod scan_service;

pub use scan_service::{ScanError, ScanService};
