//! Multi-source reconciliation.
//!
//! # Responsibility
//! - Collapse candidates from all sources into one record per canonical key.
//! - Keep the most recent provenance per key.
//! - Guarantee a non-empty snapshot shape via placeholder synthesis.
//!
//! # Invariants
//! - Output holds at most one record per key.
//! - A parse failure never wins against a valid date; equal dates keep the
//!   first candidate in source iteration order.
//! - Sentinel texts never participate in keyed deduplication.

pub mod endpoint;
mod merge;

pub use endpoint::{endpoint_key, merge_endpoints, EndpointSources};
pub use merge::{latest_by_key, or_placeholder, reconcile, reconcile_snapshot, retain_real};
