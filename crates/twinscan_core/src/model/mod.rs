//! Domain model for attribute snapshots.
//!
//! # Responsibility
//! - Define the transient candidate shape produced by source adapters.
//! - Define the canonical record shape persisted per domain snapshot.
//! - Define the caller-facing row envelope (`record | error | info`).
//!
//! # Invariants
//! - A snapshot holds at most one record per canonical key.
//! - Missing or unparseable provenance dates order below every valid date.
//! - Sentinel texts never act as deduplication keys.

pub mod attribute;
pub mod date;
pub mod record;
pub mod sentinel;
