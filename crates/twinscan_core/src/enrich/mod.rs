//! Post-merge enrichment of surviving records.
//!
//! # Invariants
//! - Enrichment never removes or reorders records.
//! - Lookup failures become a sentinel value on the record, never an error.

pub mod breach;

pub use breach::{
    enrich_records, BreachLookup, DehashedLookup, DisabledLookup, LeakStatus, LookupError,
};
