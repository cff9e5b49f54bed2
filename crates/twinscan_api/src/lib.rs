//! String-in, JSON-out surface over `twinscan_core`.

mod api;

pub use api::*;
