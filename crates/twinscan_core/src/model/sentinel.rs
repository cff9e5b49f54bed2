//! Placeholder texts shared by every attribute pipeline.

/// Identifier text of the synthesized "nothing survived" record.
pub const NO_DATA_FOUND: &str = "No data found";

/// Info text returned by `get` for a domain that was never scanned.
pub const NOT_YET_SCANNED: &str = "Attribute has not been scanned yet.";

/// Auxiliary value written when an enrichment lookup could not run.
pub const NO_QUERY_POSSIBLE: &str = "No query possible";

/// Returns whether `value` carries a placeholder marker instead of data.
pub fn is_placeholder_text(value: &str) -> bool {
    value.trim().is_empty() || value.contains(NO_DATA_FOUND)
}
