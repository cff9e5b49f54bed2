//! Three-way endpoint merge (link index, robots rules, sitemap entries).
//!
//! # Responsibility
//! - Key endpoints by lower-cased path without trailing slash.
//! - Overlay robots and sitemap results onto the link index when newer.
//! - Order the snapshot: domain root first, then newest first.
//!
//! # Invariants
//! - Static assets and archive self-links never enter the merge.
//! - A non-base source only replaces a base entry with a strictly newer
//!   snapshot date.
//! - Output is never empty; a single placeholder stands in for no data.

use super::merge::latest_by_key;
use crate::model::record::{CanonicalRecord, RawCandidate, SourceTag};
use crate::model::sentinel::is_placeholder_text;
use chrono::NaiveDate;
use log::debug;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Path suffixes treated as noise for endpoint discovery.
pub const STATIC_ASSET_SUFFIXES: &[&str] =
    &[".js", ".css", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico"];

const ARCHIVE_SELF_LINK: &str = "/web/";

/// Endpoint candidates grouped by the source that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSources {
    /// Base map; CDX link-index results.
    pub link_index: Vec<RawCandidate>,
    pub robots: Vec<RawCandidate>,
    pub sitemap: Vec<RawCandidate>,
}

impl EndpointSources {
    /// Partitions candidates by source tag, keeping per-source order.
    ///
    /// Candidates from non-endpoint sources are ignored.
    pub fn from_candidates(candidates: impl IntoIterator<Item = RawCandidate>) -> Self {
        let mut sources = Self::default();
        for candidate in candidates {
            match candidate.source() {
                SourceTag::Cdx => sources.link_index.push(candidate),
                SourceTag::Robots => sources.robots.push(candidate),
                SourceTag::Sitemap => sources.sitemap.push(candidate),
                other => debug!(
                    "event=endpoint_partition module=reconcile status=skipped source={}",
                    other
                ),
            }
        }
        sources
    }
}

/// Returns the merge key for `url`, or `None` when the URL is excluded.
///
/// The key is the lower-cased path with trailing slashes removed; the
/// domain root maps to the empty key.
pub fn endpoint_key(url: &str) -> Option<String> {
    let key = url_path(url).trim_end_matches('/').to_lowercase();
    if key.contains(ARCHIVE_SELF_LINK) {
        return None;
    }
    if STATIC_ASSET_SUFFIXES
        .iter()
        .any(|suffix| key.ends_with(suffix))
    {
        return None;
    }
    Some(key)
}

/// Merges the three endpoint sources into one ordered snapshot.
pub fn merge_endpoints(
    domain: &str,
    sources: EndpointSources,
    discovered: NaiveDate,
) -> Vec<CanonicalRecord> {
    let mut combined = collapse(sources.link_index, discovered);

    for overlay in [sources.robots, sources.sitemap] {
        for (key, record) in collapse(overlay, discovered) {
            match combined.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    if record.provenance_date > slot.get().provenance_date {
                        slot.insert(record);
                    }
                }
            }
        }
    }

    debug!(
        "event=endpoint_merge module=reconcile survivors={}",
        combined.len()
    );
    order_endpoints(domain, combined.into_values().collect(), discovered)
}

fn collapse(
    candidates: Vec<RawCandidate>,
    discovered: NaiveDate,
) -> BTreeMap<String, CanonicalRecord> {
    latest_by_key(
        candidates
            .iter()
            .filter_map(|candidate| to_endpoint_record(candidate, discovered)),
        |record| Some(record.key.clone()),
        |record| record.provenance_date,
    )
}

fn to_endpoint_record(candidate: &RawCandidate, discovered: NaiveDate) -> Option<CanonicalRecord> {
    let url = candidate.identifier_raw().trim();
    if is_placeholder_text(url) {
        return None;
    }
    let key = endpoint_key(url)?;
    Some(CanonicalRecord::new(
        key,
        url,
        candidate.provenance(),
        discovered,
    ))
}

fn order_endpoints(
    domain: &str,
    records: Vec<CanonicalRecord>,
    discovered: NaiveDate,
) -> Vec<CanonicalRecord> {
    if records.is_empty() {
        return vec![CanonicalRecord::placeholder(discovered)];
    }

    let (roots, mut others): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| is_domain_root(&record.display_value, domain));
    others.sort_by(newest_then_url);

    let mut ordered = Vec::with_capacity(roots.len() + others.len());
    ordered.extend(roots);
    ordered.extend(others);
    ordered
}

fn newest_then_url(left: &CanonicalRecord, right: &CanonicalRecord) -> Ordering {
    right
        .provenance_date
        .cmp(&left.provenance_date)
        .then_with(|| {
            left.display_value
                .to_lowercase()
                .cmp(&right.display_value.to_lowercase())
        })
}

fn is_domain_root(url: &str, domain: &str) -> bool {
    let trimmed = url.trim().trim_end_matches('/');
    ["https://", "http://"].iter().any(|scheme| {
        trimmed
            .strip_prefix(scheme)
            .or_else(|| {
                trimmed
                    .get(..scheme.len())
                    .filter(|head| head.eq_ignore_ascii_case(scheme))
                    .map(|_| &trimmed[scheme.len()..])
            })
            .is_some_and(|host| host.eq_ignore_ascii_case(domain))
    })
}

/// Returns the path component of `url` (no query or fragment).
fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let Some(slash) = without_scheme.find('/') else {
        return "";
    };
    let path = &without_scheme[slash..];
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}
