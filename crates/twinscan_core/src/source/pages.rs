//! Archived page crawl over a domain's known endpoints.
//!
//! # Responsibility
//! - Select crawl targets from a persisted endpoint snapshot.
//! - Fetch each target's archived capture and extract identifiers.
//!
//! # Invariants
//! - Binary and static assets are never requested.
//! - A failing page is skipped; the crawl itself never fails.

use super::http::HttpClient;
use super::pacing::Pacer;
use super::{SourceAdapter, SourceResult};
use crate::canonical::Canonicalizer;
use crate::model::date::ProvenanceDate;
use crate::model::record::{CanonicalRecord, RawCandidate, SourceTag};
use log::{debug, info};
use std::time::Duration;

const ARCHIVE_PAGE_BASE: &str = "http://web.archive.org/web";

/// URL suffixes whose captures hold no extractable text.
pub const SKIP_SUFFIXES: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".woff", ".woff2", ".ttf", ".eot", ".otf",
    ".pdf", ".zip", ".rar", ".7z", ".mp4", ".mp3", ".avi", ".mov", ".css", ".js", ".ico", ".exe",
    ".dmg",
];

/// An endpoint URL and the capture date to read it at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub snapshot: ProvenanceDate,
}

impl CrawlTarget {
    pub fn new(url: impl Into<String>, snapshot: ProvenanceDate) -> Self {
        Self {
            url: url.into(),
            snapshot,
        }
    }

    /// Picks up to `limit` targets from an endpoint snapshot, newest first.
    ///
    /// Placeholder rows are ignored. Equal dates keep snapshot order.
    pub fn from_endpoint_snapshot(records: &[CanonicalRecord], limit: usize) -> Vec<Self> {
        let mut targets: Vec<Self> = records
            .iter()
            .filter(|record| !record.is_placeholder())
            .map(|record| Self::new(record.display_value.clone(), record.provenance_date))
            .collect();
        targets.sort_by(|left, right| right.snapshot.cmp(&left.snapshot));
        targets.truncate(limit);
        targets
    }

    pub fn is_skipped(&self) -> bool {
        let url = self.url.to_ascii_lowercase();
        SKIP_SUFFIXES.iter().any(|suffix| url.ends_with(suffix))
    }

    /// Capture URL; the archive redirects to the nearest capture of that day.
    pub fn archive_url(&self) -> String {
        match self.snapshot.compact() {
            Some(day) => format!("{ARCHIVE_PAGE_BASE}/{day}000000/{}", self.url),
            None => format!("{ARCHIVE_PAGE_BASE}/{}", self.url),
        }
    }
}

/// Identifiers found in archived captures of known endpoints.
pub struct ArchivedPageSource<'a> {
    http: &'a dyn HttpClient,
    extractor: &'static dyn Canonicalizer,
    targets: Vec<CrawlTarget>,
    pacer: Pacer,
    timeout: Duration,
}

impl<'a> ArchivedPageSource<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        extractor: &'static dyn Canonicalizer,
        targets: Vec<CrawlTarget>,
        pacer: Pacer,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            extractor,
            targets,
            pacer,
            timeout,
        }
    }
}

impl SourceAdapter for ArchivedPageSource<'_> {
    fn tag(&self) -> SourceTag {
        SourceTag::Wayback
    }

    fn try_fetch(&self, _domain: &str) -> SourceResult<Vec<RawCandidate>> {
        let total = self.targets.len();
        let mut candidates = Vec::new();
        let mut fetched = 0usize;

        for (index, target) in self.targets.iter().enumerate() {
            if target.is_skipped() {
                debug!(
                    "event=page_skip module=source reason=suffix position={}/{}",
                    index + 1,
                    total
                );
                continue;
            }
            if fetched > 0 {
                self.pacer.pause();
            }
            fetched += 1;

            let body = match self.http.get_text(&target.archive_url(), self.timeout) {
                Ok(body) => body,
                Err(err) => {
                    debug!(
                        "event=page_fetch module=source status=error position={}/{} error={}",
                        index + 1,
                        total,
                        err
                    );
                    continue;
                }
            };
            let provenance = target.snapshot.compact();
            candidates.extend(
                self.extractor
                    .extract(&body)
                    .into_iter()
                    .map(|found| RawCandidate::new(found, provenance.clone(), SourceTag::Wayback)),
            );
        }

        info!(
            "event=page_crawl module=source targets={} fetched={} candidates={}",
            total,
            fetched,
            candidates.len()
        );
        Ok(candidates)
    }
}
