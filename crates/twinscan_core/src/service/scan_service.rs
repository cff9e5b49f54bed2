//! Scan orchestration per attribute kind and domain.
//!
//! # Responsibility
//! - Drive fetch, reconcile, placeholder filter, enrichment and persist for
//!   one attribute kind of one domain.
//! - Serve the persisted snapshot back to callers.
//!
//! # Invariants
//! - Callers always receive a non-empty row list: records, one `{error}`
//!   row, or one `{info}` row.
//! - A source failure never aborts a scan; only a blank domain or a store
//!   failure does.
//! - A successful scan fully replaces the previous snapshot of the domain.
//!
//! # See also
//! - `source::catalog` for the per-kind adapter order.

use crate::config::LimitSettings;
use crate::enrich::{enrich_records, BreachLookup};
use crate::model::attribute::AttributeKind;
use crate::model::record::{CanonicalRecord, RawCandidate, SnapshotRow, AUX_LEAKED};
use crate::model::sentinel::{NOT_YET_SCANNED, NO_DATA_FOUND};
use crate::reconcile::{merge_endpoints, or_placeholder, reconcile, retain_real, EndpointSources};
use crate::repo::{RepoError, SnapshotRepository};
use crate::source::{CrawlTarget, SourceCatalog};
use chrono::{Local, NaiveDate};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Reasons a scan produces an `{error}` row.
#[derive(Debug)]
pub enum ScanError {
    BlankDomain,
    /// The endpoint snapshot feeding the page crawl could not be read.
    EndpointSnapshot(RepoError),
    Persist(RepoError),
}

impl Display for ScanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankDomain => write!(f, "domain must not be empty"),
            Self::EndpointSnapshot(err) => {
                write!(f, "failed to load endpoint snapshot for crawl: {err}")
            }
            Self::Persist(err) => write!(f, "failed to store snapshot: {err}"),
        }
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BlankDomain => None,
            Self::EndpointSnapshot(err) | Self::Persist(err) => Some(err),
        }
    }
}

/// Use-case service over a snapshot repository and a source catalog.
pub struct ScanService<'a, R: SnapshotRepository> {
    repo: R,
    catalog: &'a dyn SourceCatalog,
    breach: &'a dyn BreachLookup,
    limits: LimitSettings,
    today: Option<NaiveDate>,
}

impl<'a, R: SnapshotRepository> ScanService<'a, R> {
    pub fn new(repo: R, catalog: &'a dyn SourceCatalog, breach: &'a dyn BreachLookup) -> Self {
        Self {
            repo,
            catalog,
            breach,
            limits: LimitSettings::default(),
            today: None,
        }
    }

    pub fn with_limits(mut self, limits: LimitSettings) -> Self {
        self.limits = limits;
        self
    }

    /// Pins the discovery date instead of the local calendar day.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Runs a full scan and returns caller-facing rows.
    pub fn scan(&mut self, kind: AttributeKind, domain: &str) -> Vec<SnapshotRow> {
        match self.try_scan(kind, domain) {
            Ok(records) => records.into_iter().map(SnapshotRow::from).collect(),
            Err(err) => vec![SnapshotRow::error(err.to_string())],
        }
    }

    /// Runs a full scan and persists the resulting snapshot.
    ///
    /// # Errors
    /// - `BlankDomain` before any source is queried.
    /// - `EndpointSnapshot` when the crawl input cannot be read.
    /// - `Persist` when the snapshot cannot be replaced; the previous
    ///   snapshot then stays intact.
    pub fn try_scan(
        &mut self,
        kind: AttributeKind,
        domain: &str,
    ) -> Result<Vec<CanonicalRecord>, ScanError> {
        let domain = domain.trim();
        if domain.is_empty() {
            error!(
                "event=scan_rejected module=pipeline attribute={} reason=blank_domain",
                kind
            );
            return Err(ScanError::BlankDomain);
        }

        let scan_id = Uuid::new_v4();
        let today = self.today();
        let started_at = Instant::now();
        info!(
            "event=scan_start module=pipeline attribute={} scan_id={}",
            kind, scan_id
        );

        let result = self.collect(kind, domain, today).and_then(|records| {
            self.repo
                .replace_snapshot(kind, domain, &records)
                .map(|_| records)
                .map_err(ScanError::Persist)
        });

        match &result {
            Ok(records) => info!(
                "event=scan_done module=pipeline status=ok attribute={} scan_id={} rows={} duration_ms={}",
                kind,
                scan_id,
                records.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=scan_done module=pipeline status=error attribute={} scan_id={} duration_ms={} error={}",
                kind,
                scan_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Returns the persisted snapshot, or a single `{info}` row when the
    /// domain was never scanned for `kind`.
    pub fn get(&self, kind: AttributeKind, domain: &str) -> Vec<SnapshotRow> {
        let domain = domain.trim();
        if domain.is_empty() {
            return vec![SnapshotRow::error(ScanError::BlankDomain.to_string())];
        }
        match self.repo.list_by_domain(kind, domain) {
            Ok(records) if records.is_empty() => vec![SnapshotRow::info(NOT_YET_SCANNED)],
            Ok(records) => records.into_iter().map(SnapshotRow::from).collect(),
            Err(err) => {
                error!(
                    "event=snapshot_get module=pipeline status=error attribute={} error={}",
                    kind, err
                );
                vec![SnapshotRow::error(err.to_string())]
            }
        }
    }

    fn collect(
        &self,
        kind: AttributeKind,
        domain: &str,
        today: NaiveDate,
    ) -> Result<Vec<CanonicalRecord>, ScanError> {
        let Some(canonicalizer) = kind.canonicalizer() else {
            let candidates = self.fetch_all(kind, domain, Vec::new(), today);
            let sources = EndpointSources::from_candidates(candidates);
            return Ok(merge_endpoints(domain, sources, today));
        };

        let endpoints = self
            .repo
            .list_by_domain(AttributeKind::Endpoint, domain)
            .map_err(ScanError::EndpointSnapshot)?;
        let targets =
            CrawlTarget::from_endpoint_snapshot(&endpoints, self.limits.max_archived_pages);

        let candidates = self.fetch_all(kind, domain, targets, today);
        let mut records = retain_real(reconcile(candidates, canonicalizer, today));
        if kind.is_enriched() {
            enrich_records(&mut records, self.breach);
        }

        let mut records = or_placeholder(records, today);
        if kind.is_enriched() {
            for placeholder in records.iter_mut().filter(|record| record.is_placeholder()) {
                placeholder.set_auxiliary(AUX_LEAKED, NO_DATA_FOUND);
            }
        }
        Ok(records)
    }

    fn fetch_all(
        &self,
        kind: AttributeKind,
        domain: &str,
        targets: Vec<CrawlTarget>,
        today: NaiveDate,
    ) -> Vec<RawCandidate> {
        self.catalog
            .sources(kind, targets, today)
            .iter()
            .flat_map(|source| source.fetch(domain))
            .collect()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}
