use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use twinscan_core::config::LimitSettings;
use twinscan_core::db::open_db_in_memory;
use twinscan_core::enrich::{BreachLookup, LeakStatus, LookupError};
use twinscan_core::model::record::AUX_LEAKED;
use twinscan_core::model::sentinel::{NOT_YET_SCANNED, NO_DATA_FOUND, NO_QUERY_POSSIBLE};
use twinscan_core::source::{CrawlTarget, SourceError, SourceResult};
use twinscan_core::{
    AttributeKind, RawCandidate, ScanService, SnapshotRow, SourceAdapter, SourceCatalog,
    SourceTag, SqliteSnapshotRepository,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

struct ScriptedSource {
    tag: SourceTag,
    candidates: Option<Vec<RawCandidate>>,
}

impl SourceAdapter for ScriptedSource {
    fn tag(&self) -> SourceTag {
        self.tag
    }

    fn try_fetch(&self, _domain: &str) -> SourceResult<Vec<RawCandidate>> {
        self.candidates.clone().ok_or(SourceError::Timeout)
    }
}

/// Per-kind list of `(tag, candidates)`; `None` candidates simulate an
/// unreachable source.
#[derive(Default)]
struct ScriptedCatalog {
    script: HashMap<AttributeKind, Vec<(SourceTag, Option<Vec<RawCandidate>>)>>,
    crawl_targets: RefCell<Vec<CrawlTarget>>,
}

impl ScriptedCatalog {
    fn with(
        mut self,
        kind: AttributeKind,
        tag: SourceTag,
        candidates: Option<Vec<RawCandidate>>,
    ) -> Self {
        self.script.entry(kind).or_default().push((tag, candidates));
        self
    }
}

impl SourceCatalog for ScriptedCatalog {
    fn sources<'s>(
        &'s self,
        kind: AttributeKind,
        crawl_targets: Vec<CrawlTarget>,
        _today: NaiveDate,
    ) -> Vec<Box<dyn SourceAdapter + 's>> {
        *self.crawl_targets.borrow_mut() = crawl_targets;
        self.script
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|(tag, candidates)| {
                Box::new(ScriptedSource {
                    tag: *tag,
                    candidates: candidates.clone(),
                }) as Box<dyn SourceAdapter + 's>
            })
            .collect()
    }
}

/// Leaked when the identifier starts with `x@`; records every query.
#[derive(Default)]
struct RecordingLookup {
    queried: RefCell<Vec<String>>,
}

impl BreachLookup for RecordingLookup {
    fn try_lookup(&self, identifier: &str) -> Result<LeakStatus, LookupError> {
        self.queried.borrow_mut().push(identifier.to_string());
        match identifier {
            id if id.starts_with("x@") => Ok(LeakStatus::Leaked),
            id if id.starts_with("quota@") => Err(LookupError::Status(429)),
            _ => Ok(LeakStatus::NotLeaked),
        }
    }
}

fn dated(value: &str, date: &str, tag: SourceTag) -> RawCandidate {
    RawCandidate::dated(value, date, tag)
}

#[test]
fn domain_without_any_data_yields_single_placeholder() {
    let mut conn = open_db_in_memory().unwrap();
    let catalog = ScriptedCatalog::default()
        .with(AttributeKind::Email, SourceTag::Wayback, Some(Vec::new()))
        .with(AttributeKind::Email, SourceTag::Whois, None)
        .with(AttributeKind::Email, SourceTag::CertificateTransparency, Some(Vec::new()));
    let lookup = RecordingLookup::default();
    let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
    let mut service = ScanService::new(repo, &catalog, &lookup).with_today(today());

    let rows = service.scan(AttributeKind::Email, "nodata.test");
    assert_eq!(rows.len(), 1);
    let placeholder = rows[0].as_record().expect("placeholder record");
    assert_eq!(placeholder.display_value, NO_DATA_FOUND);
    assert!(placeholder.provenance_date.is_min());
    assert_eq!(placeholder.discovered_date, today());
    assert_eq!(placeholder.auxiliary(AUX_LEAKED), Some(NO_DATA_FOUND));
    assert!(lookup.queried.borrow().is_empty());

    assert_eq!(service.get(AttributeKind::Email, "nodata.test"), rows);
}

#[test]
fn case_variants_collapse_to_latest_observation() {
    let mut conn = open_db_in_memory().unwrap();
    let catalog = ScriptedCatalog::default()
        .with(
            AttributeKind::Email,
            SourceTag::Wayback,
            Some(vec![
                dated("x@example.com", "20230101000000", SourceTag::Wayback),
                dated("info@example.com", "20220101", SourceTag::Wayback),
            ]),
        )
        .with(
            AttributeKind::Email,
            SourceTag::Whois,
            Some(vec![
                dated("X@Example.com", "2023-06-01", SourceTag::Whois),
                dated("quota@example.com", "2023-06-01", SourceTag::Whois),
            ]),
        );
    let lookup = RecordingLookup::default();
    let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
    let mut service = ScanService::new(repo, &catalog, &lookup).with_today(today());

    let rows = service.scan(AttributeKind::Email, "example.com");
    let records: Vec<_> = rows.iter().filter_map(SnapshotRow::as_record).collect();
    let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["info@example.com", "quota@example.com", "x@example.com"]
    );

    let x = records[2];
    assert_eq!(x.provenance_date.to_string(), "2023-06-01");
    assert_eq!(x.auxiliary(AUX_LEAKED), Some("yes"));
    assert_eq!(records[0].auxiliary(AUX_LEAKED), Some("no"));
    assert_eq!(records[1].auxiliary(AUX_LEAKED), Some(NO_QUERY_POSSIBLE));
    assert_eq!(lookup.queried.borrow().len(), 3);
}

#[test]
fn get_before_any_scan_reports_not_yet_scanned() {
    let mut conn = open_db_in_memory().unwrap();
    let catalog = ScriptedCatalog::default();
    let lookup = RecordingLookup::default();
    let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
    let service = ScanService::new(repo, &catalog, &lookup);

    assert_eq!(
        service.get(AttributeKind::Phone, "a.ch"),
        vec![SnapshotRow::info(NOT_YET_SCANNED)]
    );
}

#[test]
fn endpoint_scan_feeds_page_crawl_of_later_scans() {
    let mut conn = open_db_in_memory().unwrap();
    let catalog = ScriptedCatalog::default()
        .with(
            AttributeKind::Endpoint,
            SourceTag::Cdx,
            Some(vec![
                dated("https://a.ch/", "20190101000000", SourceTag::Cdx),
                dated("https://a.ch/a", "20200101000000", SourceTag::Cdx),
                dated("https://a.ch/app.js", "20240101000000", SourceTag::Cdx),
                dated("https://a.ch/kontakt", "20220101000000", SourceTag::Cdx),
            ]),
        )
        .with(
            AttributeKind::Endpoint,
            SourceTag::Robots,
            Some(vec![dated("https://a.ch/a", "20210101000000", SourceTag::Robots)]),
        )
        .with(AttributeKind::Endpoint, SourceTag::Sitemap, None)
        .with(
            AttributeKind::Phone,
            SourceTag::Wayback,
            Some(vec![dated("044 123 45 67", "20220101", SourceTag::Wayback)]),
        );
    let lookup = RecordingLookup::default();
    let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
    let limits = LimitSettings {
        max_archived_pages: 2,
        ..LimitSettings::default()
    };
    let mut service = ScanService::new(repo, &catalog, &lookup)
        .with_limits(limits)
        .with_today(today());

    let endpoints = service.scan(AttributeKind::Endpoint, "a.ch");
    let urls: Vec<_> = endpoints
        .iter()
        .filter_map(SnapshotRow::as_record)
        .map(|r| (r.display_value.as_str(), r.provenance_date.to_string()))
        .collect();
    assert_eq!(
        urls,
        vec![
            ("https://a.ch/", "2019-01-01".to_string()),
            ("https://a.ch/kontakt", "2022-01-01".to_string()),
            ("https://a.ch/a", "2021-01-01".to_string()),
        ]
    );
    assert!(endpoints
        .iter()
        .filter_map(SnapshotRow::as_record)
        .all(|r| r.auxiliary.is_empty()));

    let phones = service.scan(AttributeKind::Phone, "a.ch");
    assert_eq!(phones[0].as_record().unwrap().display_value, "+41441234567");

    let crawled: Vec<_> = catalog
        .crawl_targets
        .borrow()
        .iter()
        .map(|t| t.url.clone())
        .collect();
    assert_eq!(crawled, vec!["https://a.ch/kontakt", "https://a.ch/a"]);
}

#[test]
fn rescan_replaces_previous_snapshot() {
    let mut conn = open_db_in_memory().unwrap();
    let first = ScriptedCatalog::default().with(
        AttributeKind::Email,
        SourceTag::Whois,
        Some(vec![dated("old@a.ch", "2020-01-01", SourceTag::Whois)]),
    );
    let second = ScriptedCatalog::default();
    let lookup = RecordingLookup::default();

    {
        let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
        let mut service = ScanService::new(repo, &first, &lookup).with_today(today());
        service.scan(AttributeKind::Email, "a.ch");
    }

    let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
    let mut service = ScanService::new(repo, &second, &lookup).with_today(today());
    let rows = service.scan(AttributeKind::Email, "a.ch");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].as_record().unwrap().is_placeholder());
    assert_eq!(service.get(AttributeKind::Email, "a.ch"), rows);
}

#[test]
fn blank_domain_yields_error_row() {
    let mut conn = open_db_in_memory().unwrap();
    let catalog = ScriptedCatalog::default();
    let lookup = RecordingLookup::default();
    let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
    let mut service = ScanService::new(repo, &catalog, &lookup);

    let rows = service.scan(AttributeKind::Endpoint, "   ");
    assert!(twinscan_core::model::record::is_failure(&rows));
    let json = serde_json::to_value(&rows).unwrap();
    assert_eq!(json, serde_json::json!([{ "error": "domain must not be empty" }]));
}
