//! Web archive endpoint sources: CDX link index, robots.txt and sitemap.xml
//! snapshots.
//!
//! # Responsibility
//! - Query the CDX index for captures of a domain or one of its files.
//! - Mine archived robots.txt rules and sitemap entries for paths.
//!
//! # Invariants
//! - Snapshot lists are ordered newest first before any limit applies.
//! - A failing snapshot body is skipped; only a failing index query fails
//!   the adapter.
//! - Every candidate carries the capture timestamp as provenance.

use super::http::HttpClient;
use super::pacing::Pacer;
use super::{SourceAdapter, SourceError, SourceResult};
use crate::model::record::{RawCandidate, SourceTag};
use log::debug;
use once_cell::sync::Lazy;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use regex::Regex;
use std::time::Duration;

const CDX_ENDPOINT: &str = "https://web.archive.org/cdx/search/cdx";
const SNAPSHOT_BASE: &str = "https://web.archive.org/web";

static ROBOTS_RULE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Disallow|Allow):\s*([^\s#]+)").expect("valid robots rule regex")
});

/// One archived capture from the CDX index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdxCapture {
    /// `YYYYMMDDhhmmss`.
    pub timestamp: String,
    pub original: String,
}

impl CdxCapture {
    pub fn snapshot_url(&self) -> String {
        format!("{SNAPSHOT_BASE}/{}/{}", self.timestamp, self.original)
    }
}

/// Builds the CDX query URL for `domain` and a path pattern (`/*`,
/// `/robots.txt`).
pub fn cdx_query_url(domain: &str, path: &str) -> String {
    format!("{CDX_ENDPOINT}?url={domain}{path}&output=json&fl=timestamp,original")
}

/// Parses a CDX JSON body (header row first) into captures, newest first.
///
/// An empty body means no captures.
pub fn parse_cdx_rows(body: &str) -> SourceResult<Vec<CdxCapture>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<Vec<String>> = serde_json::from_str(body)?;
    let mut captures: Vec<CdxCapture> = rows
        .into_iter()
        .skip(1)
        .filter_map(|row| {
            let mut fields = row.into_iter();
            let timestamp = fields.next()?;
            let original = fields.next()?;
            Some(CdxCapture {
                timestamp,
                original,
            })
        })
        .collect();
    captures.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    Ok(captures)
}

/// Extracts concrete paths from robots.txt rules.
///
/// Wildcard rules (`*`, `?`, `$`) are dropped; trailing slashes are trimmed.
pub fn parse_robots_paths(body: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for captures in ROBOTS_RULE_RE.captures_iter(body) {
        let path = captures[1].trim().trim_end_matches('/');
        if path.is_empty() || path.contains(['*', '?', '$']) {
            continue;
        }
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        if !paths.iter().any(|seen| seen.eq_ignore_ascii_case(&path)) {
            paths.push(path);
        }
    }
    paths
}

/// Collects `<url><loc>` values from a sitemap document, in document order.
pub fn parse_sitemap_locs(body: &str) -> SourceResult<Vec<String>> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut depth_in_url = 0usize;
    let mut in_loc = false;
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"url" => depth_in_url += 1,
                b"loc" if depth_in_url > 0 => {
                    in_loc = true;
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_loc => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::CData(e)) if in_loc => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::GeneralRef(ref e)) if in_loc => push_reference(&mut text, e),
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"url" => depth_in_url = depth_in_url.saturating_sub(1),
                b"loc" if in_loc => {
                    in_loc = false;
                    let loc = text.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(SourceError::Parse(format!(
                    "sitemap xml at byte {}: {err}",
                    reader.buffer_position()
                )))
            }
        }
    }
    Ok(locs)
}

/// Resolves `&name;` and `&#N;`; unknown entities stay verbatim.
fn push_reference(text: &mut String, reference: &BytesRef<'_>) {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        text.push(ch);
        return;
    }
    let name = String::from_utf8_lossy(reference);
    match resolve_predefined_entity(&name) {
        Some(value) => text.push_str(value),
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
}

fn fetch_captures(
    http: &dyn HttpClient,
    domain: &str,
    path: &str,
    timeout: Duration,
) -> SourceResult<Vec<CdxCapture>> {
    let body = http.get_text(&cdx_query_url(domain, path), timeout)?;
    parse_cdx_rows(&body)
}

/// Every capture of `domain/*` from the CDX link index.
pub struct CdxSource<'a> {
    http: &'a dyn HttpClient,
    timeout: Duration,
}

impl<'a> CdxSource<'a> {
    pub fn new(http: &'a dyn HttpClient, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

impl SourceAdapter for CdxSource<'_> {
    fn tag(&self) -> SourceTag {
        SourceTag::Cdx
    }

    fn try_fetch(&self, domain: &str) -> SourceResult<Vec<RawCandidate>> {
        let captures = fetch_captures(self.http, domain, "/*", self.timeout)?;
        Ok(captures
            .into_iter()
            .map(|capture| RawCandidate::dated(capture.original, capture.timestamp, SourceTag::Cdx))
            .collect())
    }
}

/// Which archived file an [`ArchivedFileSource`] mines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivedFile {
    Robots,
    Sitemap,
}

impl ArchivedFile {
    fn path(self) -> &'static str {
        match self {
            Self::Robots => "/robots.txt",
            Self::Sitemap => "/sitemap.xml",
        }
    }
}

/// Endpoints listed in the newest archived robots.txt or sitemap.xml
/// captures.
pub struct ArchivedFileSource<'a> {
    http: &'a dyn HttpClient,
    file: ArchivedFile,
    pacer: Pacer,
    snapshot_limit: usize,
    index_timeout: Duration,
    body_timeout: Duration,
}

impl<'a> ArchivedFileSource<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        file: ArchivedFile,
        pacer: Pacer,
        snapshot_limit: usize,
        index_timeout: Duration,
        body_timeout: Duration,
    ) -> Self {
        Self {
            http,
            file,
            pacer,
            snapshot_limit,
            index_timeout,
            body_timeout,
        }
    }

    fn urls_in(&self, domain: &str, body: &str) -> SourceResult<Vec<String>> {
        match self.file {
            ArchivedFile::Robots => Ok(parse_robots_paths(body)
                .into_iter()
                .map(|path| format!("https://{domain}{path}"))
                .collect()),
            ArchivedFile::Sitemap => parse_sitemap_locs(body),
        }
    }
}

impl SourceAdapter for ArchivedFileSource<'_> {
    fn tag(&self) -> SourceTag {
        match self.file {
            ArchivedFile::Robots => SourceTag::Robots,
            ArchivedFile::Sitemap => SourceTag::Sitemap,
        }
    }

    fn try_fetch(&self, domain: &str) -> SourceResult<Vec<RawCandidate>> {
        let mut captures = fetch_captures(self.http, domain, self.file.path(), self.index_timeout)?;
        captures.truncate(self.snapshot_limit);

        let mut candidates = Vec::new();
        for (index, capture) in captures.iter().enumerate() {
            if index > 0 {
                self.pacer.pause();
            }
            let urls = self
                .http
                .get_text(&capture.snapshot_url(), self.body_timeout)
                .and_then(|body| self.urls_in(domain, &body));
            match urls {
                Ok(urls) => candidates.extend(urls.into_iter().map(|url| {
                    RawCandidate::dated(url, capture.timestamp.clone(), self.tag())
                })),
                Err(err) => debug!(
                    "event=snapshot_skip module=source source={} timestamp={} error={}",
                    self.tag(),
                    capture.timestamp,
                    err
                ),
            }
        }
        Ok(candidates)
    }
}
