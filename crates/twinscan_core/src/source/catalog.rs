//! Fixed per-attribute adapter line-ups.
//!
//! # Invariants
//! - Adapter order is fixed per attribute kind:
//!   - email: archived pages, WHOIS, crt.sh;
//!   - phone: archived pages, WHOIS;
//!   - endpoint: CDX, robots.txt, sitemap.xml.
//! - Email and phone line-ups share the canonicalizer of their kind for
//!   free-text extraction.

use super::crtsh::CrtShSource;
use super::http::{HttpClient, ReqwestHttpClient};
use super::pages::{ArchivedPageSource, CrawlTarget};
use super::pacing::Pacer;
use super::wayback::{ArchivedFile, ArchivedFileSource, CdxSource};
use super::whois::WhoisSource;
use super::{SourceAdapter, SourceResult};
use crate::config::ScanConfig;
use crate::model::attribute::AttributeKind;
use chrono::NaiveDate;

/// Builds the adapters queried for one scan.
pub trait SourceCatalog {
    /// Adapters for `kind`, in query order.
    ///
    /// `crawl_targets` feeds the archived page crawl and is ignored for
    /// endpoint scans.
    fn sources<'s>(
        &'s self,
        kind: AttributeKind,
        crawl_targets: Vec<CrawlTarget>,
        today: NaiveDate,
    ) -> Vec<Box<dyn SourceAdapter + 's>>;
}

/// Web archive, RDAP and crt.sh adapters over one HTTP transport.
pub struct ArchiveSourceCatalog {
    http: Box<dyn HttpClient>,
    config: ScanConfig,
}

impl ArchiveSourceCatalog {
    pub fn new(http: Box<dyn HttpClient>, config: ScanConfig) -> Self {
        Self { http, config }
    }

    /// Catalog over `reqwest`, configured from `config`.
    pub fn from_config(config: ScanConfig) -> SourceResult<Self> {
        let http = ReqwestHttpClient::new(&config.http)?;
        Ok(Self::new(Box::new(http), config))
    }

    /// Shared transport, also used by the breach lookup.
    pub fn http(&self) -> &dyn HttpClient {
        self.http.as_ref()
    }

    fn archive_file<'s>(&'s self, file: ArchivedFile) -> Box<dyn SourceAdapter + 's> {
        let limit = match file {
            ArchivedFile::Robots => self.config.limits.robots_snapshot_limit,
            ArchivedFile::Sitemap => self.config.limits.sitemap_snapshot_limit,
        };
        Box::new(ArchivedFileSource::new(
            self.http(),
            file,
            Pacer::new(self.config.pacing.archive),
            limit,
            self.config.http.timeout(),
            self.config.http.archive_timeout(),
        ))
    }
}

impl SourceCatalog for ArchiveSourceCatalog {
    fn sources<'s>(
        &'s self,
        kind: AttributeKind,
        crawl_targets: Vec<CrawlTarget>,
        today: NaiveDate,
    ) -> Vec<Box<dyn SourceAdapter + 's>> {
        let Some(extractor) = kind.canonicalizer() else {
            return vec![
                Box::new(CdxSource::new(self.http(), self.config.http.timeout())),
                self.archive_file(ArchivedFile::Robots),
                self.archive_file(ArchivedFile::Sitemap),
            ];
        };

        let mut sources: Vec<Box<dyn SourceAdapter + 's>> = vec![
            Box::new(ArchivedPageSource::new(
                self.http(),
                extractor,
                crawl_targets,
                Pacer::new(self.config.pacing.page),
                self.config.http.timeout(),
            )),
            Box::new(WhoisSource::new(
                self.http(),
                extractor,
                self.config.whois.timeout(),
                today,
            )),
        ];
        if kind == AttributeKind::Email {
            sources.push(Box::new(CrtShSource::new(
                self.http(),
                extractor,
                self.config.http.timeout(),
            )));
        }
        sources
    }
}
