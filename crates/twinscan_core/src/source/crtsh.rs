//! Certificate transparency search via crt.sh.

use super::http::HttpClient;
use super::{SourceAdapter, SourceResult};
use crate::canonical::Canonicalizer;
use crate::model::record::{RawCandidate, SourceTag};
use serde::Deserialize;
use std::time::Duration;

/// One logged certificate entry; only the fields the adapter reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CrtShEntry {
    /// Newline-separated subject alternative names.
    #[serde(default)]
    pub name_value: String,
    /// ISO datetime; the date part is the provenance.
    #[serde(default)]
    pub entry_timestamp: Option<String>,
}

pub fn crtsh_query_url(domain: &str) -> String {
    format!("https://crt.sh/?q=%25.{domain}&output=json")
}

pub fn parse_crtsh_entries(body: &str) -> SourceResult<Vec<CrtShEntry>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

/// Identifiers found in certificate SAN fields of `%.domain`.
pub struct CrtShSource<'a> {
    http: &'a dyn HttpClient,
    extractor: &'static dyn Canonicalizer,
    timeout: Duration,
}

impl<'a> CrtShSource<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        extractor: &'static dyn Canonicalizer,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            extractor,
            timeout,
        }
    }
}

impl SourceAdapter for CrtShSource<'_> {
    fn tag(&self) -> SourceTag {
        SourceTag::CertificateTransparency
    }

    fn try_fetch(&self, domain: &str) -> SourceResult<Vec<RawCandidate>> {
        let body = self.http.get_text(&crtsh_query_url(domain), self.timeout)?;
        let entries = parse_crtsh_entries(&body)?;

        Ok(entries
            .iter()
            .flat_map(|entry| {
                self.extractor
                    .extract(&entry.name_value)
                    .into_iter()
                    .map(move |found| {
                        RawCandidate::new(found, entry.entry_timestamp.clone(), self.tag())
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{crtsh_query_url, parse_crtsh_entries, CrtShSource};
    use crate::canonical::EmailCanonicalizer;
    use crate::source::testing::FakeHttp;
    use crate::source::SourceAdapter;
    use std::time::Duration;

    #[test]
    fn entries_tolerate_missing_fields() {
        let entries = parse_crtsh_entries(
            r#"[{"name_value":"a.ch\nwww.a.ch","entry_timestamp":"2021-07-01T10:00:00.123"},
                {"issuer_name":"x"}]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].name_value.is_empty());
        assert!(entries[1].entry_timestamp.is_none());
    }

    #[test]
    fn emails_in_san_fields_become_candidates() {
        static EMAIL: EmailCanonicalizer = EmailCanonicalizer;
        let http = FakeHttp::default().with_page(
            crtsh_query_url("a.ch"),
            r#"[{"name_value":"hostmaster@a.ch\nwww.a.ch","entry_timestamp":"2021-07-01T10:00:00"},
                {"name_value":"www.a.ch","entry_timestamp":"2022-01-01T00:00:00"}]"#,
        );
        let source = CrtShSource::new(&http, &EMAIL, Duration::from_secs(1));
        let candidates = source.fetch("a.ch");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].identifier_raw(), "hostmaster@a.ch");
        assert_eq!(candidates[0].provenance().to_string(), "2021-07-01");
    }
}
