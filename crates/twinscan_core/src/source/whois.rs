//! Registration contacts via RDAP, the JSON successor of WHOIS.
//!
//! # Invariants
//! - One lookup per domain; `rdap.org` redirects to the responsible registry.
//! - Only contact vCards are searched (`email` and `tel` properties, nested
//!   entities included).
//! - Provenance is the scan day; registration data carries no per-contact
//!   dates.

use super::http::HttpClient;
use super::{SourceAdapter, SourceResult};
use crate::canonical::Canonicalizer;
use crate::model::record::{RawCandidate, SourceTag};
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const RDAP_DOMAIN_BASE: &str = "https://rdap.org/domain";

#[derive(Debug, Default, Deserialize)]
pub struct RdapResponse {
    #[serde(default)]
    pub entities: Vec<RdapEntity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RdapEntity {
    #[serde(default)]
    pub roles: Vec<String>,
    /// jCard: `["vcard", [[name, params, type, value, ...], ...]]`.
    #[serde(rename = "vcardArray", default)]
    pub vcard_array: Option<Value>,
    #[serde(default)]
    pub entities: Vec<RdapEntity>,
}

impl RdapEntity {
    /// `email` and `tel` values of this entity and its sub-entities.
    pub fn contact_values(&self) -> Vec<String> {
        let mut values = vcard_contacts(self.vcard_array.as_ref());
        for child in &self.entities {
            values.extend(child.contact_values());
        }
        values
    }
}

pub fn rdap_query_url(domain: &str) -> String {
    format!("{RDAP_DOMAIN_BASE}/{domain}")
}

pub fn parse_rdap_response(body: &str) -> SourceResult<RdapResponse> {
    if body.trim().is_empty() {
        return Ok(RdapResponse::default());
    }
    Ok(serde_json::from_str(body)?)
}

fn vcard_contacts(vcard: Option<&Value>) -> Vec<String> {
    let Some(properties) = vcard.and_then(|card| card.get(1)).and_then(Value::as_array) else {
        return Vec::new();
    };
    properties
        .iter()
        .filter_map(|property| {
            let name = property.get(0)?.as_str()?;
            let value = property.get(3)?.as_str()?;
            match name.to_ascii_lowercase().as_str() {
                "email" => Some(value.trim().to_string()),
                "tel" => Some(tel_text(value)),
                _ => None,
            }
        })
        .filter(|value| !value.is_empty())
        .collect()
}

/// `tel:+41.441234567;ext=2` -> `+41 441234567`.
fn tel_text(value: &str) -> String {
    let value = value.trim();
    let value = value.strip_prefix("tel:").unwrap_or(value);
    let number = value.split(';').next().unwrap_or(value);
    number.replace('.', " ")
}

/// Identifiers found in the domain's registration contacts.
pub struct WhoisSource<'a> {
    http: &'a dyn HttpClient,
    extractor: &'static dyn Canonicalizer,
    timeout: Duration,
    today: NaiveDate,
}

impl<'a> WhoisSource<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        extractor: &'static dyn Canonicalizer,
        timeout: Duration,
        today: NaiveDate,
    ) -> Self {
        Self {
            http,
            extractor,
            timeout,
            today,
        }
    }
}

impl SourceAdapter for WhoisSource<'_> {
    fn tag(&self) -> SourceTag {
        SourceTag::Whois
    }

    fn try_fetch(&self, domain: &str) -> SourceResult<Vec<RawCandidate>> {
        let body = self.http.get_text(&rdap_query_url(domain), self.timeout)?;
        let response = parse_rdap_response(&body)?;

        let contacts: Vec<String> = response
            .entities
            .iter()
            .flat_map(RdapEntity::contact_values)
            .collect();
        debug!(
            "event=rdap_contacts module=source entities={} values={}",
            response.entities.len(),
            contacts.len()
        );

        let provenance = self.today.format("%Y-%m-%d").to_string();
        Ok(self
            .extractor
            .extract(&contacts.join("\n"))
            .into_iter()
            .map(|found| RawCandidate::dated(found, provenance.clone(), SourceTag::Whois))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_rdap_response, rdap_query_url, WhoisSource};
    use crate::canonical::{EmailCanonicalizer, PhoneCanonicalizer};
    use crate::source::testing::FakeHttp;
    use crate::source::{SourceAdapter, SourceError};
    use chrono::NaiveDate;
    use std::time::Duration;

    static EMAIL: EmailCanonicalizer = EmailCanonicalizer;
    static PHONE: PhoneCanonicalizer = PhoneCanonicalizer;

    const RDAP_BODY: &str = r#"{
        "objectClassName": "domain",
        "ldhName": "a.ch",
        "entities": [
            {
                "roles": ["registrant"],
                "vcardArray": ["vcard", [
                    ["version", {}, "text", "4.0"],
                    ["fn", {}, "text", "Muster AG"],
                    ["email", {}, "text", "Office@A.ch"],
                    ["tel", {"type": "voice"}, "uri", "tel:+41.441234567;ext=2"]
                ]]
            },
            {
                "roles": ["registrar"],
                "vcardArray": ["vcard", [["fn", {}, "text", "Registrar GmbH"]]],
                "entities": [
                    {
                        "roles": ["abuse"],
                        "vcardArray": ["vcard", [
                            ["email", {}, "text", "abuse@registrar.ch"],
                            ["tel", {}, "text", "+41 79 123 45 67"]
                        ]]
                    }
                ]
            }
        ]
    }"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn nested_entity_contacts_are_collected() {
        let response = parse_rdap_response(RDAP_BODY).unwrap();
        let values: Vec<String> = response
            .entities
            .iter()
            .flat_map(|entity| entity.contact_values())
            .collect();
        assert_eq!(
            values,
            vec![
                "Office@A.ch",
                "+41 441234567",
                "abuse@registrar.ch",
                "+41 79 123 45 67"
            ]
        );
        assert!(parse_rdap_response("  ").unwrap().entities.is_empty());
    }

    #[test]
    fn phones_are_dated_with_scan_day() {
        let http = FakeHttp::default().with_page(rdap_query_url("a.ch"), RDAP_BODY);
        let source = WhoisSource::new(&http, &PHONE, Duration::from_secs(1), today());
        let candidates = source.fetch("a.ch");
        let found: Vec<_> = candidates.iter().map(|c| c.identifier_raw()).collect();
        assert_eq!(found, vec!["+41 441234567", "+41 79 123 45 67"]);
        assert_eq!(candidates[0].provenance().to_string(), "2024-06-30");
        assert_eq!(http.requests.borrow().as_slice(), ["https://rdap.org/domain/a.ch"]);
    }

    #[test]
    fn emails_ignore_non_contact_properties() {
        let http = FakeHttp::default().with_page(rdap_query_url("a.ch"), RDAP_BODY);
        let source = WhoisSource::new(&http, &EMAIL, Duration::from_secs(1), today());
        let found: Vec<_> = source
            .fetch("a.ch")
            .iter()
            .map(|c| c.identifier_raw().to_string())
            .collect();
        assert_eq!(found, vec!["Office@A.ch", "abuse@registrar.ch"]);
    }

    #[test]
    fn unknown_domain_degrades_to_empty() {
        let http = FakeHttp::default().with_status(rdap_query_url("a.ch"), 404);
        let source = WhoisSource::new(&http, &PHONE, Duration::from_secs(1), today());
        assert!(matches!(
            source.try_fetch("a.ch"),
            Err(SourceError::Status { status: 404, .. })
        ));
        assert!(source.fetch("a.ch").is_empty());
    }
}
