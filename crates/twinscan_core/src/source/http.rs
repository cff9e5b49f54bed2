//! Blocking HTTP transport shared by the web adapters.
//!
//! # Invariants
//! - Every request carries an explicit timeout.
//! - Each request picks its user agent at random from the configured list.

use super::{SourceError, SourceResult};
use crate::config::HttpSettings;
use rand::seq::SliceRandom;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Minimal HTTP surface used by adapters and the breach lookup.
pub trait HttpClient {
    fn get_text(&self, url: &str, timeout: Duration) -> SourceResult<String>;

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
        timeout: Duration,
    ) -> SourceResult<Value>;
}

/// `reqwest::blocking` implementation with user-agent rotation.
pub struct ReqwestHttpClient {
    http: Client,
    user_agents: Vec<String>,
}

impl ReqwestHttpClient {
    pub fn new(settings: &HttpSettings) -> SourceResult<Self> {
        let http = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|err| SourceError::Http(format!("failed to build HTTP client: {err}")))?;
        let user_agents = settings
            .user_agents
            .iter()
            .map(|agent| agent.trim().to_string())
            .filter(|agent| !agent.is_empty())
            .collect();
        Ok(Self { http, user_agents })
    }

    fn with_agent(&self, request: RequestBuilder) -> RequestBuilder {
        match self.user_agents.choose(&mut rand::thread_rng()) {
            Some(agent) => request.header(reqwest::header::USER_AGENT, agent.as_str()),
            None => request,
        }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get_text(&self, url: &str, timeout: Duration) -> SourceResult<String> {
        let request = self.with_agent(self.http.get(url).timeout(timeout));
        let response = checked(request.send(), url)?;
        response.text().map_err(transport_error)
    }

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
        timeout: Duration,
    ) -> SourceResult<Value> {
        let mut request = self.with_agent(self.http.post(url).timeout(timeout).json(body));
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = checked(request.send(), url)?;
        response.json().map_err(|err| {
            if err.is_decode() {
                SourceError::Parse(err.to_string())
            } else {
                transport_error(err)
            }
        })
    }
}

fn checked(result: reqwest::Result<Response>, url: &str) -> SourceResult<Response> {
    let response = result.map_err(transport_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

fn transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ReqwestHttpClient;
    use crate::config::HttpSettings;

    #[test]
    fn blank_user_agents_are_dropped() {
        let settings = HttpSettings {
            user_agents: vec!["  ".to_string(), " agent/1 ".to_string()],
            ..HttpSettings::default()
        };
        let client = ReqwestHttpClient::new(&settings).unwrap();
        assert_eq!(client.user_agents, vec!["agent/1".to_string()]);
    }
}
