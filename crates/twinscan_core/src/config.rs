//! Scan configuration loaded from TOML.
//!
//! # Responsibility
//! - Describe network timeouts, crawl limits, pacing and breach lookup
//!   settings with working defaults.
//! - Validate ranges before any source is built.
//!
//! # Invariants
//! - Every section is optional in the file; missing keys take defaults.
//! - A validated config has `min_ms <= max_ms` for every pacing range and at
//!   least one user agent.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when `breach.api_key` is unset.
pub const BREACH_API_KEY_ENV: &str = "TWINSCAN_DEHASHED_KEY";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    InvalidPacing { section: &'static str, min_ms: u64, max_ms: u64 },
    NoUserAgents,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::InvalidPacing {
                section,
                min_ms,
                max_ms,
            } => write!(
                f,
                "pacing.{section}: min_ms ({min_ms}) must not exceed max_ms ({max_ms})"
            ),
            Self::NoUserAgents => write!(f, "http.user_agents must list at least one agent"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidPacing { .. } | Self::NoUserAgents => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub http: HttpSettings,
    pub limits: LimitSettings,
    pub pacing: PacingSettings,
    pub breach: BreachSettings,
    pub whois: WhoisSettings,
    /// IANA-format TLD list replacing the built-in one.
    pub tld_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// CDX index, crt.sh and archived page requests.
    pub timeout_secs: u64,
    /// Archived robots.txt / sitemap.xml bodies.
    pub archive_timeout_secs: u64,
    pub user_agents: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            archive_timeout_secs: 5,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X)".to_string(),
                "Mozilla/5.0 (Linux; Android 10; SM-G975F)".to_string(),
            ],
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Endpoint snapshot entries crawled per email/phone scan.
    pub max_archived_pages: usize,
    pub robots_snapshot_limit: usize,
    pub sitemap_snapshot_limit: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_archived_pages: 50,
            robots_snapshot_limit: 5,
            sitemap_snapshot_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PacingRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Between archived robots/sitemap snapshot fetches.
    pub archive: PacingRange,
    /// Between archived page fetches of the email/phone crawl.
    pub page: PacingRange,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            archive: PacingRange::new(2_000, 4_000),
            page: PacingRange::new(7_000, 15_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreachSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for BreachSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_key_file: None,
            timeout_secs: 20,
        }
    }
}

impl BreachSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves the API key: config value, then environment, then key file.
    ///
    /// Blank values count as absent. An unreadable key file yields `None`.
    pub fn resolve_api_key(&self) -> Option<String> {
        let non_blank = |value: String| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        self.api_key
            .clone()
            .and_then(non_blank)
            .or_else(|| std::env::var(BREACH_API_KEY_ENV).ok().and_then(non_blank))
            .or_else(|| {
                self.api_key_file
                    .as_deref()
                    .and_then(|path| std::fs::read_to_string(path).ok())
                    .and_then(non_blank)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoisSettings {
    pub timeout_secs: u64,
}

impl Default for WhoisSettings {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl WhoisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ScanConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, range) in [("archive", self.pacing.archive), ("page", self.pacing.page)] {
            if range.min_ms > range.max_ms {
                return Err(ConfigError::InvalidPacing {
                    section,
                    min_ms: range.min_ms,
                    max_ms: range.max_ms,
                });
            }
        }
        if self.http.user_agents.iter().all(|agent| agent.trim().is_empty()) {
            return Err(ConfigError::NoUserAgents);
        }
        Ok(())
    }
}

/// Loads a config file, or defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<ScanConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ScanConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ScanConfig::from_toml_str(&text)
}
