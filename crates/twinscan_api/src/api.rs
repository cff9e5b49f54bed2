//! Use-case API for embedding callers.
//!
//! # Responsibility
//! - Expose scan and snapshot reads as string-in, JSON-out functions.
//! - Hold the process-wide database path and scan configuration.
//!
//! # Invariants
//! - Exported functions never panic.
//! - `scan` and `get` always return a non-empty JSON array: records, one
//!   `{"error": ...}` row, or one `{"info": ...}` row.
//!
//! # See also
//! - `twinscan_core::service::scan_service` for the pipeline itself.

use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use twinscan_core::{
    core_version as core_version_inner, default_log_level as default_log_level_inner,
    init_logging as init_logging_inner, init_tlds, load_config, open_db, ping as ping_inner,
    ArchiveSourceCatalog, AttributeKind, BreachLookup, DehashedLookup, DisabledLookup, ScanConfig,
    ScanService, SnapshotRow, SqliteSnapshotRepository, TldError,
};

const DB_PATH_ENV: &str = "TWINSCAN_DB_PATH";
const DEFAULT_DB_FILE_NAME: &str = "twinscan.sqlite3";

static SETTINGS: Mutex<Option<ApiSettings>> = Mutex::new(None);

/// Database location and scan configuration used by `scan` and `get`.
#[derive(Debug, Clone)]
struct ApiSettings {
    db_path: PathBuf,
    config: ScanConfig,
}

impl ApiSettings {
    fn fallback() -> Self {
        Self {
            db_path: default_db_path(),
            config: ScanConfig::default(),
        }
    }
}

/// Minimal health-check API.
pub fn ping() -> String {
    ping_inner().to_owned()
}

pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Level used when the caller does not pick one.
pub fn default_log_level() -> String {
    default_log_level_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: directory for rolling log files; empty means stderr.
///
/// Returns empty string on success and error message on failure.
pub fn init_logging(level: String, log_dir: String) -> String {
    let log_dir = log_dir.trim();
    let dir = (!log_dir.is_empty()).then(|| Path::new(log_dir));
    match init_logging_inner(level.as_str(), dir) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Sets the snapshot database and the TOML config used by later calls.
///
/// Input semantics:
/// - `db_path`: SQLite file; empty means `$TWINSCAN_DB_PATH` or a file in
///   the temp directory.
/// - `config_path`: TOML file; empty means built-in defaults.
///
/// May be called again to switch database or config. A custom TLD list is
/// only honored before the first domain check of the process.
///
/// Returns empty string on success and error message on failure; on failure
/// the previous settings stay in place.
pub fn configure(db_path: String, config_path: String) -> String {
    match build_settings(db_path.trim(), config_path.trim()) {
        Ok(settings) => {
            info!(
                "event=api_configure module=api status=ok db_path={}",
                settings.db_path.display()
            );
            *SETTINGS.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings);
            String::new()
        }
        Err(err) => {
            error!("event=api_configure module=api status=error error={}", err);
            err
        }
    }
}

/// Runs a full scan of `attribute` for `domain` and returns the new
/// snapshot as a JSON array.
///
/// Blocks for the whole scan; archive crawls take minutes.
pub fn scan(attribute: String, domain: String) -> String {
    let settings = current_settings();
    rows_to_json(&scan_rows(&settings, &attribute, &domain))
}

/// Returns the stored snapshot of `attribute` for `domain` as a JSON array.
pub fn get(attribute: String, domain: String) -> String {
    let settings = current_settings();
    rows_to_json(&get_rows(&settings, &attribute, &domain))
}

fn build_settings(db_path: &str, config_path: &str) -> Result<ApiSettings, String> {
    let config_path = (!config_path.is_empty()).then(|| Path::new(config_path));
    let config = load_config(config_path).map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;

    match init_tlds(config.tld_file.as_deref()) {
        Ok(_) => {}
        Err(TldError::AlreadyInitialized) => {
            if config.tld_file.is_some() {
                warn!(
                    "event=api_configure module=api status=warn reason=tld_list_already_installed"
                );
            }
        }
        Err(err) => return Err(err.to_string()),
    }

    let db_path = if db_path.is_empty() {
        default_db_path()
    } else {
        PathBuf::from(db_path)
    };
    Ok(ApiSettings { db_path, config })
}

fn current_settings() -> ApiSettings {
    SETTINGS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_else(ApiSettings::fallback)
}

fn default_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}

fn scan_rows(settings: &ApiSettings, attribute: &str, domain: &str) -> Vec<SnapshotRow> {
    with_service(settings, attribute, |service, kind| service.scan(kind, domain))
}

fn get_rows(settings: &ApiSettings, attribute: &str, domain: &str) -> Vec<SnapshotRow> {
    with_service(settings, attribute, |service, kind| service.get(kind, domain))
}

fn with_service(
    settings: &ApiSettings,
    attribute: &str,
    f: impl FnOnce(
        &mut ScanService<'_, SqliteSnapshotRepository<'_>>,
        AttributeKind,
    ) -> Vec<SnapshotRow>,
) -> Vec<SnapshotRow> {
    let kind = match AttributeKind::parse(attribute) {
        Ok(kind) => kind,
        Err(err) => return vec![SnapshotRow::error(err.to_string())],
    };

    let mut conn = match open_db(&settings.db_path) {
        Ok(conn) => conn,
        Err(err) => return vec![SnapshotRow::error(format!("snapshot DB open failed: {err}"))],
    };
    let repo = match SqliteSnapshotRepository::try_new(&mut conn) {
        Ok(repo) => repo,
        Err(err) => return vec![SnapshotRow::error(format!("snapshot repo init failed: {err}"))],
    };
    let catalog = match ArchiveSourceCatalog::from_config(settings.config.clone()) {
        Ok(catalog) => catalog,
        Err(err) => return vec![SnapshotRow::error(format!("source setup failed: {err}"))],
    };

    let dehashed;
    let disabled = DisabledLookup;
    let breach: &dyn BreachLookup = if settings.config.breach.enabled {
        dehashed = DehashedLookup::from_settings(catalog.http(), &settings.config.breach);
        &dehashed
    } else {
        &disabled
    };

    let mut service =
        ScanService::new(repo, &catalog, breach).with_limits(settings.config.limits.clone());
    f(&mut service, kind)
}

fn rows_to_json(rows: &[SnapshotRow]) -> String {
    match serde_json::to_string(rows) {
        Ok(json) => json,
        Err(err) => {
            let fallback = [SnapshotRow::error(format!("failed to encode rows: {err}"))];
            serde_json::to_string(&fallback).unwrap_or_else(|_| "[]".to_string())
        }
    }
}
