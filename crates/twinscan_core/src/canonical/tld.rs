//! Process-wide top-level domain reference set.
//!
//! # Invariants
//! - The set is installed at most once and never mutated afterwards.
//! - Without an explicit [`init_tlds`] call, the first lookup installs the
//!   built-in list.

use log::{info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const BUILTIN_TLDS: &str = include_str!("../../data/tlds-alpha-by-domain.txt");

static TLDS: OnceCell<HashSet<String>> = OnceCell::new();

/// TLD set initialization errors.
#[derive(Debug)]
pub enum TldError {
    /// The set was already installed (explicitly or by a lookup).
    AlreadyInitialized,
    Io { path: PathBuf, message: String },
    /// The supplied list contained no labels.
    Empty,
}

impl Display for TldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "TLD reference list is already initialized"),
            Self::Io { path, message } => {
                write!(f, "failed to read TLD list `{}`: {message}", path.display())
            }
            Self::Empty => write!(f, "TLD reference list contains no labels"),
        }
    }
}

impl Error for TldError {}

/// Installs the TLD set from `source`, or the built-in list when `None`.
///
/// Returns the number of labels installed.
///
/// # Errors
/// - `AlreadyInitialized` when called after the set is in place.
/// - `Io`/`Empty` when the supplied file is unreadable or empty.
pub fn init_tlds(source: Option<&Path>) -> Result<usize, TldError> {
    let labels = match source {
        None => parse_tld_list(BUILTIN_TLDS),
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|err| TldError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            parse_tld_list(&text)
        }
    };

    if labels.is_empty() {
        return Err(TldError::Empty);
    }

    let count = labels.len();
    if TLDS.set(labels).is_err() {
        warn!("event=tld_init module=canonical status=rejected reason=already_initialized");
        return Err(TldError::AlreadyInitialized);
    }

    info!(
        "event=tld_init module=canonical status=ok count={} source={}",
        count,
        source.map_or("builtin".to_string(), |path| path.display().to_string())
    );
    Ok(count)
}

/// Returns whether `label` (case-insensitive) is a known top-level domain.
pub fn is_known_tld(label: &str) -> bool {
    !label.is_empty() && tld_set().contains(&label.to_ascii_lowercase())
}

/// Returns whether the set has been installed.
pub fn tlds_initialized() -> bool {
    TLDS.get().is_some()
}

/// Parses IANA `tlds-alpha-by-domain.txt` text into lower-case labels.
pub fn parse_tld_list(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_ascii_lowercase)
        .collect()
}

fn tld_set() -> &'static HashSet<String> {
    TLDS.get_or_init(|| parse_tld_list(BUILTIN_TLDS))
}

#[cfg(test)]
mod tests {
    use super::{init_tlds, is_known_tld, parse_tld_list, tlds_initialized, TldError};

    #[test]
    fn parses_iana_format_skipping_comments() {
        let labels = parse_tld_list("# Version 2024\nCOM\n\n  CH \nXN--P1AI\n");
        assert_eq!(labels.len(), 3);
        assert!(labels.contains("com"));
        assert!(labels.contains("ch"));
        assert!(labels.contains("xn--p1ai"));
    }

    #[test]
    fn builtin_list_knows_common_labels() {
        assert!(is_known_tld("com"));
        assert!(is_known_tld("CH"));
        assert!(is_known_tld("org"));
        assert!(!is_known_tld("js"));
        assert!(!is_known_tld("localhost"));
        assert!(!is_known_tld(""));
    }

    #[test]
    fn init_after_first_lookup_is_rejected() {
        assert!(is_known_tld("net"));
        assert!(tlds_initialized());
        let err = init_tlds(None).expect_err("second installation must fail");
        assert!(matches!(err, TldError::AlreadyInitialized));
    }

    #[test]
    fn init_from_missing_file_reports_io_error() {
        let err = init_tlds(Some(std::path::Path::new("/nonexistent/tlds.txt")))
            .expect_err("missing file must fail");
        assert!(matches!(err, TldError::Io { .. }));
    }
}
