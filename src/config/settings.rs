//! Application settings loading from stockbook.toml
//!
//! Settings are optional: a missing file yields the defaults. The profiles root can be
//! overridden with the `STOCKBOOK_PROFILES_DIR` environment variable, which `dotenvy`
//! may populate from a `.env` file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default settings file name, looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "stockbook.toml";

/// Environment variable overriding [`Settings::profiles_dir`]
pub const PROFILES_DIR_ENV: &str = "STOCKBOOK_PROFILES_DIR";

/// Configuration structure representing the entire stockbook.toml file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Folder holding one sub-folder per profile
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Stock quantity at or below which a product is reported as low
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from("profiles")
}

fn default_log_filter() -> String {
    "info".to_string()
}

const fn default_low_stock_threshold() -> i64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profiles_dir: default_profiles_dir(),
            log_filter: default_log_filter(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read settings file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.as_ref().display()),
    })
}

/// Loads settings from the default location (./stockbook.toml) when present, then applies
/// the environment override for the profiles folder.
pub fn load_default_settings() -> Result<Settings> {
    let path = Path::new(DEFAULT_SETTINGS_FILE);
    let mut settings = if path.exists() {
        tracing::debug!("Loading settings from {}", path.display());
        load_settings(path)?
    } else {
        Settings::default()
    };

    if let Ok(dir) = std::env::var(PROFILES_DIR_ENV) {
        if !dir.trim().is_empty() {
            settings.profiles_dir = PathBuf::from(dir);
        }
    }

    Ok(settings)
}
