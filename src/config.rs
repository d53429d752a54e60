use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slots::ClinicHours;

/// Application-level constants
pub const APP_NAME: &str = "OrionHealth";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/OrionHealth/ on all platforms
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Location of the clinic ledger database.
pub fn database_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("clinic.db"))
}

/// Location of the optional settings file.
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("settings.json"))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "orion_health_lib=info,orion_health=info,warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid clinic schedule: {0}")]
    InvalidSchedule(String),
}

/// Tunables read from `settings.json`. Every field has a default, so a
/// partial file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicSettings {
    pub hours: ClinicHours,
    /// How long a request waits for a competing writer before failing.
    pub busy_timeout_ms: u64,
}

impl Default for ClinicSettings {
    fn default() -> Self {
        Self {
            hours: ClinicHours::default(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl ClinicSettings {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hours.validate().map_err(ConfigError::InvalidSchedule)
    }
}

/// Load settings from `path`, falling back to defaults when the file does not exist.
pub fn load_settings(path: &Path) -> Result<ClinicSettings, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(ClinicSettings::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings: ClinicSettings = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}
