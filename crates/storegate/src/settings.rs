use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storegate_core::catalog::{DEFAULT_CATALOG_URL, DEFAULT_COUNTRY};
use storegate_core::{DecisionConfig, ItunesCatalog};
use storegate_platform::{AppPaths, AppPathsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to resolve application paths: {0}")]
    Paths(#[from] AppPathsError),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl SettingsError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// Static configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default, alias = "APP_STORE_ID")]
    pub app_store_id: Option<String>,

    #[serde(default = "default_true")]
    pub require_app_id: bool,

    #[serde(default = "default_country")]
    pub country: String,

    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    #[serde(default)]
    pub http_timeout_secs: Option<u64>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub button_text: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_store_id: None,
            require_app_id: true,
            country: default_country(),
            catalog_url: default_catalog_url(),
            http_timeout_secs: None,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            message: None,
            button_text: None,
        }
    }
}

impl AppSettings {
    /// Load settings, falling back to defaults when the file is missing or corrupt.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        Self::read_from(path).unwrap_or_default()
    }

    /// Read settings, treating a missing file as defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn read_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|error| SettingsError::io("failed to read settings", error))?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Write to the platform settings file.
    ///
    /// # Errors
    /// Returns an error when the platform directories cannot be resolved or
    /// the settings cannot be written.
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_in(&AppPaths::new()?)
    }

    /// # Errors
    /// Returns an error when the settings directory or file cannot be written.
    pub fn save_in(&self, paths: &AppPaths) -> Result<(), SettingsError> {
        paths
            .ensure_dirs()
            .map_err(|error| SettingsError::io("failed to create settings directory", error))?;
        self.save_to(&paths.settings_file())
    }

    /// # Errors
    /// Returns an error when the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| SettingsError::io("failed to create settings directory", error))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        std::fs::write(path, content)
            .map_err(|error| SettingsError::io("failed to write settings", error))
    }

    /// Zero means no timeout.
    #[must_use]
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    #[must_use]
    pub fn catalog(&self, client: reqwest::Client) -> ItunesCatalog {
        ItunesCatalog::new(client)
            .with_base_url(self.catalog_url.clone())
            .with_country(self.country.clone())
            .with_timeout(self.http_timeout())
    }

    #[must_use]
    pub fn decision_config(&self, installed_version: impl Into<String>) -> DecisionConfig {
        DecisionConfig {
            require_app_id: self.require_app_id,
            installed_version: installed_version.into(),
        }
    }
}
