use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fs, path::PathBuf, time::Duration};

use crate::{
    cities::CityDirectory,
    provider::{nominatim, openmeteo},
};

const DEFAULT_USER_AGENT: &str =
    concat!("weatherscope/", env!("CARGO_PKG_VERSION"), " (terminal weather lookup)");

/// Upstream service URLs. Overridable so tests and mirrors can point elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub forecast_url: String,
    pub reverse_geocode_url: String,
    pub search_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forecast_url: openmeteo::DEFAULT_FORECAST_URL.to_string(),
            reverse_geocode_url: nominatim::DEFAULT_REVERSE_URL.to_string(),
            search_url: nominatim::DEFAULT_SEARCH_URL.to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// cities_path = "/home/me/cities.json"
/// timeout_secs = 10
///
/// [endpoints]
/// forecast_url = "https://api.open-meteo.com/v1/forecast"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// City dataset to search instead of the bundled one.
    pub cities_path: Option<PathBuf>,

    /// Sent with every request; Nominatim rejects anonymous clients.
    pub user_agent: Option<String>,

    /// No timeout is applied unless set.
    pub timeout_secs: Option<u64>,

    pub endpoints: Endpoints,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherscope", "weatherscope")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    /// Shared HTTP client for the forecast and geocoding services.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent());
        if let Some(timeout) = self.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build().context("Failed to build HTTP client")
    }

    /// The configured city dataset, or the bundled one.
    pub fn city_directory(&self) -> Result<Cow<'static, CityDirectory>> {
        match &self.cities_path {
            Some(path) => CityDirectory::from_path(path)
                .map(Cow::Owned)
                .with_context(|| format!("Failed to load city dataset: {}", path.display())),
            None => Ok(Cow::Borrowed(CityDirectory::bundled()?)),
        }
    }
}
