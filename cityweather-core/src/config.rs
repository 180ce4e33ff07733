use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";
/// Environment variable that overrides the stored provider base URL.
pub const BASE_URL_ENV: &str = "WEATHER_API_BASE_URL";

/// Configuration stored on disk.
///
/// Example TOML:
/// api_key = "..."
/// base_url = "https://api.weatherapi.com/v1"
/// timeout_secs = 10
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// WeatherAPI.com key. Never compiled in; comes from this file or the environment.
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overall request timeout. The HTTP client default applies when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self { api_key: None, base_url: default_base_url(), timeout_secs: None }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "cityweather", "cityweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `WEATHER_API_KEY` / `WEATHER_API_BASE_URL` from the process environment.
    pub fn with_process_env(self) -> Self {
        self.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_blank(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(url) = non_blank(BASE_URL_ENV) {
            self.base_url = url;
        }

        self
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    /// Returns the API key, or an error telling the user how to provide one.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `cityweather configure` or set {API_KEY_ENV}."
            )
        })
    }

    /// `base_url`, checked to be an absolute http(s) URL.
    pub fn validated_base_url(&self) -> Result<&str> {
        let base = self.base_url.trim();
        let url = reqwest::Url::parse(base).map_err(|e| {
            anyhow!(
                "Invalid base URL '{base}': {e}.\n\
                 Hint: use something like {DEFAULT_BASE_URL}."
            )
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(anyhow!(
                "Invalid base URL '{base}': expected an http(s) URL such as {DEFAULT_BASE_URL}."
            ));
        }

        Ok(base)
    }

    /// HTTP client shared by the weather client and the icon fetcher.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build().context("Failed to build HTTP client")
    }
}
