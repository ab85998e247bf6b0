use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::provider::ProviderId;
use crate::risk::NullAqiPolicy;

pub const DEFAULT_USER_AGENT: &str = "wildfire-risk (contact@wildfire-risk.local)";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Which FIRMS area endpoint to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmsFormat {
    #[default]
    Csv,
    Json,
}

impl FirmsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirmsFormat::Csv => "csv",
            FirmsFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmsSettings {
    pub dataset: String,
    pub area: String,
    pub format: FirmsFormat,
}

impl Default for FirmsSettings {
    fn default() -> Self {
        Self {
            dataset: "VIIRS_SNPP_NRT".to_string(),
            area: "USA_contiguous_and_Hawaii".to_string(),
            format: FirmsFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAqSettings {
    /// Readings older than this are ignored.
    pub max_age_hours: u32,
    /// Locations requested per lookup, capped at 100 upstream.
    pub limit: u32,
}

impl Default for OpenAqSettings {
    fn default() -> Self {
        Self { max_age_hours: 48, limit: 25 }
    }
}

/// Cache lifetimes in seconds, one per upstream source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub wildfires: u64,
    pub air_quality: u64,
    pub wind: u64,
    pub smoke: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { wildfires: 300, air_quality: 300, wind: 600, smoke: 900 }
    }
}

impl CacheSettings {
    pub fn wildfires_ttl(&self) -> Duration {
        Duration::from_secs(self.wildfires)
    }

    pub fn air_quality_ttl(&self) -> Duration {
        Duration::from_secs(self.air_quality)
    }

    pub fn wind_ttl(&self) -> Duration {
        Duration::from_secs(self.wind)
    }

    pub fn smoke_ttl(&self) -> Duration {
        Duration::from_secs(self.smoke)
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sent as `User-Agent` to FIRMS and NOAA, which ask for a contact address.
    pub user_agent: String,

    pub timeout_secs: u64,

    /// Search radius for `alerts` when none is given.
    pub default_radius_meters: f64,

    /// How stations without a reading enter the AQI mean.
    pub null_aqi: NullAqiPolicy,

    /// Example TOML:
    /// [providers.firms]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,

    pub firms: FirmsSettings,
    pub openaq: OpenAqSettings,
    pub cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            default_radius_meters: 100_000.0,
            null_aqi: NullAqiPolicy::default(),
            providers: HashMap::new(),
            firms: FirmsSettings::default(),
            openaq: OpenAqSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let radius = self.default_radius_meters;
        if !radius.is_finite() || radius <= 0.0 {
            bail!("default_radius_meters must be a positive number of meters, got {radius}");
        }
        Ok(())
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
        let dirs = ProjectDirs::from("dev", "wildfire-risk", "wildfire-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// Override stored API keys with non-empty `NASA_FIRMS_API_KEY` / `OPENAQ_API_KEY`.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for id in ProviderId::all() {
            if let Some(key) = lookup(id.env_var()).filter(|k| !k.trim().is_empty()) {
                self.upsert_provider_api_key(*id, key.trim().to_string());
            }
        }
    }
}
