use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::decision::Thresholds;
use crate::model::Coordinate;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEZONE: &str = "auto";

/// Fixed coordinate used whenever the position source cannot answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        // Nairobi CBD
        Self { latitude: -1.286, longitude: 36.817, label: "Nairobi, KE".to_string() }
    }
}

impl FallbackConfig {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude, self.label.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Approximate position from the public IP address.
    #[default]
    Ip,
    /// No position source; always use the fallback.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub source: LocationSource,
    pub timeout_secs: u64,
    pub maximum_age_secs: u64,

    /// Optional fixed position; takes precedence over `source` when both are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::Ip,
            timeout_secs: 7,
            maximum_age_secs: 60,
            latitude: None,
            longitude: None,
        }
    }
}

impl LocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn maximum_age(&self) -> Duration {
        Duration::from_secs(self.maximum_age_secs)
    }

    pub fn fixed_position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub freshness_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { freshness_minutes: 30 }
    }
}

impl CacheConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_minutes * 60)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// timezone = "Africa/Nairobi"
///
/// [fallback]
/// latitude = -1.286
/// longitude = 36.817
/// label = "Nairobi, KE"
///
/// [thresholds]
/// probability_percent = 30.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone for the daily buckets, or "auto" for the coordinate's own zone.
    pub timezone: String,
    pub forecast_url: String,
    pub fallback: FallbackConfig,
    pub thresholds: Thresholds,
    pub cache: CacheConfig,
    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            fallback: FallbackConfig::default(),
            thresholds: Thresholds::default(),
            cache: CacheConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        Ok(cfg)
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
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the persisted forecast cache.
    pub fn cache_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.cache_dir().join("forecasts.json"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "umbrella", "umbrella")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Set a fixed position, or clear it with `None`.
    pub fn set_fixed_position(&mut self, position: Option<(f64, f64)>) {
        self.location.latitude = position.map(|(lat, _)| lat);
        self.location.longitude = position.map(|(_, lon)| lon);
    }
}
