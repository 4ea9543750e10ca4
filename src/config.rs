//! Service configuration: TOML file plus environment overrides

use crate::error::{Result, ServiceError};
use forecast_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CACHE_DIR: &str = "FINSIGHT_CACHE_DIR";
pub const ENV_FIT_TIMEOUT_SECS: &str = "FINSIGHT_FIT_TIMEOUT_SECS";
pub const ENV_LOG: &str = "FINSIGHT_LOG";
pub const ENV_GENERATION_ENDPOINT: &str = "FINSIGHT_GENERATION_ENDPOINT";
pub const ENV_MODEL: &str = "FINSIGHT_MODEL";
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_GENAI_API_KEY";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forecast: ForecastSettings,
    pub fetch: FetchSettings,
    pub generation: GenerationSettings,
    pub storage: StorageSettings,
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecast: ForecastSettings::default(),
            fetch: FetchSettings::default(),
            generation: GenerationSettings::default(),
            storage: StorageSettings::default(),
            log: "finsight=info,forecast_engine=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub default_horizon: usize,
    pub fit_timeout_secs: u64,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            default_horizon: 12,
            fit_timeout_secs: 30,
            engine: EngineConfig::default(),
        }
    }
}

impl ForecastSettings {
    pub fn fit_timeout(&self) -> Duration {
        Duration::from_secs(self.fit_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root of the per-request artifact directories
    pub cache_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("finsight"),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Load from an optional file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ServiceError::Config(format!("Cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from `lookup`, normally the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.storage.cache_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(ENV_FIT_TIMEOUT_SECS) {
            self.forecast.fit_timeout_secs = secs.trim().parse().map_err(|_| {
                ServiceError::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_FIT_TIMEOUT_SECS, secs
                ))
            })?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log = filter;
        }
        if let Some(endpoint) = lookup(ENV_GENERATION_ENDPOINT) {
            self.generation.endpoint = endpoint;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.generation.model = model;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.forecast.default_horizon == 0 {
            return Err(ServiceError::Config(
                "forecast.default_horizon must be at least 1".to_string(),
            ));
        }
        if self.forecast.fit_timeout_secs == 0 {
            return Err(ServiceError::Config(
                "forecast.fit_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.fetch.max_bytes == 0 {
            return Err(ServiceError::Config(
                "fetch.max_bytes must be positive".to_string(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ServiceError::Config(
                "generation.model must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.generation.endpoint).map_err(|e| {
            ServiceError::Config(format!(
                "generation.endpoint '{}' is not a URL: {}",
                self.generation.endpoint, e
            ))
        })?;
        self.forecast
            .engine
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.generation.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
