use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid backend URL {0:?}")]
    InvalidUrl(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Selects the classifier behind the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    #[default]
    Live,
    Simulated,
}

/// Confidence reported for verdicts produced without the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfidence {
    pub qualified: f32,
    pub not_qualified: f32,
}

impl Default for FallbackConfidence {
    fn default() -> Self {
        Self {
            qualified: 0.75,
            not_qualified: 0.60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub backend_url: String,
    pub mode: Mode,
    pub request_timeout_secs: u64,
    pub short_circuit_after_failure: bool,
    pub fallback_confidence: FallbackConfidence,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            mode: Mode::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            short_circuit_after_failure: false,
            fallback_confidence: FallbackConfidence::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Reads `CLEANCAR_CONFIG` (optional YAML file), then applies
    /// `BACKEND_URL`, `PIPELINE_MODE` and `REQUEST_TIMEOUT_SECS` on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CLEANCAR_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(mode) = lookup("PIPELINE_MODE") {
            self.mode = Mode::from_str(mode.trim()).map_err(|_| ConfigError::InvalidValue {
                key: "PIPELINE_MODE",
                value: mode.clone(),
            })?;
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs =
                secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "REQUEST_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.backend_url)
            .map_err(|_| ConfigError::InvalidUrl(self.backend_url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(self.backend_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs",
                value: "0".to_string(),
            });
        }
        for (key, value) in [
            ("fallback_confidence.qualified", self.fallback_confidence.qualified),
            ("fallback_confidence.not_qualified", self.fallback_confidence.not_qualified),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}
