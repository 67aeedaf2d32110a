use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::common::Orientation;
use crate::error::AppError;

const ENV_PREFIX: &str = "FORMULA_LENS";

pub const DEFAULT_PROMPT: &str = "If the image has a math formula written on it, return the formula in TeX format only. \
If the image does not contain a formula, just answer None. \
Never answer with a phrase other than the requested one.";

/// API key or app id. Never printed.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub interval_secs: f64,
    pub orientation: Orientation,
    pub jpeg_quality: u8,
    /// Still image fed to the pipeline in place of a live sensor.
    pub image_path: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_secs: 10.0,
            orientation: Orientation::Portrait,
            jpeg_quality: 85,
            image_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    pub endpoint: String,
    pub api_key: Secret,
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: Secret::default(),
            model: "gpt-4-vision-preview".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_tokens: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComputeSettings {
    pub endpoint: String,
    pub app_id: Secret,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.wolframalpha.com/v1/simple".to_string(),
            app_id: Secret::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl NetworkSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub capture: CaptureSettings,
    pub vision: VisionSettings,
    pub compute: ComputeSettings,
    pub network: NetworkSettings,
    pub logging: LoggingSettings,
}

impl Configuration {
    /// Layers an optional TOML file under `FORMULA_LENS__SECTION__KEY`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let configuration: Configuration = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Sampling period; rejects zero, negative, NaN and overflowing values.
    pub fn capture_interval(&self) -> Result<Duration, AppError> {
        Duration::try_from_secs_f64(self.capture.interval_secs)
            .ok()
            .filter(|interval| !interval.is_zero())
            .ok_or_else(|| {
                AppError::InvalidConfig("capture.interval_secs must be positive".to_string())
            })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.capture_interval()?;
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(AppError::InvalidConfig(
                "capture.jpeg_quality must be within 1..=100".to_string(),
            ));
        }
        if self.vision.endpoint.trim().is_empty() || self.compute.endpoint.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "service endpoints must not be empty".to_string(),
            ));
        }
        if self.vision.api_key.is_empty() {
            return Err(AppError::InvalidConfig("vision.api_key is required".to_string()));
        }
        if self.compute.app_id.is_empty() {
            return Err(AppError::InvalidConfig("compute.app_id is required".to_string()));
        }
        if self.network.request_timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "network.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
