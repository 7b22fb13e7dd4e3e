//! Typed configuration document persisted as JSON.

use std::path::PathBuf;
use std::time::Duration;

use rsu_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::validate::{mask_api_key, valid_api_key};

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// API key for the remote analytics service.
    pub api_key: Option<String>,
    /// Installation `Accounts` directory that holds per-account replay folders.
    pub replays_root: Option<PathBuf>,
    /// Base URL of the remote analytics API.
    pub api_root: String,
    /// Logging preferences.
    pub logging: LoggingSettings,
    /// Detection and upload pipeline tuning.
    pub pipeline: PipelineSettings,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            replays_root: None,
            api_root: defaults::API_ROOT.to_string(),
            logging: LoggingSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl UploaderConfig {
    /// Return the stored API key if present and well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no key is stored and
    /// [`ConfigError::InvalidApiKey`] when the stored key is malformed.
    pub fn require_api_key(&self) -> ConfigResult<&str> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        if valid_api_key(key) {
            Ok(key)
        } else {
            Err(ConfigError::InvalidApiKey)
        }
    }

    /// Copy of the document with the API key hidden, for display.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            api_key: self.api_key.as_deref().map(mask_api_key),
            ..self.clone()
        }
    }
}

/// Logging preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level filter applied when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: rsu_telemetry::DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::infer(),
        }
    }
}

/// Timing and filtering knobs for the detection and upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Milliseconds between file size samples.
    pub stability_interval_ms: u64,
    /// Size a replay must exceed before it can be considered complete.
    pub min_replay_bytes: u64,
    /// Milliseconds between status queries.
    pub status_interval_ms: u64,
    /// Suffix a created file name must end with to be treated as a replay.
    pub replay_suffix: String,
    /// Timeout applied to each remote API request.
    pub http_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stability_interval_ms: defaults::STABILITY_INTERVAL_MS,
            min_replay_bytes: defaults::MIN_REPLAY_BYTES,
            status_interval_ms: defaults::STATUS_INTERVAL_MS,
            replay_suffix: defaults::REPLAY_SUFFIX.to_string(),
            http_timeout_secs: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

impl PipelineSettings {
    /// Sampling interval for the stability detector.
    #[must_use]
    pub const fn stability_interval(&self) -> Duration {
        Duration::from_millis(self.stability_interval_ms)
    }

    /// Polling interval for the status poller.
    #[must_use]
    pub const fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    /// Per-request timeout for the remote API client.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
