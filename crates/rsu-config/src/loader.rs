//! Load and persist the configuration document on disk.
//!
//! # Design
//! - A missing file is not an error; callers get defaults and can save later.
//! - Every loaded document is validated before it is handed out.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use crate::error::{ConfigError, ConfigResult};
use crate::model::UploaderConfig;
use crate::validate::validate;

/// Default location of the configuration document for the current user.
///
/// # Errors
///
/// Returns [`ConfigError::MissingConfigDir`] when the platform config
/// directory cannot be determined.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    let base = dirs::config_dir().ok_or(ConfigError::MissingConfigDir)?;
    Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Handle on a configuration document stored at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `explicit` when given, otherwise by the default location.
    ///
    /// # Errors
    ///
    /// Returns an error when no explicit path is given and the default
    /// location cannot be determined.
    pub fn locate(explicit: Option<PathBuf>) -> ConfigResult<Self> {
        match explicit {
            Some(path) => Ok(Self::new(path)),
            None => default_config_path().map(Self::new),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the document, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn load(&self) -> ConfigResult<UploaderConfig> {
        let config = match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|source| ConfigError::json("config.parse", &self.path, source))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no configuration file, using defaults");
                UploaderConfig::default()
            }
            Err(err) => return Err(ConfigError::io("config.read", &self.path, err)),
        };

        validate(&config)?;
        Ok(config)
    }

    /// Validate and write the document, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error when validation fails or the file cannot be written.
    pub fn save(&self, config: &UploaderConfig) -> ConfigResult<()> {
        validate(config)?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| ConfigError::io("config.create_dir", parent, err))?;
        }

        let mut rendered = serde_json::to_string_pretty(config)
            .map_err(|source| ConfigError::json("config.render", &self.path, source))?;
        rendered.push('\n');
        fs::write(&self.path, rendered)
            .map_err(|err| ConfigError::io("config.write", &self.path, err))?;

        debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}
