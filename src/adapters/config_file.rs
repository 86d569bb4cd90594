//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`] over a single JSON document.  A missing file
//! loads as [`ControllerConfig::default()`]; a file that does not parse is
//! reported as [`ConfigError::Corrupted`].  Both directions validate, so an
//! out-of-range value never reaches the controller or the disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControllerConfig;

pub struct FileConfigAdapter {
    path: PathBuf,
}

impl FileConfigAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for FileConfigAdapter {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("CONFIG: {} not found, using defaults", self.path.display());
                return Ok(ControllerConfig::default());
            }
            Err(e) => return Err(ConfigError::Io(e.to_string())),
        };
        let config: ControllerConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        config.validate()?;
        info!("CONFIG: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json =
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| ConfigError::Io(e.to_string()))?;
        info!("CONFIG: saved {}", self.path.display());
        Ok(())
    }
}
