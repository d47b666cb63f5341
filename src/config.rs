//! Optional user configuration at `~/.config/kunjungan/config.toml`.
//!
//! ```toml
//! state_file = "/home/ani/kunjungan/data_kunjungan.json"
//! output_dir = "/home/ani/Unduhan"
//! ```
//!
//! Both keys are optional. Without a file the state lives in
//! `data_kunjungan.json` in the working directory and exports land there too.

use crate::state::DEFAULT_STATE_FILE;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the form state is kept.
    pub state_file: Option<PathBuf>,
    /// Directory receiving exported workbooks.
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined.
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("kunjungan");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads the user configuration, or defaults when there is none.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let Ok(config_path) = Self::get_config_path() else {
            debug!("No config directory on this system, using defaults");
            return Ok(Self::default());
        };
        if !config_path.exists() {
            debug!("Config file not found at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        debug!("Config: {config:?}");
        Ok(config)
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
