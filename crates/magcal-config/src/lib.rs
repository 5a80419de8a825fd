//! Configuration management for magcal
//!
//! Handles the daemon's TOML configuration: device nodes, calibration storage,
//! sampling rate and output.

mod sections;

pub use sections::{CalibrationConfig, DeviceConfig, OutputConfig, OutputFormat, SamplingConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/magcal";
pub const USER_CONFIG_DIR: &str = "/data/misc/magcal";

/// Longest sampling period accepted (one minute)
pub const MAX_DELAY_US: u64 = 60_000_000;

/// Main daemon configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl DaemonConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Try user config first, then system config
        let user_config = Path::new(USER_CONFIG_DIR).join("magcal.toml");
        if user_config.exists() {
            return Self::load(&user_config);
        }

        let system_config = Path::new(CONFIG_DIR).join("magcal.toml");
        if system_config.exists() {
            return Self::load(&system_config);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the driver cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.data_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("device.data_path is empty".into()));
        }
        if self.device.sensitivity_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "device.sensitivity_path is empty".into(),
            ));
        }
        if self.calibration.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "calibration.store_path is empty".into(),
            ));
        }
        if self.sampling.delay_us > MAX_DELAY_US {
            return Err(ConfigError::Invalid(format!(
                "sampling.delay_us {} exceeds {}",
                self.sampling.delay_us, MAX_DELAY_US
            )));
        }
        Ok(())
    }
}
