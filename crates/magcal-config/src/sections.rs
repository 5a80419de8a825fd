//! Daemon configuration sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Magnetometer device nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Character device streaming 8-byte measurement records
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// File exposing the three fuse ROM sensitivity bytes
    #[serde(default = "default_sensitivity_path")]
    pub sensitivity_path: PathBuf,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("/dev/akm8963")
}

fn default_sensitivity_path() -> PathBuf {
    PathBuf::from("/sys/class/magnetometer/akm8963/asa")
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            sensitivity_path: default_sensitivity_path(),
        }
    }
}

/// Hard-iron calibration persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Offset file, rewritten on every deactivation
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/data/misc/akmd_set.txt")
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

/// Sampling rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Period between samples in microseconds (0 = as fast as the device allows)
    #[serde(default = "default_delay_us")]
    pub delay_us: u64,
}

fn default_delay_us() -> u64 {
    200_000
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            delay_us: default_delay_us(),
        }
    }
}

/// Where published vectors go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per vector on stdout
    Json,
    /// Vectors logged at debug level
    #[default]
    Log,
}

/// Output and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            log_level: default_log_level(),
        }
    }
}
