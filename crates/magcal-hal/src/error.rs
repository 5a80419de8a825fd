//! Driver error taxonomy

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Sample not ready")]
    NotReady,

    #[error("Calibration configuration unreadable: {0}")]
    ConfigurationUnreadable(String),

    #[error("Failed to write calibration configuration: {0}")]
    ConfigurationWriteFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
