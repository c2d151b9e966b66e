//! Application Error Types

use adc_source::AcquisitionError;
use crossing_detector::DetectorError;
use thiserror::Error;

/// Errors raised while setting up or tearing down the frequency meter
#[derive(Debug, Error)]
pub enum FreqmeterError {
    /// Settings could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Settings parsed but cannot be used
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Detector rejected its configuration
    #[error(transparent)]
    Detector(#[from] DetectorError),

    /// Acquisition thread failure
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// Global log subscriber could not be installed
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}
