//! Acquisition Error Types

use thiserror::Error;

/// Errors raised by the simulated acquisition path
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Source parameters cannot produce a usable waveform
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// The acquisition thread could not be started
    #[error("Failed to spawn acquisition thread: {0}")]
    Spawn(String),

    /// The acquisition thread panicked
    #[error("Acquisition thread panicked")]
    ThreadPanicked,
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::Spawn(err.to_string())
    }
}
