//! Display Error Types

use thiserror::Error;

/// Errors reported by a display sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// The write did not reach the display
    #[error("Display write failed: {0}")]
    WriteFailed(String),

    /// Position outside the display area
    #[error("Position ({row}, {column}) is outside the display")]
    OutOfBounds { row: u8, column: u8 },
}
