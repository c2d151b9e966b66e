//! Detector Error Types

use thiserror::Error;

/// Errors raised by detector setup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    /// A configuration value would break the scan arithmetic
    #[error("Invalid detector config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}
