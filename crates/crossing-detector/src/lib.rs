//! Threshold Crossing Frequency Estimation
//!
//! Scans sample buffers for falling midpoint crossings and accumulates a
//! frequency estimate from the sample distance between consecutive crossings.

mod accumulator;
mod config;
mod detector;
mod error;

pub use accumulator::{CrossingAccumulator, FrequencyReading};
pub use config::{ClampPolicy, DetectorConfig, Threshold};
pub use detector::{CrossingDetector, ScanSummary};
pub use error::DetectorError;
