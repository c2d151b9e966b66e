//! Detector configuration

use crate::error::DetectorError;
use serde::{Deserialize, Serialize};

/// Falling-crossing threshold around the signal midpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    /// Midpoint level in raw ADC counts
    pub midpoint: u16,
    /// Upper band above the midpoint, in raw ADC counts
    pub hysteresis: u16,
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            midpoint: 0x400,
            hysteresis: 0x80,
        }
    }
}

impl Threshold {
    /// Create a threshold
    pub fn new(midpoint: u16, hysteresis: u16) -> Self {
        Self {
            midpoint,
            hysteresis,
        }
    }

    /// Whether `prev -> curr` is a falling crossing
    ///
    /// Both comparisons are inclusive. A drop that starts above the upper
    /// band also qualifies.
    pub fn is_falling_crossing(&self, prev: u16, curr: u16) -> bool {
        let upper = self.midpoint.saturating_add(self.hysteresis);
        (prev >= self.midpoint && curr <= self.midpoint) || (prev >= upper && curr <= self.midpoint)
    }
}

/// Guard against runaway contributions from spurious fast crossings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampPolicy {
    /// Running average above which the next window is lengthened
    pub ceiling: u64,
    /// Value the sample counter restarts from while the average is above `ceiling`
    pub floor: u32,
}

impl Default for ClampPolicy {
    fn default() -> Self {
        Self {
            ceiling: 45,
            floor: 2,
        }
    }
}

/// Crossing detector configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Crossing threshold
    #[serde(default)]
    pub threshold: Threshold,
    /// Scale constant turning a sample-count period into frequency units
    pub scale: u64,
    /// Outlier clamp
    #[serde(default)]
    pub clamp: ClampPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            scale: 1000,
            clamp: ClampPolicy::default(),
        }
    }
}

impl DetectorConfig {
    /// Check the values the scan arithmetic relies on
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.scale == 0 {
            return Err(DetectorError::InvalidConfig {
                field: "scale",
                reason: "must be greater than zero",
            });
        }
        if self.clamp.floor == 0 {
            return Err(DetectorError::InvalidConfig {
                field: "clamp.floor",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}
