//! Falling-Crossing Detector

use crate::accumulator::CrossingAccumulator;
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use tracing::{debug, trace};

/// Outcome of scanning one buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Crossings added to the accumulator
    pub crossings: u32,
    /// Index of the first counted crossing in this buffer
    pub first_crossing: Option<usize>,
    /// Index of a crossing that only armed the period counter
    pub armed_at: Option<usize>,
    /// Crossings after which the outlier clamp restarted the counter at its floor
    pub clamped: u32,
}

/// Stateful falling-crossing detector
///
/// The previous sample and the sample counter carry over from one buffer to
/// the next, so buffers must be scanned in the order they were produced.
#[derive(Debug, Clone)]
pub struct CrossingDetector {
    config: DetectorConfig,
    /// Last sample seen, carried across buffers
    previous_sample: Option<u16>,
    /// Samples since the last crossing (never zero)
    samples_since_crossing: u32,
    /// Whether a crossing has been seen since start or the last carry reset
    armed: bool,
}

impl CrossingDetector {
    /// Create a detector
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self {
            config,
            previous_sample: None,
            samples_since_crossing: 1,
            armed: false,
        })
    }

    /// Scan `buffer` in order, updating `acc`
    ///
    /// A crossing `elapsed` samples after the previous one contributes
    /// `scale / elapsed`. The very first crossing after start or
    /// [`reset_carry`](Self::reset_carry) has nothing to measure from and only
    /// arms the counter.
    pub fn scan(&mut self, buffer: &[u16], acc: &mut CrossingAccumulator) -> ScanSummary {
        let mut summary = ScanSummary::default();
        let threshold = self.config.threshold;

        for (index, &curr) in buffer.iter().enumerate() {
            let crossed = self
                .previous_sample
                .is_some_and(|prev| threshold.is_falling_crossing(prev, curr));
            self.previous_sample = Some(curr);

            if !crossed {
                self.samples_since_crossing = self.samples_since_crossing.saturating_add(1);
                continue;
            }

            if !self.armed {
                trace!("Detector armed at index {}", index);
                self.armed = true;
                self.samples_since_crossing = 1;
                summary.armed_at = Some(index);
                continue;
            }

            let elapsed = u64::from(self.samples_since_crossing.max(1));
            acc.record(self.config.scale / elapsed);
            summary.crossings += 1;
            if summary.first_crossing.is_none() {
                summary.first_crossing = Some(index);
            }

            self.samples_since_crossing = match acc.running_average() {
                Some(average) if average > self.config.clamp.ceiling => {
                    summary.clamped += 1;
                    self.config.clamp.floor
                }
                _ => 1,
            };
        }

        summary
    }

    /// Forget the carried sample and counter (after a lost window)
    pub fn reset_carry(&mut self) {
        debug!("Resetting detector carry state");
        self.previous_sample = None;
        self.samples_since_crossing = 1;
        self.armed = false;
    }

    /// Last sample seen
    pub fn previous_sample(&self) -> Option<u16> {
        self.previous_sample
    }

    /// Current value of the sample counter
    pub fn samples_since_crossing(&self) -> u32 {
        self.samples_since_crossing
    }

    /// Whether the period counter has been armed
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Active configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

impl Default for CrossingDetector {
    fn default() -> Self {
        Self {
            config: DetectorConfig::default(),
            previous_sample: None,
            samples_since_crossing: 1,
            armed: false,
        }
    }
}
