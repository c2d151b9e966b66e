//! Crossing Accumulator

use std::fmt;

/// Average frequency over a reporting cycle, in scale units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrequencyReading(pub u64);

impl FrequencyReading {
    /// Raw value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrequencyReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Running sum of per-crossing contributions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossingAccumulator {
    sum_of_periods: u64,
    crossing_count: u32,
}

impl CrossingAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one crossing's contribution
    pub fn record(&mut self, contribution: u64) {
        self.sum_of_periods = self.sum_of_periods.saturating_add(contribution);
        self.crossing_count = self.crossing_count.saturating_add(1);
    }

    /// Sum of all contributions since the last reset
    pub fn sum_of_periods(&self) -> u64 {
        self.sum_of_periods
    }

    /// Crossings counted since the last reset
    pub fn crossing_count(&self) -> u32 {
        self.crossing_count
    }

    /// `sum / count`, or `None` before the first crossing
    pub fn running_average(&self) -> Option<u64> {
        if self.crossing_count == 0 {
            None
        } else {
            Some(self.sum_of_periods / u64::from(self.crossing_count))
        }
    }

    /// Current reading, if any crossing has been counted
    pub fn reading(&self) -> Option<FrequencyReading> {
        self.running_average().map(FrequencyReading)
    }

    /// Clear for the next reporting cycle
    pub fn reset(&mut self) {
        self.sum_of_periods = 0;
        self.crossing_count = 0;
    }
}
