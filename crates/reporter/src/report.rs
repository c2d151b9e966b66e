//! Periodic Frequency Reporter

use crossing_detector::CrossingAccumulator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Reporter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Consumed buffers per reporting cycle
    pub cadence: u32,
    /// Lowest average shown as a number
    pub valid_min: u64,
    /// Highest average shown as a number
    pub valid_max: u64,
    /// Display row of the reading
    pub row: u8,
    /// Display column of the reading
    pub column: u8,
    /// Characters written per report (shorter text is space padded)
    pub width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cadence: 3500,
            valid_min: 1,
            valid_max: 100,
            row: 0,
            column: 0,
            width: 16,
        }
    }
}

/// Classification of an averaged reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStatus {
    /// Average inside the valid range
    Valid(u64),
    /// No crossing was counted during the cycle
    Unavailable,
    /// Average outside the valid range
    OutOfRange(u64),
}

/// Text ready for the character display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayText {
    pub row: u8,
    pub column: u8,
    pub text: String,
    pub status: ReadingStatus,
}

/// Turns the accumulator into display text every `cadence` buffers
pub struct Reporter {
    config: ReportConfig,
    /// Buffers consumed since the last report
    loop_count: u32,
    /// Reports emitted
    reports: u64,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(config: ReportConfig) -> Self {
        info!(
            "Creating reporter: cadence={} buffers, valid range {}..={}",
            config.cadence, config.valid_min, config.valid_max
        );
        Self {
            config,
            loop_count: 0,
            reports: 0,
        }
    }

    /// Count one consumed buffer
    pub fn record_buffer(&mut self) {
        self.loop_count = self.loop_count.saturating_add(1);
    }

    /// Whether a report is due
    pub fn is_due(&self) -> bool {
        self.loop_count >= self.config.cadence
    }

    /// Emit a report if one is due, resetting the accumulator and loop count
    pub fn maybe_report(&mut self, acc: &mut CrossingAccumulator) -> Option<DisplayText> {
        if !self.is_due() {
            return None;
        }

        let status = self.classify(acc);
        debug!(
            "Report after {} buffers: {} crossings, sum {}",
            self.loop_count,
            acc.crossing_count(),
            acc.sum_of_periods()
        );

        acc.reset();
        self.loop_count = 0;
        self.reports += 1;

        Some(DisplayText {
            row: self.config.row,
            column: self.config.column,
            text: self.render(status),
            status,
        })
    }

    /// Classify the current average
    pub fn classify(&self, acc: &CrossingAccumulator) -> ReadingStatus {
        match acc.reading() {
            None => ReadingStatus::Unavailable,
            Some(reading) => {
                let value = reading.value();
                if (self.config.valid_min..=self.config.valid_max).contains(&value) {
                    ReadingStatus::Valid(value)
                } else {
                    ReadingStatus::OutOfRange(value)
                }
            }
        }
    }

    /// Fixed-width display text for `status`
    pub fn render(&self, status: ReadingStatus) -> String {
        let text = match status {
            ReadingStatus::Valid(value) => format!("Freq:{:03}", value),
            ReadingStatus::Unavailable => "Freq:N/A".to_string(),
            ReadingStatus::OutOfRange(_) => "Freq:OutOfRange".to_string(),
        };
        let width = self.config.width;
        format!("{:<width$.width$}", text)
    }

    /// Buffers consumed in the current cycle
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Reports emitted so far
    pub fn reports(&self) -> u64 {
        self.reports
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(cadence: u32) -> Reporter {
        Reporter::new(ReportConfig {
            cadence,
            ..Default::default()
        })
    }

    #[test]
    fn test_not_due_before_cadence() {
        let mut reporter = quick(3);
        let mut acc = CrossingAccumulator::new();
        reporter.record_buffer();
        reporter.record_buffer();
        assert!(reporter.maybe_report(&mut acc).is_none());
        assert_eq!(reporter.loop_count(), 2);
    }

    #[test]
    fn test_valid_reading() {
        let mut reporter = quick(1);
        let mut acc = CrossingAccumulator::new();
        acc.record(50);
        acc.record(48);
        reporter.record_buffer();

        let report = reporter.maybe_report(&mut acc).unwrap();
        assert_eq!(report.status, ReadingStatus::Valid(49));
        assert_eq!(report.text, "Freq:049        ");
        assert_eq!(report.text.len(), 16);
        assert_eq!((report.row, report.column), (0, 0));

        // Accumulator and loop count start over
        assert_eq!(acc.crossing_count(), 0);
        assert_eq!(reporter.loop_count(), 0);
        assert_eq!(reporter.reports(), 1);
    }

    #[test]
    fn test_no_crossings_is_unavailable() {
        let mut reporter = quick(1);
        let mut acc = CrossingAccumulator::new();
        reporter.record_buffer();

        let report = reporter.maybe_report(&mut acc).unwrap();
        assert_eq!(report.status, ReadingStatus::Unavailable);
        assert_eq!(report.text.trim_end(), "Freq:N/A");
    }

    #[test]
    fn test_above_range_uses_sentinel() {
        let mut reporter = quick(1);
        let mut acc = CrossingAccumulator::new();
        acc.record(250);
        reporter.record_buffer();

        let report = reporter.maybe_report(&mut acc).unwrap();
        assert_eq!(report.status, ReadingStatus::OutOfRange(250));
        assert_eq!(report.text, "Freq:OutOfRange ");
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let reporter = Reporter::default();
        let mut acc = CrossingAccumulator::new();
        acc.record(100);
        assert_eq!(reporter.classify(&acc), ReadingStatus::Valid(100));

        acc.reset();
        acc.record(0);
        assert_eq!(reporter.classify(&acc), ReadingStatus::OutOfRange(0));

        acc.reset();
        acc.record(1);
        assert_eq!(reporter.classify(&acc), ReadingStatus::Valid(1));
    }

    #[test]
    fn test_text_truncated_to_width() {
        let reporter = Reporter::new(ReportConfig {
            width: 8,
            ..Default::default()
        });
        assert_eq!(reporter.render(ReadingStatus::OutOfRange(500)), "Freq:Out");
    }
}
