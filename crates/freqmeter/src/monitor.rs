//! Consumer Loop
//!
//! Drains each ready buffer through the crossing detector and lets the
//! reporter render the averaged reading once a cycle completes.

use crate::error::FreqmeterError;
use crate::settings::Settings;
use crossing_detector::{CrossingAccumulator, CrossingDetector};
use reporter::{DiagnosticSink, DisplaySink, DisplayText, Reporter};
use sample_buffer::{BufferId, DoubleBuffer};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Start-up line sent to the diagnostic sink
pub const BANNER: &str = "----Initialized----";

/// What one loop iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// Nothing ready and no report due
    Idle,
    /// A buffer was scanned and released
    Drained {
        id: BufferId,
        crossings: u32,
        follows_gap: bool,
    },
    /// A report was rendered
    Reported(DisplayText),
}

/// Counters kept by the consumer loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// Buffers scanned
    pub buffers_drained: u64,
    /// Buffers that followed a lost window
    pub gaps: u64,
    /// Crossings counted across all cycles
    pub crossings: u64,
    /// Reports rendered
    pub reports: u64,
    /// Display writes that failed
    pub display_failures: u64,
    /// Windows lost in the handoff
    pub overruns: u64,
}

/// Single-threaded consumer of the double buffer
pub struct Monitor {
    buffers: Arc<DoubleBuffer>,
    detector: CrossingDetector,
    accumulator: CrossingAccumulator,
    reporter: Reporter,
    display: Box<dyn DisplaySink + Send>,
    diagnostics: Box<dyn DiagnosticSink + Send>,
    idle_wait: Duration,
    stats: MonitorStats,
    /// Overrun count already surfaced to the diagnostic sink
    reported_overruns: u64,
}

impl Monitor {
    /// Create the consumer for `buffers`
    pub fn new(
        settings: &Settings,
        buffers: Arc<DoubleBuffer>,
        display: Box<dyn DisplaySink + Send>,
        diagnostics: Box<dyn DiagnosticSink + Send>,
    ) -> Result<Self, FreqmeterError> {
        settings.validate()?;
        Ok(Self {
            buffers,
            detector: CrossingDetector::new(settings.detector)?,
            accumulator: CrossingAccumulator::new(),
            reporter: Reporter::new(settings.report.clone()),
            display,
            diagnostics,
            idle_wait: Duration::from_millis(settings.monitor.idle_wait_ms),
            stats: MonitorStats::default(),
            reported_overruns: 0,
        })
    }

    /// One loop iteration: report if due, otherwise drain a ready buffer
    ///
    /// A report falls due right after the drain that completes a cycle, so it
    /// goes out on the very next iteration even when the producer keeps a
    /// buffer ready on every poll.
    pub fn poll_once(&mut self) -> LoopEvent {
        if let Some(text) = self.reporter.maybe_report(&mut self.accumulator) {
            self.render(&text);
            self.surface_overruns();
            self.stats.reports += 1;
            return LoopEvent::Reported(text);
        }

        let Some(samples) = self.buffers.take_ready() else {
            return LoopEvent::Idle;
        };

        let id = samples.id();
        let follows_gap = samples.follows_gap();
        if follows_gap {
            // Samples before this buffer were lost; the carried state is stale
            warn!("Buffer {:?} follows an overrun, resetting detector carry", id);
            self.detector.reset_carry();
            self.stats.gaps += 1;
        }

        let summary = self.detector.scan(&samples, &mut self.accumulator);
        drop(samples);

        self.reporter.record_buffer();
        self.stats.buffers_drained += 1;
        self.stats.crossings += u64::from(summary.crossings);
        debug!("Drained buffer {:?}: {} crossings", id, summary.crossings);

        LoopEvent::Drained {
            id,
            crossings: summary.crossings,
            follows_gap,
        }
    }

    /// Loop until `shutdown` is set, sleeping on `wake` while idle
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>, wake: Arc<Notify>) -> MonitorStats {
        self.diagnostics.status(BANNER);
        info!("Monitor loop started");

        while !shutdown.load(Ordering::SeqCst) {
            if self.poll_once() == LoopEvent::Idle {
                // Timing out is fine: the next iteration polls again
                let _ = tokio::time::timeout(self.idle_wait, wake.notified()).await;
            }
        }

        self.stats.overruns = self.buffers.handoff().overruns();
        info!("Monitor loop stopped: {:?}", self.stats);
        self.stats
    }

    /// Counter snapshot
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            overruns: self.buffers.handoff().overruns(),
            ..self.stats
        }
    }

    /// Accumulator for the current reporting cycle
    pub fn accumulator(&self) -> &CrossingAccumulator {
        &self.accumulator
    }

    /// Crossing detector state
    pub fn detector(&self) -> &CrossingDetector {
        &self.detector
    }

    fn render(&mut self, text: &DisplayText) {
        info!("Frequency report: {:?}", text.status);
        if let Err(e) = self.display.write_at(text.row, text.column, &text.text) {
            // The next cycle overwrites the stale text
            warn!("Display write failed: {}", e);
            self.stats.display_failures += 1;
        }
    }

    fn surface_overruns(&mut self) {
        let total = self.buffers.handoff().overruns();
        let new = total - self.reported_overruns;
        if new > 0 {
            warn!("{} windows lost to overruns this cycle", new);
            self.diagnostics
                .status(&format!("Overrun: {} windows dropped ({} total)", new, total));
            self.reported_overruns = total;
        }
    }
}
