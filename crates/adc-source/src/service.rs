//! Acquisition Service
//!
//! Hosted stand-in for the converter and its double-buffered transfer
//! channel: a dedicated thread fills buffer A, then B, then A again, raising
//! the completion signal after each window.

use crate::error::AcquisitionError;
use crate::source::{SampleSource, SourceKind};
use sample_buffer::{BufferId, DoubleBuffer, Notification};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Acquisition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Wall-clock delay between windows (simulation throttle only)
    pub window_pacing_us: u64,
    /// Stop after this many windows (runs until stopped if unset)
    #[serde(default)]
    pub window_limit: Option<u64>,
    /// Simulated input signal
    #[serde(default)]
    pub source: SourceKind,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            window_pacing_us: 1000,
            window_limit: None,
            source: SourceKind::default(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    produced: AtomicU64,
    dropped: AtomicU64,
    finished: AtomicBool,
}

/// Background acquisition thread
pub struct AcquisitionService {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl AcquisitionService {
    /// Spawn the acquisition thread with the configured source
    pub fn spawn(
        config: AcquisitionConfig,
        buffers: Arc<DoubleBuffer>,
        wake: Arc<Notify>,
    ) -> Result<Self, AcquisitionError> {
        let source = config.source.build()?;
        Self::spawn_with_source(config, buffers, wake, source)
    }

    /// Spawn the acquisition thread with an explicit source
    pub fn spawn_with_source(
        config: AcquisitionConfig,
        buffers: Arc<DoubleBuffer>,
        wake: Arc<Notify>,
        mut source: Box<dyn SampleSource + Send>,
    ) -> Result<Self, AcquisitionError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let shutdown_clone = shutdown.clone();
        let counters_clone = counters.clone();
        let pacing = Duration::from_micros(config.window_pacing_us);

        info!(
            "Starting acquisition: {} samples/window, pacing {}us",
            buffers.capacity(),
            config.window_pacing_us
        );

        let handle = std::thread::Builder::new()
            .name("adc-acquisition".to_string())
            .spawn(move || {
                let mut next = BufferId::A;
                let mut windows = 0u64;

                while !shutdown_clone.load(Ordering::SeqCst) {
                    if config.window_limit.is_some_and(|limit| windows >= limit) {
                        debug!("Window limit reached");
                        break;
                    }

                    match buffers.fill(next) {
                        Ok(mut guard) => {
                            if let Some(stale) = guard.superseded() {
                                debug!("Refilling buffer {:?} before it was drained", stale);
                                counters_clone.dropped.fetch_add(1, Ordering::Relaxed);
                            }
                            source.fill(&mut guard);
                            match guard.commit() {
                                Ok(Notification::Ready) => {}
                                Ok(Notification::Superseded(stale)) => {
                                    debug!("Buffer {:?} dropped before it was drained", stale);
                                    counters_clone.dropped.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(e) => error!("Completion signal failed: {}", e),
                            }
                            counters_clone.produced.fetch_add(1, Ordering::Relaxed);
                            wake.notify_one();
                        }
                        Err(e) => {
                            // The hardware keeps alternating; this window is simply lost
                            warn!("Acquisition overrun: {}", e);
                            counters_clone.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }

                    windows += 1;
                    next = next.other();
                    if !pacing.is_zero() {
                        std::thread::sleep(pacing);
                    }
                }

                counters_clone.finished.store(true, Ordering::SeqCst);
                wake.notify_one();
                info!("Acquisition stopped after {} windows", windows);
            })?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
            counters,
        })
    }

    /// Windows committed to the handoff
    pub fn windows_produced(&self) -> u64 {
        self.counters.produced.load(Ordering::Relaxed)
    }

    /// Windows lost to overruns on the acquisition side
    pub fn windows_dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.counters.finished.load(Ordering::SeqCst)
    }

    /// Stop acquisition and wait for the thread to exit
    pub fn stop(&mut self) -> Result<(), AcquisitionError> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| AcquisitionError::ThreadPanicked)?;
        }
        Ok(())
    }
}

impl Drop for AcquisitionService {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop acquisition: {}", e);
        }
    }
}
