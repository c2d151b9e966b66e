//! Frequency Meter - Main Entry Point

use adc_source::AcquisitionService;
use freqmeter::{init_logging, FreqmeterError, Monitor, Settings, CONFIG_PATH_VAR};
use reporter::{TracingDiagnostics, TracingDisplay};
use sample_buffer::DoubleBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), FreqmeterError> {
    let config_path = std::env::var(CONFIG_PATH_VAR).ok();
    let settings = Settings::load(config_path.as_deref())?;
    init_logging(&settings.logging)?;

    info!("=== Frequency Meter v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Buffer capacity {} samples, report every {} buffers",
        settings.buffer.capacity, settings.report.cadence
    );

    let buffers = Arc::new(DoubleBuffer::new(settings.buffer.capacity));
    let wake = Arc::new(Notify::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut monitor = Monitor::new(
        &settings,
        buffers.clone(),
        Box::new(TracingDisplay::default()),
        Box::new(TracingDiagnostics),
    )?;
    let mut acquisition =
        AcquisitionService::spawn(settings.acquisition.clone(), buffers, wake.clone())?;

    let task = {
        let shutdown = shutdown.clone();
        let wake = wake.clone();
        tokio::spawn(async move { monitor.run(shutdown, wake).await })
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupt received, shutting down");
                break;
            }
            _ = poll.tick() => {
                if acquisition.is_finished() {
                    info!("Acquisition finished, shutting down");
                    break;
                }
            }
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    wake.notify_one();

    match task.await {
        Ok(stats) => info!(
            "Drained {} buffers, {} reports, {} overruns",
            stats.buffers_drained, stats.reports, stats.overruns
        ),
        Err(e) => error!("Monitor task failed: {}", e),
    }

    acquisition.stop()?;
    info!(
        "Acquisition produced {} windows, dropped {}",
        acquisition.windows_produced(),
        acquisition.windows_dropped()
    );

    Ok(())
}
