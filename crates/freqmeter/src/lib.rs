//! Signal Frequency Meter
//!
//! Wires the double-buffered acquisition, the crossing detector and the
//! periodic reporter into one consumer loop.

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub mod error;
pub mod monitor;
pub mod settings;

pub use error::FreqmeterError;
pub use monitor::{LoopEvent, Monitor, MonitorStats, BANNER};
pub use settings::{BufferSettings, LoggingSettings, MonitorSettings, Settings, ENV_PREFIX};

/// Environment variable naming the optional settings file
pub const CONFIG_PATH_VAR: &str = "FREQMETER_CONFIG";

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), FreqmeterError> {
    let level = Level::from_str(&settings.level)
        .map_err(|e| FreqmeterError::Logging(format!("{}: {}", settings.level, e)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(true);

    let result = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| FreqmeterError::Logging(e.to_string()))
}
