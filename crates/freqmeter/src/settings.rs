//! Layered application settings

use crate::error::FreqmeterError;
use adc_source::AcquisitionConfig;
use config::{Config, Environment, File, FileFormat};
use crossing_detector::DetectorConfig;
use reporter::ReportConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix (`FREQMETER__REPORT__CADENCE=100`)
pub const ENV_PREFIX: &str = "FREQMETER";

/// Sample buffer sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSettings {
    /// Samples per buffer
    pub capacity: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity: sample_buffer::DEFAULT_CAPACITY,
        }
    }
}

/// Consumer loop tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Longest wait for a wake-up before the loop polls again (ms)
    pub idle_wait_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { idle_wait_ms: 10 }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// All runtime settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub buffer: BufferSettings,
    pub detector: DetectorConfig,
    pub report: ReportConfig,
    pub acquisition: AcquisitionConfig,
    pub monitor: MonitorSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Defaults, then the optional config file, then `FREQMETER__*` variables
    pub fn load(path: Option<&str>) -> Result<Self, FreqmeterError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::finish(config)
    }

    /// Defaults overlaid with a TOML document
    pub fn from_toml(text: &str) -> Result<Self, FreqmeterError> {
        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self, FreqmeterError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), FreqmeterError> {
        if self.buffer.capacity == 0 {
            return Err(FreqmeterError::InvalidSettings(
                "buffer.capacity must be greater than zero".to_string(),
            ));
        }
        if self.report.cadence == 0 {
            return Err(FreqmeterError::InvalidSettings(
                "report.cadence must be greater than zero".to_string(),
            ));
        }
        if self.report.valid_min > self.report.valid_max {
            return Err(FreqmeterError::InvalidSettings(format!(
                "report.valid_min {} exceeds report.valid_max {}",
                self.report.valid_min, self.report.valid_max
            )));
        }
        if self.report.width == 0 {
            return Err(FreqmeterError::InvalidSettings(
                "report.width must be greater than zero".to_string(),
            ));
        }
        self.detector.validate()?;
        self.acquisition.source.build()?;
        Ok(())
    }
}
