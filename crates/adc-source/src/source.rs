//! Simulated Converter Sources

use crate::error::AcquisitionError;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Anything that can produce a window of raw converter samples
///
/// Successive calls must continue the same signal, so that the last sample of
/// one window and the first of the next are adjacent in time.
pub trait SampleSource {
    /// Fill `buf` with the next `buf.len()` samples
    fn fill(&mut self, buf: &mut [u16]);
}

/// Square wave, high for the first half of each period
#[derive(Debug, Clone)]
pub struct SquareWave {
    period: u32,
    low: u16,
    high: u16,
    phase: u32,
}

impl SquareWave {
    /// Create a square wave with `period` samples per cycle
    pub fn new(period: u32, low: u16, high: u16) -> Result<Self, AcquisitionError> {
        if period < 2 {
            return Err(AcquisitionError::InvalidSource(format!(
                "square period must be at least 2 samples, got {}",
                period
            )));
        }
        Ok(Self {
            period,
            low,
            high,
            phase: 0,
        })
    }
}

impl SampleSource for SquareWave {
    fn fill(&mut self, buf: &mut [u16]) {
        let half = self.period / 2;
        for sample in buf.iter_mut() {
            *sample = if self.phase < half { self.high } else { self.low };
            self.phase = (self.phase + 1) % self.period;
        }
    }
}

/// Sine wave around a midpoint
#[derive(Debug, Clone)]
pub struct SineWave {
    period: u32,
    midpoint: u16,
    amplitude: u16,
    phase: u32,
}

impl SineWave {
    /// Create a sine wave with `period` samples per cycle
    pub fn new(period: u32, midpoint: u16, amplitude: u16) -> Result<Self, AcquisitionError> {
        if period < 4 {
            return Err(AcquisitionError::InvalidSource(format!(
                "sine period must be at least 4 samples, got {}",
                period
            )));
        }
        Ok(Self {
            period,
            midpoint,
            amplitude,
            phase: 0,
        })
    }
}

impl SampleSource for SineWave {
    fn fill(&mut self, buf: &mut [u16]) {
        let mid = f64::from(self.midpoint);
        let amp = f64::from(self.amplitude);
        for sample in buf.iter_mut() {
            // Quarter-sample offset keeps samples off the exact zero crossings
            let angle = TAU * (f64::from(self.phase) + 0.25) / f64::from(self.period);
            let value = (mid + amp * angle.sin()).round();
            *sample = value.clamp(0.0, f64::from(u16::MAX)) as u16;
            self.phase = (self.phase + 1) % self.period;
        }
    }
}

/// Loops over a recorded sample sequence
#[derive(Debug, Clone)]
pub struct Replay {
    samples: Vec<u16>,
    position: usize,
}

impl Replay {
    /// Create a replay source
    pub fn new(samples: Vec<u16>) -> Result<Self, AcquisitionError> {
        if samples.is_empty() {
            return Err(AcquisitionError::InvalidSource(
                "replay needs at least one sample".to_string(),
            ));
        }
        Ok(Self {
            samples,
            position: 0,
        })
    }
}

impl SampleSource for Replay {
    fn fill(&mut self, buf: &mut [u16]) {
        for sample in buf.iter_mut() {
            *sample = self.samples[self.position];
            self.position = (self.position + 1) % self.samples.len();
        }
    }
}

/// Configured waveform for the simulated converter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Square wave between two levels
    Square { period: u32, low: u16, high: u16 },
    /// Sine wave around a midpoint
    Sine {
        period: u32,
        midpoint: u16,
        amplitude: u16,
    },
    /// Recorded samples played in a loop
    Replay { samples: Vec<u16> },
}

impl Default for SourceKind {
    fn default() -> Self {
        // One falling edge every 20 samples around the 0x400 midpoint
        SourceKind::Square {
            period: 20,
            low: 0x200,
            high: 0x600,
        }
    }
}

impl SourceKind {
    /// Build the configured source
    pub fn build(&self) -> Result<Box<dyn SampleSource + Send>, AcquisitionError> {
        Ok(match self {
            SourceKind::Square { period, low, high } => {
                Box::new(SquareWave::new(*period, *low, *high)?)
            }
            SourceKind::Sine {
                period,
                midpoint,
                amplitude,
            } => Box::new(SineWave::new(*period, *midpoint, *amplitude)?),
            SourceKind::Replay { samples } => Box::new(Replay::new(samples.clone())?),
        })
    }
}
