//! Simulated ADC Acquisition
//!
//! Provides the sample source abstraction, synthetic test signals, and a
//! background acquisition thread that fills the double buffer window by
//! window, the way the converter and its transfer channel do on the target.

mod error;
mod service;
mod source;

pub use error::AcquisitionError;
pub use service::{AcquisitionConfig, AcquisitionService};
pub use source::{Replay, SampleSource, SineWave, SourceKind, SquareWave};
