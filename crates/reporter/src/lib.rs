//! Frequency Reporting
//!
//! Turns the accumulated crossing statistics into fixed-width display text
//! once per reporting cycle, and defines the display and diagnostic sinks the
//! text is written to.

mod error;
mod report;
mod sink;

pub use error::DisplayError;
pub use report::{DisplayText, ReadingStatus, ReportConfig, Reporter};
pub use sink::{
    DiagnosticSink, DisplaySink, MemoryDiagnostics, MemoryDisplay, TracingDiagnostics,
    TracingDisplay,
};
