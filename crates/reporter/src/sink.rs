//! Display and Diagnostic Sinks

use crate::error::DisplayError;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Character display accepting positioned text
pub trait DisplaySink {
    /// Write `text` starting at (`row`, `column`)
    fn write_at(&mut self, row: u8, column: u8, text: &str) -> Result<(), DisplayError>;
}

/// Free-form operator status lines
pub trait DiagnosticSink {
    /// Emit one status line
    fn status(&mut self, line: &str);
}

/// Renders display writes as log events, sized like a character LCD
#[derive(Debug, Clone, Copy)]
pub struct TracingDisplay {
    rows: u8,
    columns: u8,
}

impl TracingDisplay {
    /// Create a display with the given geometry
    pub fn new(rows: u8, columns: u8) -> Self {
        Self { rows, columns }
    }
}

impl Default for TracingDisplay {
    fn default() -> Self {
        // 2x16 character module
        Self::new(2, 16)
    }
}

impl DisplaySink for TracingDisplay {
    fn write_at(&mut self, row: u8, column: u8, text: &str) -> Result<(), DisplayError> {
        if row >= self.rows || column >= self.columns {
            return Err(DisplayError::OutOfBounds { row, column });
        }
        // Characters past the right edge are not shown
        let visible: String = text.chars().take(usize::from(self.columns - column)).collect();
        info!(target: "display", row, column, "[{}]", visible);
        Ok(())
    }
}

/// Sends status lines to the log
#[derive(Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn status(&mut self, line: &str) {
        info!(target: "console", "{}", line);
    }
}

/// In-memory display that keeps every write; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    writes: Arc<Mutex<Vec<(u8, u8, String)>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryDisplay {
    /// Create an empty display
    pub fn new() -> Self {
        Self::default()
    }

    /// All successful writes, oldest first
    pub fn writes(&self) -> Vec<(u8, u8, String)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Most recent text written
    pub fn last_text(&self) -> Option<String> {
        self.writes().last().map(|(_, _, text)| text.clone())
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }
}

impl DisplaySink for MemoryDisplay {
    fn write_at(&mut self, row: u8, column: u8, text: &str) -> Result<(), DisplayError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(DisplayError::WriteFailed("display offline".to_string()));
        }
        let mut writes = self
            .writes
            .lock()
            .map_err(|e| DisplayError::WriteFailed(format!("Lock error: {}", e)))?;
        writes.push((row, column, text.to_string()));
        Ok(())
    }
}

/// In-memory diagnostic sink; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemoryDiagnostics {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryDiagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn status(&mut self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
