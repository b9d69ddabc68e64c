//! Module-level diagnostics.
//!
//! Every [`ExecutionContext`](crate::context::ExecutionContext) carries a
//! [`Tracer`]. A trace message is logged as a `tracing` event and then offered
//! to each registered [`TraceListener`]. A listener may escalate a message by
//! returning a [`TraceError`]; the module that traced it propagates the error
//! and the run stops there.
//!
//! Listeners are registered before a run and are read-only during it:
//!
//! - [`StrictListener`] escalates warnings and errors (`strict = true`)
//! - [`RecordingListener`] keeps every message, for tests and summaries

use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TraceLevel {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraceLevel::Verbose => "verbose",
            TraceLevel::Information => "info",
            TraceLevel::Warning => "warning",
            TraceLevel::Error => "error",
            TraceLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{level} trace escalated: {message}")]
pub struct TraceError {
    pub level: TraceLevel,
    pub message: String,
}

pub trait TraceListener: Send + Sync {
    fn on_trace(&self, level: TraceLevel, message: &str) -> Result<(), TraceError>;
}

/// Fan-out point for trace messages.
#[derive(Clone, Default)]
pub struct Tracer {
    listeners: Vec<Arc<dyn TraceListener>>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn TraceListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&self, level: TraceLevel, message: &str) -> Result<(), TraceError> {
        match level {
            TraceLevel::Verbose => tracing::debug!("{message}"),
            TraceLevel::Information => tracing::info!("{message}"),
            TraceLevel::Warning => tracing::warn!("{message}"),
            TraceLevel::Error | TraceLevel::Critical => tracing::error!(%level, "{message}"),
        }
        for listener in &self.listeners {
            listener.on_trace(level, message)?;
        }
        Ok(())
    }

    pub fn verbose(&self, message: &str) -> Result<(), TraceError> {
        self.emit(TraceLevel::Verbose, message)
    }

    pub fn info(&self, message: &str) -> Result<(), TraceError> {
        self.emit(TraceLevel::Information, message)
    }

    pub fn warning(&self, message: &str) -> Result<(), TraceError> {
        self.emit(TraceLevel::Warning, message)
    }

    pub fn error(&self, message: &str) -> Result<(), TraceError> {
        self.emit(TraceLevel::Error, message)
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Turns any message at or above `threshold` into an error.
#[derive(Debug, Clone, Copy)]
pub struct StrictListener {
    threshold: TraceLevel,
}

impl StrictListener {
    pub fn new() -> Self {
        Self {
            threshold: TraceLevel::Warning,
        }
    }

    pub fn with_threshold(threshold: TraceLevel) -> Self {
        Self { threshold }
    }
}

impl Default for StrictListener {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceListener for StrictListener {
    fn on_trace(&self, level: TraceLevel, message: &str) -> Result<(), TraceError> {
        if level >= self.threshold {
            return Err(TraceError {
                level,
                message: message.to_string(),
            });
        }
        Ok(())
    }
}

/// Keeps every message it sees.
#[derive(Debug, Default)]
pub struct RecordingListener {
    messages: Mutex<Vec<(TraceLevel, String)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(TraceLevel, String)> {
        self.lock().clone()
    }

    /// Messages at `level` or above.
    pub fn at_least(&self, level: TraceLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l >= level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(TraceLevel, String)>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TraceListener for RecordingListener {
    fn on_trace(&self, level: TraceLevel, message: &str) -> Result<(), TraceError> {
        self.lock().push((level, message.to_string()));
        Ok(())
    }
}
