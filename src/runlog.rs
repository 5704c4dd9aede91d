//! Run log and run state
//!
//! The log is the only state a run produces: a timestamped, leveled,
//! append-only list of entries, cleared when the next run starts. Every
//! entry is also emitted as a `tracing` event and handed to an optional
//! observer so the CLI can render it live.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Success => write!(f, "success"),
        }
    }
}

/// A single log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Callback invoked for each appended entry
pub type LogObserver = Box<dyn Fn(&LogEntry) + Send + Sync>;

/// Append-only log of one run
#[derive(Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    step: Option<u8>,
    observer: Option<LogObserver>,
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog")
            .field("entries", &self.entries)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that reports each entry to `observer`
    pub fn with_observer(observer: LogObserver) -> Self {
        Self {
            observer: Some(observer),
            ..Self::default()
        }
    }

    /// Drop all entries; only called when a run starts
    pub fn clear(&mut self) {
        self.entries.clear();
        self.step = None;
    }

    /// Tag subsequent `tracing` events with a step number
    pub fn set_step(&mut self, step: u8) {
        self.step = Some(step);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Success, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        let step = self.step.unwrap_or(0);
        match level {
            LogLevel::Error => tracing::error!(step, "{}", message),
            LogLevel::Info | LogLevel::Success => tracing::info!(step, %level, "{}", message),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        };
        if let Some(observer) = &self.observer {
            observer(&entry);
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.level == LogLevel::Error)
            .count()
    }

    /// Whether any entry contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }
}

/// Shared "run in progress" flag
///
/// Cloning shares the flag, so an observer can watch a run it does not own.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    running: Arc<AtomicBool>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark a run as started; the returned guard clears the flag on drop
    pub fn begin(&self) -> Result<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::RunInProgress)?;
        Ok(RunGuard {
            running: Arc::clone(&self.running),
        })
    }
}

/// Clears the running flag when dropped, on every exit path
#[derive(Debug)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut log = RunLog::new();
        log.info("first");
        log.error("second");
        log.success("third");

        let levels: Vec<LogLevel> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Error, LogLevel::Success]);
        assert_eq!(log.entries()[1].message, "second");
        assert_eq!(log.error_count(), 1);
        assert!(log.entries()[0].timestamp <= log.entries()[2].timestamp);
    }

    #[test]
    fn test_clear_empties_log() {
        let mut log = RunLog::new();
        log.info("stale");
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_observer_sees_every_entry() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut log = RunLog::with_observer(Box::new(move |entry| {
            sink.lock().unwrap().push(entry.message.clone());
        }));
        log.info("a");
        log.error("b");
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_run_state_refuses_second_begin() {
        let state = RunState::new();
        let guard = state.begin().unwrap();
        assert!(state.is_running());
        assert!(matches!(state.begin(), Err(Error::RunInProgress)));
        drop(guard);
        assert!(!state.is_running());
        assert!(state.begin().is_ok());
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Success).unwrap(), "\"success\"");
    }
}
