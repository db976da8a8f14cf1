//! Operator log sink.
//!
//! The indexer and reconciler never write to a global log: they receive a
//! `&dyn LogSink` and report every notable event through it. Routine no-op
//! comparisons are not reported.

use std::sync::Mutex;

use mirror_core::Severity;

/// Destination for operator-facing log entries.
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    fn critical(&self, message: &str) {
        self.log(Severity::Critical, message);
    }
}

/// A single recorded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

/// In-memory sink. Used by tests and by callers that want to inspect what a
/// pass reported.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// `true` if any entry's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }

    /// Number of entries whose message contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.message.contains(needle))
            .count()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl LogSink for MemoryLog {
    fn log(&self, severity: Severity, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(LogEntry {
                severity,
                message: message.to_string(),
            });
    }
}
