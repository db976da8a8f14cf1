//! Append-only operator log with console echo.
//!
//! Each entry becomes one line of the form
//! `YYYY-MM-DD HH:MM:SS [Info] message` (UTC), appended to the log file and
//! mirrored to the console through `tracing`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use mirror_core::Severity;
use mirror_sync::LogSink;

use crate::error::{io_err, DaemonError};
use crate::log_rotation::{rotate_if_needed, MAX_LOG_BYTES, MAX_ROTATED_FILES};

/// File-backed [`LogSink`].
///
/// The file is reopened in append mode for every entry, so rotation between
/// entries never leaves the sink holding a renamed file.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLog {
    /// Create the parent directory and make sure the file is writable.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotate the file if it has outgrown [`MAX_LOG_BYTES`].
    pub fn rotate_if_needed(&self) {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match rotate_if_needed(&self.path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
            Ok(true) => tracing::info!(path = %self.path.display(), "log file rotated"),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "log rotation failed")
            }
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

/// Render one log line.
pub fn format_line(at: DateTime<Utc>, severity: Severity, message: &str) -> String {
    format!(
        "{} {} {message}",
        at.format("%Y-%m-%d %H:%M:%S"),
        severity.tag()
    )
}

impl LogSink for FileLog {
    fn log(&self, severity: Severity, message: &str) {
        let line = format_line(Utc::now(), severity, message);
        if let Err(err) = self.append(&line) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to append to log file");
        }
        match severity {
            Severity::Info => tracing::info!("{message}"),
            Severity::Error => tracing::error!("{message}"),
            Severity::Critical => tracing::error!(critical = true, "{message}"),
        }
    }
}
