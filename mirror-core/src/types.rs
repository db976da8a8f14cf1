//! Domain types shared across the mirror crates.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SyncInterval
// ---------------------------------------------------------------------------

/// Seconds between two passes. Always at least one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct SyncInterval(u64);

impl SyncInterval {
    /// Interval used when the configured value is not positive.
    pub const DEFAULT_SECS: u64 = 30;

    /// Returns `None` when `secs < 1`.
    pub fn from_secs(secs: i64) -> Option<Self> {
        u64::try_from(secs).ok().filter(|s| *s >= 1).map(Self)
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for SyncInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

impl TryFrom<i64> for SyncInterval {
    type Error = String;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        Self::from_secs(secs).ok_or_else(|| format!("sync interval must be >= 1, got {secs}"))
    }
}

impl From<SyncInterval> for u64 {
    fn from(interval: SyncInterval) -> Self {
        interval.0
    }
}

impl fmt::Display for SyncInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of an operator log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Critical,
}

impl Severity {
    /// Bracketed tag written in front of every log line, e.g. `[Error]`.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Info => "[Info]",
            Severity::Error => "[Error]",
            Severity::Critical => "[Critical]",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "Info",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// MirrorRoots
// ---------------------------------------------------------------------------

/// The validated pair of roots a pass mirrors between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirrorRoots {
    pub source: PathBuf,
    pub replica: PathBuf,
}

impl MirrorRoots {
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
        }
    }
}
