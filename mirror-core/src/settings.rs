//! Mirror settings: YAML file model, input normalization and validation.
//!
//! # Storage layout
//!
//! ```text
//! ~/.mirror/
//!   config.yaml        (optional settings file: mode 0600)
//!   logs/
//!     mirror.log       (default operator log)
//! ```
//!
//! # API pattern
//!
//! Functions that touch the home directory come in two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{MirrorRoots, SyncInterval};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.mirror/config.yaml`: pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".mirror").join("config.yaml")
}

/// `settings_path_at` convenience wrapper.
pub fn settings_path() -> Result<PathBuf, ConfigError> {
    Ok(settings_path_at(&home()?))
}

/// `<home>/.mirror/logs/mirror.log`: pure, no I/O.
pub fn default_log_path_at(home: &Path) -> PathBuf {
    home.join(".mirror").join("logs").join("mirror.log")
}

/// `default_log_path_at` convenience wrapper.
pub fn default_log_path() -> Result<PathBuf, ConfigError> {
    Ok(default_log_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Raw settings
// ---------------------------------------------------------------------------

/// Unvalidated inputs, as typed by the operator or read from YAML.
///
/// Paths stay strings here: quote stripping happens during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<i64>,
}

impl RawSettings {
    /// Fill every field still unset in `self` from `fallback`.
    pub fn or(self, fallback: RawSettings) -> RawSettings {
        RawSettings {
            source: self.source.or(fallback.source),
            replica: self.replica.or(fallback.replica),
            log_file: self.log_file.or(fallback.log_file),
            interval_secs: self.interval_secs.or(fallback.interval_secs),
        }
    }
}

/// Load settings from an explicit YAML file.
///
/// Returns `ConfigError::SettingsNotFound` if absent,
/// `ConfigError::Parse` (with path) if malformed.
pub fn load_from(path: &Path) -> Result<RawSettings, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::SettingsNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.mirror/config.yaml`, or empty settings if it does not exist.
pub fn load_or_default_at(home: &Path) -> Result<RawSettings, ConfigError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(RawSettings::default());
    }
    load_from(&path)
}

/// Atomically save settings to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_to(path: &Path, settings: &RawSettings) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Normalization
// ---------------------------------------------------------------------------

/// Trim whitespace and unwrap one pair of matching `"…"` or `'…'` quotes.
///
/// Shell drag-and-drop and "copy as path" both produce quoted paths.
pub fn strip_quotes(input: &str) -> String {
    let trimmed = input.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Parse an interval as typed at a prompt. Anything non-numeric counts as `0`,
/// which validation then coerces to the default.
pub fn parse_interval(input: &str) -> i64 {
    input.trim().parse().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// 4. Validation
// ---------------------------------------------------------------------------

/// Non-fatal adjustments made while validating, for the caller to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationNote {
    /// The replica root did not exist and was created.
    ReplicaCreated { path: PathBuf },
    /// The interval was not positive and the default was used instead.
    IntervalDefaulted { given: i64 },
}

impl ValidationNote {
    /// Operator-facing log message.
    pub fn message(&self) -> String {
        match self {
            ValidationNote::ReplicaCreated { path } => {
                format!("Replica directory did not exist, created it: {}", path.display())
            }
            ValidationNote::IntervalDefaulted { given } => format!(
                "Cannot sync every {given} seconds, going for a default {} seconds",
                SyncInterval::DEFAULT_SECS
            ),
        }
    }
}

/// Validated inputs, ready for the sync loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub roots: MirrorRoots,
    pub interval: SyncInterval,
    pub notes: Vec<ValidationNote>,
}

/// Normalize and validate the source, replica and interval inputs.
///
/// - Both paths are quote-stripped and must be non-empty.
/// - The source must be an existing directory.
/// - The replica is created (with ancestors) if missing.
/// - Both roots are canonicalized and must not contain each other.
/// - A non-positive interval becomes [`SyncInterval::DEFAULT_SECS`].
pub fn validate(source: &str, replica: &str, interval_secs: i64) -> Result<Settings, ConfigError> {
    let mut notes = Vec::new();

    let source = strip_quotes(source);
    if source.is_empty() {
        return Err(ConfigError::EmptySource);
    }
    let source = PathBuf::from(source);
    if !source.exists() {
        return Err(ConfigError::SourceMissing { path: source });
    }
    if !source.is_dir() {
        return Err(ConfigError::SourceNotDirectory { path: source });
    }

    let replica = strip_quotes(replica);
    if replica.is_empty() {
        return Err(ConfigError::EmptyReplica);
    }
    let replica = PathBuf::from(replica);

    // Containment is decided before anything is created, so a replica nested
    // in the source is rejected without touching the source tree.
    let source = std::fs::canonicalize(&source).map_err(|e| io_err(&source, e))?;
    let prospective =
        resolve_prospective(&replica).map_err(|e| ConfigError::ReplicaCreate {
            path: replica.clone(),
            source: e,
        })?;
    if source.starts_with(&prospective) || prospective.starts_with(&source) {
        return Err(ConfigError::OverlappingRoots {
            source_root: source,
            replica_root: prospective,
        });
    }

    if !replica.is_dir() {
        std::fs::create_dir_all(&replica).map_err(|e| ConfigError::ReplicaCreate {
            path: replica.clone(),
            source: e,
        })?;
        notes.push(ValidationNote::ReplicaCreated {
            path: replica.clone(),
        });
    }
    let replica = std::fs::canonicalize(&replica).map_err(|e| io_err(&replica, e))?;

    let interval = match SyncInterval::from_secs(interval_secs) {
        Some(interval) => interval,
        None => {
            notes.push(ValidationNote::IntervalDefaulted {
                given: interval_secs,
            });
            SyncInterval::default()
        }
    };

    Ok(Settings {
        roots: MirrorRoots::new(source, replica),
        interval,
        notes,
    })
}

/// Canonical form of `path` even when its tail does not exist yet: the
/// nearest existing ancestor is canonicalized and the missing names appended.
fn resolve_prospective(path: &Path) -> std::io::Result<PathBuf> {
    let mut base = path.to_path_buf();
    let mut missing = Vec::new();
    let mut resolved = loop {
        match std::fs::canonicalize(&base) {
            Ok(resolved) => break resolved,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let Some(name) = base.file_name().map(ToOwned::to_owned) else {
                    return Err(err);
                };
                missing.push(name);
                if !base.pop() {
                    return Err(err);
                }
                if base.as_os_str().is_empty() {
                    base = PathBuf::from(".");
                }
            }
            Err(err) => return Err(err),
        }
    };
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
