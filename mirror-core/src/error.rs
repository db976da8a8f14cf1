//! Error types for mirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading settings or validating the mirror inputs.
///
/// Every variant except the settings-file ones is fatal for the process:
/// no pass may run until they are resolved.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source path was empty or whitespace-only.
    #[error("source path is empty: nothing to sync")]
    EmptySource,

    /// The source path does not exist.
    #[error("source folder doesn't exist: {path}")]
    SourceMissing { path: PathBuf },

    /// The source path exists but is not a directory.
    #[error("source path is not a directory: {path}")]
    SourceNotDirectory { path: PathBuf },

    /// The replica path was empty or whitespace-only.
    #[error("replica folder not specified: nowhere to sync")]
    EmptyReplica,

    /// The replica did not exist and could not be created.
    #[error("cannot create replica folder {path}: {source}")]
    ReplicaCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One root contains the other, so a pass would recurse into itself or
    /// delete source content.
    #[error("source {source_root} and replica {replica_root} must not contain each other")]
    OverlappingRoots {
        source_root: PathBuf,
        replica_root: PathBuf,
    },

    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The settings file did not exist at the given path.
    #[error("settings file not found at {path}")]
    SettingsNotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
