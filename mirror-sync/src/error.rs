//! Error types for mirror-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Per-item failures raised while hashing, mapping or mutating entries.
///
/// None of these abort a pass: callers log them and move on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path could not be translated because it does not live under the root.
    #[error("{path} is not under root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
