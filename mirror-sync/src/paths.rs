//! Translation of paths between the source and replica roots.
//!
//! Mapping works on path components, not on string prefixes: with a root of
//! `/data/src`, the path `/data/src-backup/a.txt` is *outside* the root and is
//! rejected instead of being rewritten to `<replica>-backup/a.txt`.

use std::path::{Path, PathBuf};

use mirror_core::MirrorRoots;

use crate::error::SyncError;

/// Maps paths under `from` onto the same relative location under `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    from: PathBuf,
    to: PathBuf,
}

impl PathMapping {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Source → replica.
    pub fn to_replica(roots: &MirrorRoots) -> Self {
        Self::new(&roots.source, &roots.replica)
    }

    /// Replica → source.
    pub fn to_source(roots: &MirrorRoots) -> Self {
        Self::new(&roots.replica, &roots.source)
    }

    pub fn reversed(&self) -> Self {
        Self::new(&self.to, &self.from)
    }

    pub fn from_root(&self) -> &Path {
        &self.from
    }

    pub fn to_root(&self) -> &Path {
        &self.to
    }

    /// Translate `path`. The root itself maps to the other root.
    pub fn map(&self, path: &Path) -> Result<PathBuf, SyncError> {
        let rest = path
            .strip_prefix(&self.from)
            .map_err(|_| SyncError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.from.clone(),
            })?;
        if rest.as_os_str().is_empty() {
            Ok(self.to.clone())
        } else {
            Ok(self.to.join(rest))
        }
    }
}
