//! Four-phase reconciliation of a replica snapshot onto a source snapshot.
//!
//! ## Phases
//!
//! 1. Create the replica root if it vanished, then every source directory
//!    missing from the replica. A non-directory in the way is deleted first.
//! 2. Copy files missing from the replica; overwrite files whose digest differs.
//! 3. Delete replica files, symlinks and special files with no counterpart
//!    regular file in the source.
//! 4. Delete replica directories with no counterpart directory in the source,
//!    deepest first, without recursing.
//!
//! Directory creation precedes file copies so targets have a parent; file
//! deletion precedes directory deletion so the non-recursive delete finds the
//! directory empty. Every mutation targets a path under the replica root.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{io_err, SyncError};
use crate::indexer::DirectorySnapshot;
use crate::log::LogSink;
use crate::paths::PathMapping;

// ---------------------------------------------------------------------------
// Actions and outcomes
// ---------------------------------------------------------------------------

/// One replica mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncAction {
    /// Create a replica directory (and any missing ancestors).
    CreateDir { path: PathBuf },
    /// Copy a source file to a replica path that does not exist yet.
    CopyFile { from: PathBuf, to: PathBuf },
    /// Replace a replica file whose content differs from the source.
    OverwriteFile { from: PathBuf, to: PathBuf },
    /// Remove a replica file with no source counterpart.
    DeleteFile { path: PathBuf },
    /// Remove an empty replica directory with no source counterpart.
    DeleteDir { path: PathBuf },
}

impl SyncAction {
    /// The replica path this action mutates.
    pub fn target(&self) -> &Path {
        match self {
            SyncAction::CreateDir { path }
            | SyncAction::DeleteFile { path }
            | SyncAction::DeleteDir { path } => path,
            SyncAction::CopyFile { to, .. } | SyncAction::OverwriteFile { to, .. } => to,
        }
    }

    fn done_message(&self) -> String {
        let target = self.target().display();
        match self {
            SyncAction::CreateDir { .. } => format!("Created directory {target}"),
            SyncAction::CopyFile { .. } => format!("Created file {target}"),
            SyncAction::OverwriteFile { .. } => format!("Overwritten file {target}"),
            SyncAction::DeleteFile { .. } => format!("Deleted file {target}"),
            SyncAction::DeleteDir { .. } => format!("Deleted directory {target}"),
        }
    }

    fn planned_message(&self) -> String {
        let target = self.target().display();
        match self {
            SyncAction::CreateDir { .. } => format!("[dry-run] would create directory {target}"),
            SyncAction::CopyFile { .. } => format!("[dry-run] would create file {target}"),
            SyncAction::OverwriteFile { .. } => format!("[dry-run] would overwrite file {target}"),
            SyncAction::DeleteFile { .. } => format!("[dry-run] would delete file {target}"),
            SyncAction::DeleteDir { .. } => format!("[dry-run] would delete directory {target}"),
        }
    }

    fn failed_message(&self, err: &SyncError) -> String {
        let verb = match self {
            SyncAction::CreateDir { .. } => "creating directory",
            SyncAction::CopyFile { .. } | SyncAction::OverwriteFile { .. } => "copying file",
            SyncAction::DeleteFile { .. } => "deleting file",
            SyncAction::DeleteDir { .. } => "deleting directory",
        };
        format!(
            "Something went wrong {verb} {}: {err}",
            self.target().display()
        )
    }
}

/// What happened to a single action.
#[derive(Debug)]
pub enum ActionOutcome {
    /// The mutation was performed.
    Applied(SyncAction),
    /// Dry run: the mutation would have been performed.
    Planned(SyncAction),
    /// The mutation failed; it will be re-derived on the next pass.
    Failed { action: SyncAction, error: SyncError },
}

impl ActionOutcome {
    pub fn action(&self) -> &SyncAction {
        match self {
            ActionOutcome::Applied(action) | ActionOutcome::Planned(action) => action,
            ActionOutcome::Failed { action, .. } => action,
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Derive the ordered list of mutations that converge `replica` onto `source`.
///
/// Existence checks consult the filesystem at call time; digests come from the
/// snapshots. Nothing is written. Mirrored paths are never resolved through a
/// symlink on either side: a path below a link counts as missing.
pub fn plan(
    source: &DirectorySnapshot,
    replica: &DirectorySnapshot,
    log: &dyn LogSink,
) -> Vec<SyncAction> {
    let to_replica = PathMapping::new(&source.root, &replica.root);
    let to_source = to_replica.reversed();
    let mut actions = Vec::new();
    // Entries already scheduled for removal by a type conflict.
    let mut displaced = BTreeSet::new();

    // Phase 1: directory creation, starting with the replica root itself.
    if !replica.root.is_dir() {
        actions.push(SyncAction::CreateDir {
            path: replica.root.clone(),
        });
    }
    for dir in &source.directories {
        let Some(target) = map_or_log(&to_replica, dir, log) else {
            continue;
        };
        match lookup(&replica.root, &target) {
            Lookup::Found(meta) if meta.is_dir() => continue,
            Lookup::Found(_) => {
                // A file, symlink or special file sits where a directory belongs.
                actions.push(SyncAction::DeleteFile {
                    path: target.clone(),
                });
                displaced.insert(target.clone());
            }
            Lookup::Missing | Lookup::Unknown => {}
        }
        actions.push(SyncAction::CreateDir { path: target });
    }

    // Phase 2: file creation / update.
    for (path, digest) in &source.files {
        let Some(target) = map_or_log(&to_replica, path, log) else {
            continue;
        };
        match lookup(&replica.root, &target) {
            Lookup::Missing | Lookup::Unknown => actions.push(SyncAction::CopyFile {
                from: path.clone(),
                to: target,
            }),
            // Emptied and removed by phases 3 and 4; copied on the next pass.
            Lookup::Found(meta) if meta.is_dir() => {}
            // Also covers a replica file that could not be digested, and a
            // symlink or special file, which the rename replaces in place.
            Lookup::Found(_) if replica.digest_of(&target) != Some(digest) => {
                actions.push(SyncAction::OverwriteFile {
                    from: path.clone(),
                    to: target,
                })
            }
            Lookup::Found(_) => {}
        }
    }

    // Phase 3: file deletion, including replica symlinks and special files.
    // A foreign entry whose counterpart is a regular file was overwritten in
    // phase 2.
    for path in replica.files.keys().chain(&replica.foreign) {
        if displaced.contains(path) {
            continue;
        }
        let Some(counterpart) = map_or_log(&to_source, path, log) else {
            continue;
        };
        let keep = match lookup(&source.root, &counterpart) {
            Lookup::Found(meta) => meta.is_file(),
            Lookup::Missing => false,
            Lookup::Unknown => true,
        };
        if !keep {
            actions.push(SyncAction::DeleteFile { path: path.clone() });
        }
    }

    // Phase 4: directory deletion, children before parents.
    for dir in replica.directories.iter().rev() {
        let Some(counterpart) = map_or_log(&to_source, dir, log) else {
            continue;
        };
        let keep = match lookup(&source.root, &counterpart) {
            Lookup::Found(meta) => meta.is_dir(),
            Lookup::Missing => false,
            Lookup::Unknown => true,
        };
        if !keep {
            actions.push(SyncAction::DeleteDir { path: dir.clone() });
        }
    }

    actions
}

fn map_or_log(mapping: &PathMapping, path: &Path, log: &dyn LogSink) -> Option<PathBuf> {
    match mapping.map(path) {
        Ok(mapped) => Some(mapped),
        Err(err) => {
            log.error(&format!("Cannot map path: {err}"));
            None
        }
    }
}

/// What sits at a path under a root, seen without following symlinks.
enum Lookup {
    /// The entry's own metadata; a symlink reports as a symlink.
    Found(fs::Metadata),
    /// Nothing there, or an ancestor below `root` is not a real directory.
    Missing,
    /// The entry could not be inspected (e.g. an unreadable parent).
    Unknown,
}

/// Inspect `path` one component at a time from `root`, so that no
/// intermediate symlink is ever resolved.
fn lookup(root: &Path, path: &Path) -> Lookup {
    let Ok(relative) = path.strip_prefix(root) else {
        return Lookup::Unknown;
    };
    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    if components.peek().is_none() {
        return stat(&current);
    }
    while let Some(component) = components.next() {
        current.push(component);
        let last = components.peek().is_none();
        match stat(&current) {
            Lookup::Found(meta) if !last && !meta.is_dir() => return Lookup::Missing,
            Lookup::Found(_) if !last => {}
            other => return other,
        }
    }
    Lookup::Missing
}

fn stat(path: &Path) -> Lookup {
    match fs::symlink_metadata(path) {
        Ok(meta) => Lookup::Found(meta),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Lookup::Missing,
        Err(_) => Lookup::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Applying
// ---------------------------------------------------------------------------

/// Perform a single mutation.
pub fn apply(action: &SyncAction) -> Result<(), SyncError> {
    match action {
        SyncAction::CreateDir { path } => fs::create_dir_all(path).map_err(|e| io_err(path, e)),
        SyncAction::CopyFile { from, to } => copy_new(from, to),
        SyncAction::OverwriteFile { from, to } => copy_replace(from, to),
        SyncAction::DeleteFile { path } => fs::remove_file(path).map_err(|e| io_err(path, e)),
        SyncAction::DeleteDir { path } => fs::remove_dir(path).map_err(|e| io_err(path, e)),
    }
}

/// Copy `from` to `to`, refusing to clobber anything already at `to`.
fn copy_new(from: &Path, to: &Path) -> Result<(), SyncError> {
    let mut reader = File::open(from).map_err(|e| io_err(from, e))?;
    let permissions = reader
        .metadata()
        .map_err(|e| io_err(from, e))?
        .permissions();
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(|e| io_err(to, e))?;

    let copied = io::copy(&mut reader, &mut writer)
        .and_then(|_| writer.sync_all())
        .map_err(|e| io_err(to, e));
    drop(writer);
    if let Err(err) = copied {
        let _ = fs::remove_file(to);
        return Err(err);
    }
    fs::set_permissions(to, permissions).map_err(|e| io_err(to, e))
}

/// Copy `from` into a fresh hidden temp file beside `to`, then rename it over
/// `to`. The temp name is random and opened exclusively, so it never collides
/// with a mirrored file. On failure the previous replica content stays in
/// place and the temp file is removed.
fn copy_replace(from: &Path, to: &Path) -> Result<(), SyncError> {
    let dir = to.parent().unwrap_or_else(|| Path::new("."));
    let mut reader = File::open(from).map_err(|e| io_err(from, e))?;
    let permissions = reader
        .metadata()
        .map_err(|e| io_err(from, e))?
        .permissions();
    let mut tmp = tempfile::Builder::new()
        .prefix(".mirror-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| io_err(dir, e))?;

    io::copy(&mut reader, tmp.as_file_mut())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| io_err(tmp.path(), e))?;
    fs::set_permissions(tmp.path(), permissions).map_err(|e| io_err(tmp.path(), e))?;
    tmp.persist(to).map_err(|e| io_err(to, e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Plan and apply (or, with `dry_run`, only report) the mutations that make
/// `replica` match `source`.
///
/// Failures are logged and recorded; they never stop the remaining actions.
pub fn reconcile(
    source: &DirectorySnapshot,
    replica: &DirectorySnapshot,
    log: &dyn LogSink,
    dry_run: bool,
) -> Vec<ActionOutcome> {
    plan(source, replica, log)
        .into_iter()
        .map(|action| {
            if dry_run {
                log.info(&action.planned_message());
                return ActionOutcome::Planned(action);
            }
            match apply(&action) {
                Ok(()) => {
                    log.info(&action.done_message());
                    ActionOutcome::Applied(action)
                }
                Err(error) => {
                    log.error(&action.failed_message(&error));
                    ActionOutcome::Failed { action, error }
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
