//! Tree indexing: directory enumeration and per-file digests.
//!
//! Traversal uses an explicit work stack rather than recursion, visiting
//! directories depth-first in pre-order with siblings sorted by name.

use std::collections::BTreeMap;
use std::fs::{self, DirEntry};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::hasher::{digest_file, FileDigest};
use crate::log::LogSink;

/// Directories and file digests found under one root at one point in time.
///
/// Built fresh for every pass and dropped once the pass is reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub root: PathBuf,
    /// Every directory strictly under `root`, in traversal order.
    pub directories: Vec<PathBuf>,
    /// Every readable regular file under `root`, keyed by absolute path.
    pub files: BTreeMap<PathBuf, FileDigest>,
    /// Symlinks and special files under `root`. Never followed or digested;
    /// on the replica side they are always extraneous.
    pub foreign: Vec<PathBuf>,
}

impl DirectorySnapshot {
    /// Index `root` in a single traversal.
    ///
    /// A missing root yields an empty snapshot. Unreadable directories and
    /// files are reported through `log` and left out.
    pub fn build(root: &Path, log: &dyn LogSink) -> Self {
        let mut directories = Vec::new();
        let mut files = BTreeMap::new();
        let mut foreign = Vec::new();
        walk(root, log, |dir, entries| {
            if dir != root {
                directories.push(dir.to_path_buf());
            }
            digest_entries(entries, &mut files, log);
            foreign.extend(
                entries
                    .iter()
                    .filter(|entry| entry.kind == EntryKind::Foreign)
                    .map(|entry| entry.path.clone()),
            );
        });
        Self {
            root: root.to_path_buf(),
            directories,
            files,
            foreign,
        }
    }

    pub fn digest_of(&self, path: &Path) -> Option<&FileDigest> {
        self.files.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty() && self.foreign.is_empty()
    }
}

/// Every directory strictly under `root`, depth-first.
///
/// Returns an empty list if `root` does not exist.
pub fn list_directories_recursive(root: &Path, log: &dyn LogSink) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, log, |dir, _| {
        if dir != root {
            out.push(dir.to_path_buf());
        }
    });
    out
}

/// Digests of the regular files directly inside `dir` (non-recursive).
///
/// Files that cannot be hashed are logged and omitted, never added with a
/// placeholder.
pub fn index_files(dir: &Path, log: &dyn LogSink) -> BTreeMap<PathBuf, FileDigest> {
    let mut files = BTreeMap::new();
    match read_classified(dir, log) {
        Ok(entries) => digest_entries(&entries, &mut files, log),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => log.error(&format!("Cannot list directory {}: {err}", dir.display())),
    }
    files
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
    /// Symlink, socket, FIFO or device.
    Foreign,
}

struct Entry {
    path: PathBuf,
    kind: EntryKind,
}

/// Visit `root` and every directory below it, handing each directory's
/// classified entries to `visit`.
///
/// A directory that cannot be listed is still visited (with no entries) so
/// that it shows up in the snapshot; only its contents are skipped.
fn walk(root: &Path, log: &dyn LogSink, mut visit: impl FnMut(&Path, &[Entry])) {
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match read_classified(&dir, log) {
            Ok(entries) => entries,
            Err(err) if dir == root && err.kind() == ErrorKind::NotFound => return,
            Err(err) => {
                log.error(&format!("Cannot list directory {}: {err}", dir.display()));
                Vec::new()
            }
        };

        visit(&dir, &entries);

        let children = entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Dir)
            .map(|entry| entry.path.clone());
        // Reverse so the first sibling is popped next.
        let mark = stack.len();
        stack.extend(children);
        stack[mark..].reverse();
    }
}

/// List `dir` sorted by name, classifying each entry once without following
/// symlinks. Entries whose type cannot be read are logged and dropped.
fn read_classified(dir: &Path, log: &dyn LogSink) -> io::Result<Vec<Entry>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(DirEntry::file_name);
    Ok(entries
        .into_iter()
        .filter_map(|entry| classify(&entry, log))
        .collect())
}

fn classify(entry: &DirEntry, log: &dyn LogSink) -> Option<Entry> {
    let path = entry.path();
    let file_type = match entry.file_type() {
        Ok(t) => t,
        Err(err) => {
            log.error(&format!("Cannot inspect {}: {err}", path.display()));
            return None;
        }
    };
    let kind = if file_type.is_symlink() {
        tracing::debug!("not following symlink: {}", path.display());
        EntryKind::Foreign
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Foreign
    };
    Some(Entry { path, kind })
}

fn digest_entries(entries: &[Entry], files: &mut BTreeMap<PathBuf, FileDigest>, log: &dyn LogSink) {
    for entry in entries.iter().filter(|entry| entry.kind == EntryKind::File) {
        match digest_file(&entry.path) {
            Ok(digest) => {
                files.insert(entry.path.clone(), digest);
            }
            Err(err) => log.error(&format!("Cannot read file: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLog;
    use mirror_core::Severity;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir_all(root.join("a/deep/deeper")).unwrap();
        fs::create_dir_all(root.join("c")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("a/one.txt"), "one").unwrap();
        fs::write(root.join("a/deep/deeper/two.txt"), "two").unwrap();
        fs::write(root.join("b/inner/three.txt"), "three").unwrap();
        tmp
    }

    #[test]
    fn directories_are_listed_depth_first_in_name_order() {
        let tmp = tree();
        let log = MemoryLog::new();
        let dirs = list_directories_recursive(tmp.path(), &log);
        let rel: Vec<_> = dirs
            .iter()
            .map(|d| d.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a"),
                PathBuf::from("a/deep"),
                PathBuf::from("a/deep/deeper"),
                PathBuf::from("b"),
                PathBuf::from("b/inner"),
                PathBuf::from("c"),
            ]
        );
        assert!(log.entries().is_empty());
    }

    #[test]
    fn missing_root_lists_nothing_without_logging() {
        let tmp = TempDir::new().unwrap();
        let log = MemoryLog::new();
        let missing = tmp.path().join("vanished");
        assert!(list_directories_recursive(&missing, &log).is_empty());
        assert!(index_files(&missing, &log).is_empty());
        assert!(DirectorySnapshot::build(&missing, &log).is_empty());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn index_files_is_not_recursive() {
        let tmp = tree();
        let log = MemoryLog::new();
        let files = index_files(&tmp.path().join("a"), &log);
        assert_eq!(files.len(), 1);
        assert_eq!(
            files.get(&tmp.path().join("a/one.txt")),
            Some(&FileDigest::of_bytes(b"one"))
        );
    }

    #[test]
    fn snapshot_merges_every_directory() {
        let tmp = tree();
        let log = MemoryLog::new();
        let snapshot = DirectorySnapshot::build(tmp.path(), &log);
        assert_eq!(snapshot.directories.len(), 6);
        assert_eq!(snapshot.files.len(), 4);
        assert_eq!(
            snapshot.digest_of(&tmp.path().join("b/inner/three.txt")),
            Some(&FileDigest::of_bytes(b"three"))
        );
        assert!(!snapshot.directories.contains(&tmp.path().to_path_buf()));
    }

    #[test]
    fn snapshot_matches_list_plus_index() {
        let tmp = tree();
        let log = MemoryLog::new();
        let snapshot = DirectorySnapshot::build(tmp.path(), &log);

        let dirs = list_directories_recursive(tmp.path(), &log);
        let mut files = index_files(tmp.path(), &log);
        for dir in &dirs {
            files.extend(index_files(dir, &log));
        }
        assert_eq!(snapshot.directories, dirs);
        assert_eq!(snapshot.files, files);
    }

    #[test]
    #[cfg(unix)]
    fn symlinks_are_recorded_but_not_followed() {
        let tmp = tree();
        std::os::unix::fs::symlink(tmp.path().join("a"), tmp.path().join("link-dir")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("top.txt"), tmp.path().join("link.txt"))
            .unwrap();
        let log = MemoryLog::new();
        let snapshot = DirectorySnapshot::build(tmp.path(), &log);
        assert_eq!(snapshot.directories.len(), 6);
        assert_eq!(snapshot.files.len(), 4);
        assert!(!snapshot.files.contains_key(&tmp.path().join("link.txt")));
        assert_eq!(
            snapshot.foreign,
            vec![tmp.path().join("link-dir"), tmp.path().join("link.txt")]
        );
        assert!(log.entries().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn unreadable_file_is_logged_and_omitted() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tree();
        let locked = tmp.path().join("locked.txt");
        fs::write(&locked, "secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits; nothing to observe in that case.
        if fs::File::open(&locked).is_ok() {
            return;
        }

        let log = MemoryLog::new();
        let snapshot = DirectorySnapshot::build(tmp.path(), &log);
        assert!(!snapshot.files.contains_key(&locked));
        assert_eq!(snapshot.files.len(), 4);
        assert_eq!(log.count_severity(Severity::Error), 1);
        assert!(log.contains("Cannot read file"));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn unreadable_directory_is_kept_but_not_entered() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tree();
        let locked = tmp.path().join("b");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits; nothing to observe in that case.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let log = MemoryLog::new();
        let snapshot = DirectorySnapshot::build(tmp.path(), &log);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(snapshot.directories.contains(&locked));
        assert!(!snapshot.directories.contains(&locked.join("inner")));
        assert!(!snapshot
            .files
            .contains_key(&tmp.path().join("b/inner/three.txt")));
        assert_eq!(snapshot.files.len(), 3);
        assert_eq!(log.count_severity(Severity::Error), 1);
        assert!(log.contains("Cannot list directory"));
    }
}
