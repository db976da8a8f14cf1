//! Single-pass pipeline shared by the CLI and the daemon loop.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mirror_core::MirrorRoots;

use crate::indexer::DirectorySnapshot;
use crate::log::LogSink;
use crate::reconcile::{reconcile, ActionOutcome, SyncAction};

/// Whether a pass mutates the replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassMode {
    #[default]
    Apply,
    /// Plan only: log what would change, touch nothing.
    DryRun,
}

/// Counters for one pass. In dry-run mode the per-kind counters describe
/// planned rather than performed mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub dry_run: bool,
    pub source_directories: usize,
    pub source_files: usize,
    pub created_directories: usize,
    pub created_files: usize,
    pub overwritten_files: usize,
    pub deleted_files: usize,
    pub deleted_directories: usize,
    pub failed: usize,
}

impl PassSummary {
    /// Mutations performed (or planned), excluding failures.
    pub fn changes(&self) -> usize {
        self.created_directories
            + self.created_files
            + self.overwritten_files
            + self.deleted_files
            + self.deleted_directories
    }

    /// `true` when the replica already matched the source.
    pub fn is_noop(&self) -> bool {
        self.changes() == 0 && self.failed == 0
    }

    fn record(&mut self, outcome: &ActionOutcome) {
        let action = match outcome {
            ActionOutcome::Failed { .. } => {
                self.failed += 1;
                return;
            }
            ActionOutcome::Applied(action) | ActionOutcome::Planned(action) => action,
        };
        match action {
            SyncAction::CreateDir { .. } => self.created_directories += 1,
            SyncAction::CopyFile { .. } => self.created_files += 1,
            SyncAction::OverwriteFile { .. } => self.overwritten_files += 1,
            SyncAction::DeleteFile { .. } => self.deleted_files += 1,
            SyncAction::DeleteDir { .. } => self.deleted_directories += 1,
        }
    }
}

/// Result of [`run_pass`].
#[derive(Debug)]
pub struct PassReport {
    pub summary: PassSummary,
    pub outcomes: Vec<ActionOutcome>,
}

/// Index the source, index the replica, reconcile.
///
/// There is no pass-level failure: per-item problems are logged through
/// `log` and counted in [`PassSummary::failed`].
pub fn run_pass(roots: &MirrorRoots, log: &dyn LogSink, mode: PassMode) -> PassReport {
    let started_at = Utc::now();
    let clock = Instant::now();

    let source = DirectorySnapshot::build(&roots.source, log);
    let replica = DirectorySnapshot::build(&roots.replica, log);
    tracing::debug!(
        "indexed source ({} dirs, {} files) and replica ({} dirs, {} files)",
        source.directories.len(),
        source.files.len(),
        replica.directories.len(),
        replica.files.len()
    );

    let outcomes = reconcile(&source, &replica, log, mode == PassMode::DryRun);

    let mut summary = PassSummary {
        started_at,
        dry_run: mode == PassMode::DryRun,
        source_directories: source.directories.len(),
        source_files: source.files.len(),
        ..PassSummary::default()
    };
    for outcome in &outcomes {
        summary.record(outcome);
    }
    summary.duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

    PassReport { summary, outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLog;
    use std::fs;
    use tempfile::TempDir;

    fn roots(tmp: &TempDir) -> MirrorRoots {
        let roots = MirrorRoots::new(tmp.path().join("src"), tmp.path().join("replica"));
        fs::create_dir_all(&roots.source).unwrap();
        fs::create_dir_all(&roots.replica).unwrap();
        roots
    }

    #[test]
    fn summary_counts_each_kind() {
        let tmp = TempDir::new().unwrap();
        let roots = roots(&tmp);
        fs::create_dir_all(roots.source.join("d")).unwrap();
        fs::write(roots.source.join("d/new.txt"), "n").unwrap();
        fs::write(roots.source.join("same.txt"), "s").unwrap();
        fs::write(roots.replica.join("same.txt"), "s").unwrap();
        fs::write(roots.source.join("edit.txt"), "v2").unwrap();
        fs::write(roots.replica.join("edit.txt"), "v1").unwrap();
        fs::create_dir_all(roots.replica.join("old")).unwrap();
        fs::write(roots.replica.join("old/x.txt"), "x").unwrap();

        let log = MemoryLog::new();
        let report = run_pass(&roots, &log, PassMode::Apply);
        let s = &report.summary;
        assert_eq!(s.source_directories, 1);
        assert_eq!(s.source_files, 3);
        assert_eq!(s.created_directories, 1);
        assert_eq!(s.created_files, 1);
        assert_eq!(s.overwritten_files, 1);
        assert_eq!(s.deleted_files, 1);
        assert_eq!(s.deleted_directories, 1);
        assert_eq!(s.failed, 0);
        assert_eq!(s.changes(), 5);
        assert!(!s.dry_run);
    }

    #[test]
    fn second_pass_is_noop() {
        let tmp = TempDir::new().unwrap();
        let roots = roots(&tmp);
        fs::write(roots.source.join("a.txt"), "hi").unwrap();

        let log = MemoryLog::new();
        run_pass(&roots, &log, PassMode::Apply);
        log.clear();
        let second = run_pass(&roots, &log, PassMode::Apply);
        assert!(second.summary.is_noop());
        assert!(second.outcomes.is_empty());
        assert!(log.entries().is_empty(), "no-op pass must not log");
    }

    #[test]
    fn dry_run_counts_planned_changes() {
        let tmp = TempDir::new().unwrap();
        let roots = roots(&tmp);
        fs::write(roots.source.join("a.txt"), "hi").unwrap();

        let log = MemoryLog::new();
        let report = run_pass(&roots, &log, PassMode::DryRun);
        assert!(report.summary.dry_run);
        assert_eq!(report.summary.created_files, 1);
        assert!(!roots.replica.join("a.txt").exists());
    }

    #[test]
    fn summary_serializes_to_json() {
        let summary = PassSummary {
            created_files: 2,
            ..PassSummary::default()
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["created_files"], 2);
        assert_eq!(value["dry_run"], false);
        assert!(value["started_at"].is_string());
    }
}
