//! # mirror-sync
//!
//! Content-hashed tree indexing and one-way reconciliation.
//!
//! Call [`run_pass`] to index both roots and converge the replica onto the
//! source once. The pieces are usable on their own: [`hasher`] digests a
//! single file, [`indexer`] builds a [`DirectorySnapshot`], and
//! [`reconcile`](mod@reconcile) plans and applies the mutations.

pub mod error;
pub mod hasher;
pub mod indexer;
pub mod log;
pub mod pass;
pub mod paths;
pub mod reconcile;

pub use error::SyncError;
pub use hasher::{digest_file, FileDigest};
pub use indexer::DirectorySnapshot;
pub use log::{LogEntry, LogSink, MemoryLog};
pub use pass::{run_pass, PassMode, PassReport, PassSummary};
pub use paths::PathMapping;
pub use reconcile::{reconcile, ActionOutcome, SyncAction};
