//! Scheduled mirror loop, operator log file, and log rotation.

mod error;
pub mod file_log;
pub mod log_rotation;
mod runtime;

pub use error::DaemonError;
pub use file_log::FileLog;
pub use runtime::{init_tracing, start_blocking, LoopState, SyncLoop};
