use std::sync::Arc;

use tokio::sync::broadcast;

use mirror_core::{MirrorRoots, SyncInterval};
use mirror_sync::{run_pass, LogSink, PassMode, PassSummary};

use crate::error::{io_err, DaemonError};
use crate::file_log::FileLog;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting out the interval.
    Idle,
    /// Rebuilding both snapshots and reconciling.
    Syncing,
}

/// Periodic one-way mirror of `roots.source` into `roots.replica`.
///
/// Passes never overlap: each runs to completion on a blocking worker before
/// the interval starts counting. No state carries over between passes.
///
/// Only one loop may target a given replica root; two writers race on
/// create/delete.
pub struct SyncLoop {
    roots: MirrorRoots,
    interval: SyncInterval,
    log: Arc<dyn LogSink>,
    file_log: Option<Arc<FileLog>>,
    max_passes: Option<u64>,
}

impl SyncLoop {
    pub fn new(roots: MirrorRoots, interval: SyncInterval, log: Arc<dyn LogSink>) -> Self {
        Self {
            roots,
            interval,
            log,
            file_log: None,
            max_passes: None,
        }
    }

    /// Log through `file_log`, rotating it before every pass.
    pub fn with_file_log(roots: MirrorRoots, interval: SyncInterval, file_log: Arc<FileLog>) -> Self {
        let mut this = Self::new(roots, interval, file_log.clone());
        this.file_log = Some(file_log);
        this
    }

    /// Stop after `passes` passes instead of running until shutdown.
    pub fn max_passes(mut self, passes: Option<u64>) -> Self {
        self.max_passes = passes;
        self
    }

    /// Run until `shutdown` fires (or every sender is dropped), or until the
    /// pass limit is reached. The first pass starts immediately.
    ///
    /// A shutdown request never interrupts a pass in flight. Returns the
    /// number of completed passes.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<u64, DaemonError> {
        self.log.info(&format!(
            "Synchronizing {} into {} every {} seconds",
            self.roots.source.display(),
            self.roots.replica.display(),
            self.interval.as_secs()
        ));

        let mut passes = 0u64;
        let mut state = LoopState::Syncing;
        loop {
            tracing::debug!(?state, passes, "sync loop state");
            match state {
                LoopState::Syncing => {
                    let summary = self.pass().await?;
                    passes += 1;
                    tracing::info!(
                        pass = passes,
                        changes = summary.changes(),
                        failed = summary.failed,
                        source_files = summary.source_files,
                        duration_ms = summary.duration_ms,
                        "pass complete"
                    );
                    if self.max_passes.is_some_and(|max| passes >= max) {
                        break;
                    }
                    state = LoopState::Idle;
                }
                LoopState::Idle => {
                    tokio::select! {
                        _ = shutdown.recv() => {
                            tracing::info!("shutdown requested, stopping sync loop");
                            break;
                        }
                        _ = tokio::time::sleep(self.interval.as_duration()) => {
                            state = LoopState::Syncing;
                        }
                    }
                }
            }
        }

        self.log
            .info(&format!("Synchronization stopped after {passes} pass(es)"));
        Ok(passes)
    }

    async fn pass(&self) -> Result<PassSummary, DaemonError> {
        let roots = self.roots.clone();
        let log = self.log.clone();
        let file_log = self.file_log.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(file_log) = file_log {
                file_log.rotate_if_needed();
            }
            run_pass(&roots, log.as_ref(), PassMode::Apply).summary
        })
        .await
        .map_err(|err| DaemonError::PassTask(err.to_string()))
    }
}

/// Run `sync_loop` on a fresh tokio runtime, blocking the current thread.
///
/// Ctrl-C requests a graceful stop: the pass in flight finishes first.
pub fn start_blocking(sync_loop: SyncLoop) -> Result<u64, DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(4);
        let signal_handle = {
            let shutdown = shutdown_tx.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, finishing current pass");
                        let _ = shutdown.send(());
                    }
                    Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
                }
            })
        };

        let result = sync_loop.run(shutdown_rx).await;
        signal_handle.abort();
        drop(shutdown_tx);
        result
    })
}

/// Install the console subscriber on stderr. `RUST_LOG` overrides the
/// `info` default.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
