//! `mirror run`: mirror on a fixed interval until interrupted.

use anyhow::{Context, Result};
use clap::Args;

use mirror_daemon::{start_blocking, SyncLoop};

use super::inputs::InputArgs;

/// Arguments for `mirror run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Exit after this many passes instead of running until Ctrl-C.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub passes: Option<u64>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let resolved = self.inputs.resolve(true)?;
        let sync_loop = SyncLoop::with_file_log(
            resolved.settings.roots,
            resolved.settings.interval,
            resolved.log,
        )
        .max_passes(self.passes);

        start_blocking(sync_loop).context("sync loop exited with error")?;
        Ok(())
    }
}
