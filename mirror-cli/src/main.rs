//! Mirror: periodic one-way directory mirroring.
//!
//! # Usage
//!
//! ```text
//! mirror run  [--source <dir>] [--replica <dir>] [--log-file <file>] [--interval <secs>] [--passes <n>]
//! mirror once [--source <dir>] [--replica <dir>] [--log-file <file>] [--dry-run] [--json]
//! mirror config save [--path <file>] [inputs…]
//! mirror config path
//! ```
//!
//! Inputs not given as flags are read from `--config` (or
//! `~/.mirror/config.yaml`), then asked for interactively unless
//! `--no-prompt` is set.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, once::OnceArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mirror",
    version,
    about = "Keep a replica directory identical to a source directory",
    long_about = "Keep a replica directory identical to a source directory.\n\n\
                  Every pass hashes both trees and creates, overwrites or deletes replica \
                  entries until they match the source. Never point two mirror processes \
                  at the same replica directory.",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror on a fixed interval until interrupted.
    Run(RunArgs),

    /// Run a single pass and exit.
    Once(OnceArgs),

    /// Manage the saved settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    mirror_daemon::init_tracing();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Once(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
