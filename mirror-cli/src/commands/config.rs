//! `mirror config`: persist inputs for later runs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use mirror_core::settings;

use super::inputs::InputArgs;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the given inputs (merged over any existing settings) to a file.
    Save(SaveArgs),
    /// Print the default settings file location.
    Path,
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Destination [default: ~/.mirror/config.yaml].
    #[arg(long, value_name = "FILE")]
    pub path: Option<PathBuf>,

    #[command(flatten)]
    pub inputs: InputArgs,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Save(args) => {
            let path = match args.path {
                Some(path) => path,
                None => settings::settings_path().context("could not determine home directory")?,
            };
            let raw = args.inputs.collect()?;
            settings::save_to(&path, &raw)
                .with_context(|| format!("failed to save settings to {}", path.display()))?;
            println!("saved settings: {}", path.display());
        }
        ConfigCommand::Path => {
            let path = settings::settings_path().context("could not determine home directory")?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
