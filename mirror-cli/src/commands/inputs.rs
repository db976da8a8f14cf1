//! Shared input collection: flags, settings file, then prompts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use mirror_core::{
    settings::{self, parse_interval, strip_quotes},
    RawSettings, Settings, SyncInterval,
};
use mirror_daemon::FileLog;
use mirror_sync::LogSink;

use super::prompt::ask;

/// Source/replica/log/interval inputs accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Directory to mirror from.
    #[arg(long, value_name = "DIR")]
    pub source: Option<String>,

    /// Directory kept identical to the source (created if missing).
    #[arg(long, value_name = "DIR")]
    pub replica: Option<String>,

    /// Append-only operator log [default: ~/.mirror/logs/mirror.log].
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Seconds between passes; values below 1 fall back to 30.
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Settings file to read [default: ~/.mirror/config.yaml if present].
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fail instead of asking for missing inputs on stdin.
    #[arg(long)]
    pub no_prompt: bool,
}

/// Validated inputs plus the open operator log.
pub struct Resolved {
    pub settings: Settings,
    pub log: Arc<FileLog>,
}

impl InputArgs {
    fn flag_values(&self) -> RawSettings {
        RawSettings {
            source: self.source.clone(),
            replica: self.replica.clone(),
            log_file: self.log_file.clone(),
            interval_secs: self.interval,
        }
    }

    /// Flags, overlaid on the settings file. No prompting.
    pub fn collect(&self) -> Result<RawSettings> {
        let file = match &self.config {
            Some(path) => settings::load_from(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => match dirs::home_dir() {
                Some(home) => settings::load_or_default_at(&home)
                    .context("failed to load ~/.mirror/config.yaml")?,
                None => RawSettings::default(),
            },
        };
        Ok(self.flag_values().or(file))
    }

    /// Collect, prompt for what is missing, open the log, validate.
    ///
    /// Fatal validation failures are written to the log at Critical severity
    /// before being returned.
    pub fn resolve(&self, wants_interval: bool) -> Result<Resolved> {
        let mut raw = self.collect()?;
        if !self.no_prompt {
            fill_from_prompts(&mut raw, wants_interval)?;
        }

        let log_path = match raw.log_file.as_deref().map(strip_quotes) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => settings::default_log_path().context("cannot choose a default log file")?,
        };
        let log = Arc::new(
            FileLog::open(&log_path)
                .with_context(|| format!("failed to initialize the log at {}", log_path.display()))?,
        );

        let interval = raw
            .interval_secs
            .unwrap_or(SyncInterval::DEFAULT_SECS as i64);
        let validated = settings::validate(
            raw.source.as_deref().unwrap_or_default(),
            raw.replica.as_deref().unwrap_or_default(),
            interval,
        );
        let settings = match validated {
            Ok(settings) => settings,
            Err(err) => {
                log.critical(&err.to_string());
                return Err(err.into());
            }
        };
        for note in &settings.notes {
            log.info(&note.message());
        }

        Ok(Resolved { settings, log })
    }
}

fn fill_from_prompts(raw: &mut RawSettings, wants_interval: bool) -> Result<()> {
    if raw.source.is_none() {
        raw.source = Some(ask("Enter source folder path: ")?);
    }
    if raw.replica.is_none() {
        raw.replica = Some(ask("Enter replica folder path: ")?);
    }
    if raw.log_file.is_none() {
        raw.log_file = Some(ask("Enter log file path (empty for default): ")?);
    }
    if wants_interval && raw.interval_secs.is_none() {
        raw.interval_secs = Some(parse_interval(&ask("Enter the sync interval: ")?));
    }
    Ok(())
}
