//! `mirror once`: a single pass, optionally as a dry run.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use mirror_sync::{run_pass, ActionOutcome, PassMode, PassReport, PassSummary, SyncAction};

use super::inputs::InputArgs;

/// Arguments for `mirror once`.
#[derive(Args, Debug)]
pub struct OnceArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Show what would change without touching the replica.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl OnceArgs {
    pub fn run(self) -> Result<()> {
        let resolved = self.inputs.resolve(false)?;
        let mode = if self.dry_run {
            PassMode::DryRun
        } else {
            PassMode::Apply
        };
        let report = run_pass(&resolved.settings.roots, resolved.log.as_ref(), mode);

        if self.json {
            print_json(&report)?;
        } else {
            print_report(&report, &resolved.settings.roots.replica);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    status: &'static str,
    #[serde(flatten)]
    action: &'a SyncAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a PassSummary,
    outcomes: Vec<JsonOutcome<'a>>,
}

fn print_json(report: &PassReport) -> Result<()> {
    let outcomes = report
        .outcomes
        .iter()
        .map(|outcome| JsonOutcome {
            status: match outcome {
                ActionOutcome::Applied(_) => "applied",
                ActionOutcome::Planned(_) => "planned",
                ActionOutcome::Failed { .. } => "failed",
            },
            action: outcome.action(),
            error: match outcome {
                ActionOutcome::Failed { error, .. } => Some(error.to_string()),
                _ => None,
            },
        })
        .collect();
    let payload = JsonReport {
        summary: &report.summary,
        outcomes,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to render pass JSON")?
    );
    Ok(())
}

fn print_report(report: &PassReport, replica: &Path) {
    let s = &report.summary;
    let prefix = if s.dry_run { "[dry-run] " } else { "" };

    if s.is_noop() {
        println!(
            "{prefix}{} '{}' already matches the source",
            "✓".green(),
            replica.display()
        );
        return;
    }

    let mark = if s.failed == 0 {
        "✓".green()
    } else {
        "!".yellow()
    };
    println!(
        "{prefix}{mark} '{}' {} change(s), {} failure(s) in {} ms",
        replica.display(),
        s.changes(),
        s.failed,
        s.duration_ms
    );

    for outcome in &report.outcomes {
        let target = outcome.action().target().display();
        match outcome {
            ActionOutcome::Applied(action) => println!("  {}  {target}", symbol(action)),
            ActionOutcome::Planned(_) => println!("  ~  {target}"),
            ActionOutcome::Failed { error, .. } => {
                println!("  {}  {target}: {error}", "✗".red())
            }
        }
    }
}

fn symbol(action: &SyncAction) -> &'static str {
    match action {
        SyncAction::CreateDir { .. } | SyncAction::CopyFile { .. } => "+",
        SyncAction::OverwriteFile { .. } => "✎",
        SyncAction::DeleteFile { .. } | SyncAction::DeleteDir { .. } => "-",
    }
}
