//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use std::process::ExitCode;

use console::style;

use crate::app::AppContext;
use crate::cli::Commands;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok, robot_partial};
use crate::error::Result;
use crate::sync::BatchReport;

pub mod pull;
pub mod query;
pub mod tables;
pub mod upload;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<ExitCode> {
    match command {
        Commands::Init(args) => pull::run_init(ctx, args),
        Commands::Refresh(args) => pull::run_refresh(ctx, args),
        Commands::Reset(args) => pull::run_reset(ctx, args),
        Commands::Upload(args) => upload::run(ctx, args),
        Commands::Get(args) => query::run_get(ctx, args),
        Commands::Set(args) => query::run_set(ctx, args),
        Commands::Tables(args) => tables::run(ctx, args),
    }
}

/// Print a batch outcome. Fails the process when any table failed.
pub(crate) fn emit_batch(ctx: &AppContext, title: &str, batch: &BatchReport) -> Result<ExitCode> {
    if ctx.robot {
        if batch.is_success() {
            emit_json(&robot_ok(batch))?;
        } else {
            emit_json(&robot_partial(batch, batch.reports.len(), batch.failures.len()))?;
        }
    } else {
        let mut layout = HumanLayout::new();
        layout.title(title);
        for report in &batch.reports {
            layout.bullet(&format!("{} {}", style("✓").green(), report.summary_line()));
        }
        for failure in &batch.failures {
            layout.bullet(&format!(
                "{} {}: {}",
                style("✗").red(),
                failure.table,
                failure.error
            ));
            layout.kv("  hint", &failure.error.suggestion);
        }
        if batch.reports.is_empty() && batch.failures.is_empty() {
            layout.bullet("no tables configured");
        }
        emit_human(layout);
    }

    Ok(if batch.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
