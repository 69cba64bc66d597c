//! tabsync init / refresh / reset - pull spreadsheets into local tables

use std::process::ExitCode;

use clap::Args;

use crate::app::AppContext;
use crate::error::Result;

use super::emit_batch;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Tables to process (default: every configured table)
    pub tables: Vec<String>,

    /// Name this table's columns by position instead of header text
    #[arg(long, value_name = "TABLE")]
    pub numeric: Option<String>,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Tables to process (default: every configured table)
    pub tables: Vec<String>,
}

pub fn run_init(ctx: &AppContext, args: &InitArgs) -> Result<ExitCode> {
    let engine = ctx.engine()?;
    let batch = engine.init(&args.tables, args.numeric.as_deref());
    emit_batch(ctx, "Init", &batch)
}

pub fn run_refresh(ctx: &AppContext, args: &RefreshArgs) -> Result<ExitCode> {
    let engine = ctx.engine()?;
    let batch = engine.refresh(&args.tables);
    emit_batch(ctx, "Refresh", &batch)
}

pub fn run_reset(ctx: &AppContext, args: &InitArgs) -> Result<ExitCode> {
    let engine = ctx.engine()?;
    let batch = engine.reset(&args.tables, args.numeric.as_deref());
    emit_batch(ctx, "Reset", &batch)
}
