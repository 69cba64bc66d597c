//! tabsync tables - list configured tables

use std::process::ExitCode;

use clap::Args;
use console::style;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::storage::Database;

#[derive(Args, Debug)]
pub struct TablesArgs {
    /// Also list local tables that have no configuration
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TableStatus {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

/// Status of every configured table, plus unconfigured local ones when
/// `include_local` is set.
pub fn collect(ctx: &AppContext, db: &Database, include_local: bool) -> Result<Vec<TableStatus>> {
    let mut statuses = Vec::new();
    for (table, config) in &ctx.config.tables {
        statuses.push(status(db, table, Some(config.locator.clone()))?);
    }
    if include_local {
        for table in db.list_tables()? {
            if !ctx.config.tables.contains_key(&table) {
                statuses.push(status(db, &table, None)?);
            }
        }
    }
    Ok(statuses)
}

fn status(db: &Database, table: &str, locator: Option<String>) -> Result<TableStatus> {
    let exists = db.table_exists(table)?;
    let (columns, rows) = if exists {
        let snapshot = db.select_all(table)?;
        (Some(snapshot.width()), Some(snapshot.rows.len()))
    } else {
        (None, None)
    };
    Ok(TableStatus {
        table: table.to_string(),
        locator,
        exists,
        columns,
        rows,
    })
}

pub fn run(ctx: &AppContext, args: &TablesArgs) -> Result<ExitCode> {
    let db = ctx.open_database()?;
    let statuses = collect(ctx, &db, args.all)?;

    if ctx.robot {
        emit_json(&robot_ok(&statuses))?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut layout = HumanLayout::new();
    layout.title("Tables");
    if statuses.is_empty() {
        layout.bullet("no tables configured");
    }
    for entry in &statuses {
        layout.section(&entry.table);
        layout.kv(
            "remote",
            entry.locator.as_deref().unwrap_or("(not configured)"),
        );
        match (entry.columns, entry.rows) {
            (Some(columns), Some(rows)) => {
                layout.kv("local", &format!("{columns} columns, {rows} rows"));
            }
            _ => {
                layout.kv("local", &style("missing, run init").yellow().to_string());
            }
        }
        layout.blank();
    }
    emit_human(layout);
    Ok(ExitCode::SUCCESS)
}
