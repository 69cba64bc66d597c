//! tabsync get / set - point queries against local tables

use std::process::ExitCode;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::table::Cell;

/// `COLUMN=VALUE` row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    #[must_use]
    pub fn cell(&self) -> Cell {
        Cell::from_raw(&self.value)
    }
}

/// Split at the first `=`; the value may contain more.
pub fn parse_filter(raw: &str) -> std::result::Result<Filter, String> {
    match raw.split_once('=') {
        Some((column, value)) if !column.is_empty() => Ok(Filter {
            column: column.to_string(),
            value: value.to_string(),
        }),
        _ => Err(format!("expected COLUMN=VALUE, got {raw:?}")),
    }
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub table: String,

    /// Column to read
    pub column: String,

    /// Row filter
    #[arg(long = "where", value_name = "COLUMN=VALUE", value_parser = parse_filter)]
    pub filter: Filter,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub table: String,

    /// Column to write
    pub column: String,

    /// New value; `true`/`false` in any case is stored as a boolean
    pub value: String,

    /// Row filter
    #[arg(long = "where", value_name = "COLUMN=VALUE", value_parser = parse_filter)]
    pub filter: Filter,
}

#[derive(Serialize)]
struct GetOutput<'a> {
    table: &'a str,
    column: &'a str,
    values: Vec<Cell>,
}

#[derive(Serialize)]
struct SetOutput<'a> {
    table: &'a str,
    column: &'a str,
    value: Cell,
    updated: usize,
}

pub fn run_get(ctx: &AppContext, args: &GetArgs) -> Result<ExitCode> {
    let db = ctx.open_database()?;
    let values = db.select_where(&args.table, &args.column, &args.filter.column, &args.filter.cell())?;

    if ctx.robot {
        emit_json(&robot_ok(GetOutput {
            table: &args.table,
            column: &args.column,
            values,
        }))?;
    } else {
        for value in &values {
            println!("{}", value.as_text());
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_set(ctx: &AppContext, args: &SetArgs) -> Result<ExitCode> {
    let db = ctx.open_database()?;
    let value = Cell::from_raw(&args.value);
    let updated = db.update_where(
        &args.table,
        &args.column,
        &value,
        &args.filter.column,
        &args.filter.cell(),
    )?;

    if ctx.robot {
        emit_json(&robot_ok(SetOutput {
            table: &args.table,
            column: &args.column,
            value,
            updated,
        }))?;
    } else {
        let mut layout = HumanLayout::new();
        layout
            .kv("table", &args.table)
            .kv("column", &args.column)
            .kv("value", &value.as_text())
            .kv("rows updated", &updated.to_string());
        emit_human(layout);
    }
    Ok(ExitCode::SUCCESS)
}
