//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// tabsync - keep SQLite tables and spreadsheets in sync
#[derive(Parser, Debug)]
#[command(name = "tabsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON on stdout and JSON log lines on stderr
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/tabsync/config.toml)
    #[arg(long, global = true, env = "TABSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create local tables from their spreadsheets and pull the rows
    Init(commands::pull::InitArgs),

    /// Replace local rows with the current spreadsheet rows
    Refresh(commands::pull::RefreshArgs),

    /// Drop local tables and initialize them again
    Reset(commands::pull::InitArgs),

    /// Reconcile local rows into the spreadsheets
    Upload(commands::upload::UploadArgs),

    /// Read a column value from rows matching a filter
    Get(commands::query::GetArgs),

    /// Set a column value in rows matching a filter
    Set(commands::query::SetArgs),

    /// List configured tables
    Tables(commands::tables::TablesArgs),
}
