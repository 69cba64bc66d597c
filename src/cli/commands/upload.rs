//! tabsync upload - reconcile local rows into spreadsheets

use std::process::ExitCode;

use clap::Args;

use crate::app::AppContext;
use crate::error::Result;
use crate::sync::{ColumnOwnership, ColumnRef, PushRequest};

use super::emit_batch;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Tables to upload (default: every configured table)
    pub tables: Vec<String>,

    /// Remote-authoritative column, by name or `#position` (repeatable).
    /// Overrides the configured list for every named table.
    #[arg(long, value_name = "COLUMN")]
    pub owned: Vec<ColumnRef>,

    /// Treat every column as bot-authoritative, ignoring configuration
    #[arg(long, conflicts_with = "owned")]
    pub bot_only: bool,
}

impl UploadArgs {
    fn ownership(&self) -> Option<ColumnOwnership> {
        if self.bot_only {
            Some(ColumnOwnership::bot_only())
        } else if self.owned.is_empty() {
            None
        } else {
            Some(ColumnOwnership::remote(self.owned.iter().cloned()))
        }
    }

    #[must_use]
    pub fn requests(&self, configured: impl IntoIterator<Item = String>) -> Vec<PushRequest> {
        let tables: Vec<String> = if self.tables.is_empty() {
            configured.into_iter().collect()
        } else {
            self.tables.clone()
        };
        let ownership = self.ownership();
        tables
            .into_iter()
            .map(|table| PushRequest {
                table,
                ownership: ownership.clone(),
            })
            .collect()
    }
}

pub fn run(ctx: &AppContext, args: &UploadArgs) -> Result<ExitCode> {
    let engine = ctx.engine()?;
    let requests = args.requests(engine.targets().keys().cloned());
    let batch = engine.upload(&requests);
    emit_batch(ctx, "Upload", &batch)
}
