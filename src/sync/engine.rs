//! Sync orchestrator.
//!
//! Drives whole cycles for configured tables: pull (`init`, `refresh`,
//! `reset`) rewrites the local table from the remote tab, push (`upload`)
//! reconciles and merges local rows into the remote tab. Every remote round
//! trip goes through the [`TransportGuard`] on its own.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, StructuredError, SyncError};
use crate::remote::{RemoteDocument, RemoteStore, RemoteTab};
use crate::storage::{Database, TableSchema};
use crate::table::{HeaderMode, Snapshot};

use super::guard::TransportGuard;
use super::merge::{MergeReport, merge};
use super::ownership::{ColumnOwnership, ColumnRef};
use super::reconcile::{ReconcileReport, reconcile};

type TabOf<R> = <<R as RemoteStore>::Document as RemoteDocument>::Tab;

/// Where a local table's remote counterpart lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableTarget {
    pub locator: String,
    /// Header mode used when the table is created.
    pub header_mode: HeaderMode,
    /// Remote-authoritative columns used when an upload names none.
    pub owned: ColumnOwnership,
}

impl TableTarget {
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_header_mode(mut self, mode: HeaderMode) -> Self {
        self.header_mode = mode;
        self
    }

    #[must_use]
    pub fn with_owned(mut self, owned: ColumnOwnership) -> Self {
        self.owned = owned;
        self
    }
}

/// One table to upload, with an optional ownership override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub table: String,
    /// `None` uses the table's configured ownership.
    pub ownership: Option<ColumnOwnership>,
}

impl PushRequest {
    /// Upload with the table's configured ownership.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ownership: None,
        }
    }

    /// Upload with full bot authority.
    #[must_use]
    pub fn bot_owned(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ownership: Some(ColumnOwnership::bot_only()),
        }
    }

    /// Upload with the listed columns remote-authoritative.
    #[must_use]
    pub fn with_remote_columns<I, C>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Self {
            table: table.into(),
            ownership: Some(ColumnOwnership::remote(columns)),
        }
    }
}

impl From<&str> for PushRequest {
    fn from(table: &str) -> Self {
        Self::new(table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Init,
    Refresh,
    Reset,
    Upload,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Refresh => "refresh",
            Self::Reset => "reset",
            Self::Upload => "upload",
        })
    }
}

/// Outcome of one table's cycle.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    pub operation: SyncOperation,
    /// Title of the remote tab that was read.
    pub tab: String,
    pub created: bool,
    pub dropped: bool,
    /// Data rows written to the local table (pull) or the remote tab (push).
    pub rows_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeReport>,
    pub duration_ms: u128,
    pub synced_at: DateTime<Utc>,
}

impl TableReport {
    fn new(table: &str, operation: SyncOperation, tab: &str) -> Self {
        Self {
            table: table.to_string(),
            operation,
            tab: tab.to_string(),
            created: false,
            dropped: false,
            rows_written: 0,
            reconcile: None,
            merge: None,
            duration_ms: 0,
            synced_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} {} ({}): {} rows",
            self.operation, self.table, self.tab, self.rows_written
        );
        if let Some(rec) = &self.reconcile {
            line.push_str(&format!(
                ", ={} +{} -{}",
                rec.kept,
                rec.added.len(),
                rec.removed.len()
            ));
        }
        if self.created {
            line.push_str(" (created)");
        }
        line
    }
}

/// A table whose cycle failed.
#[derive(Debug, Clone, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub error: StructuredError,
}

/// Outcome of a batch call. Tables are processed independently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub reports: Vec<TableReport>,
    pub failures: Vec<TableFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, table: &str, outcome: Result<TableReport>) {
        match outcome {
            Ok(report) => {
                info!(table, summary = %report.summary_line(), "Table synced");
                self.reports.push(report);
            }
            Err(err) => {
                warn!(table, error = %err, "Table sync failed");
                self.failures.push(TableFailure {
                    table: table.to_string(),
                    error: err.to_structured(),
                });
            }
        }
    }
}

pub struct SyncEngine<R: RemoteStore> {
    remote: R,
    db: Database,
    targets: BTreeMap<String, TableTarget>,
    guard: TransportGuard,
}

impl<R: RemoteStore> std::fmt::Debug for SyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("db", &self.db)
            .field("targets", &self.targets)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl<R: RemoteStore> SyncEngine<R> {
    #[must_use]
    pub fn new(remote: R, db: Database, guard: TransportGuard) -> Self {
        Self {
            remote,
            db,
            targets: BTreeMap::new(),
            guard,
        }
    }

    #[must_use]
    pub fn with_target(mut self, table: impl Into<String>, target: TableTarget) -> Self {
        self.targets.insert(table.into(), target);
        self
    }

    pub fn add_target(&mut self, table: impl Into<String>, target: TableTarget) {
        self.targets.insert(table.into(), target);
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    #[must_use]
    pub const fn targets(&self) -> &BTreeMap<String, TableTarget> {
        &self.targets
    }

    /// Create (if missing) and fill each table. `numeric` forces numeric
    /// header mode for the named table.
    pub fn init(&self, tables: &[String], numeric: Option<&str>) -> BatchReport {
        self.batch(tables, |table| {
            self.init_table(table, numeric_override(table, numeric))
        })
    }

    pub fn refresh(&self, tables: &[String]) -> BatchReport {
        self.batch(tables, |table| self.refresh_table(table))
    }

    pub fn reset(&self, tables: &[String], numeric: Option<&str>) -> BatchReport {
        self.batch(tables, |table| {
            self.reset_table(table, numeric_override(table, numeric))
        })
    }

    /// Upload each request. With no requests every configured table is
    /// uploaded with its configured ownership.
    pub fn upload(&self, requests: &[PushRequest]) -> BatchReport {
        let requests: Vec<PushRequest> = if requests.is_empty() {
            self.targets.keys().map(|t| PushRequest::new(t.as_str())).collect()
        } else {
            requests.to_vec()
        };
        let mut batch = BatchReport::default();
        for request in &requests {
            batch.record(&request.table, self.upload_table(request));
        }
        batch
    }

    /// Create the table from the remote header, then pull its rows. An
    /// existing table is kept with its schema.
    pub fn init_table(&self, table: &str, header_mode: Option<HeaderMode>) -> Result<TableReport> {
        let started = Instant::now();
        let target = self.target(table)?;
        let mode = header_mode.unwrap_or(target.header_mode);
        let (tab, remote) = self.fetch(table, target, mode)?;
        let mut report = TableReport::new(table, SyncOperation::Init, tab.title());

        let schema = TableSchema::from_header(table, &remote.header)?;
        match self.db.create_table(&schema) {
            Ok(()) => {
                info!(table, columns = schema.columns.len(), "Created local table");
                report.created = true;
            }
            Err(SyncError::TableExists(_)) => {
                warn!(table, "Table already exists, keeping its schema");
            }
            Err(err) => return Err(err),
        }

        report.rows_written = self.store_rows(table, &remote)?;
        report.duration_ms = started.elapsed().as_millis();
        Ok(report)
    }

    /// Replace the local rows with the remote rows, keeping the schema.
    pub fn refresh_table(&self, table: &str) -> Result<TableReport> {
        let started = Instant::now();
        let target = self.target(table)?;
        if !self.db.table_exists(table)? {
            return Err(SyncError::TableNotFound(table.to_string()));
        }
        let (tab, remote) = self.fetch(table, target, target.header_mode)?;
        let mut report = TableReport::new(table, SyncOperation::Refresh, tab.title());
        report.rows_written = self.store_rows(table, &remote)?;
        report.duration_ms = started.elapsed().as_millis();
        Ok(report)
    }

    /// Drop the table (a missing table is not an error) and initialize it.
    pub fn reset_table(&self, table: &str, header_mode: Option<HeaderMode>) -> Result<TableReport> {
        let started = Instant::now();
        self.target(table)?;
        let dropped = match self.db.delete_table(table) {
            Ok(()) => true,
            Err(SyncError::TableNotFound(_)) => {
                warn!(table, "Table didn't exist, nothing to drop");
                false
            }
            Err(err) => return Err(err),
        };
        let mut report = self.init_table(table, header_mode)?;
        report.operation = SyncOperation::Reset;
        report.dropped = dropped;
        report.duration_ms = started.elapsed().as_millis();
        Ok(report)
    }

    /// Reconcile local rows with the remote tab, merge by column ownership
    /// and write the result back in one bulk write.
    ///
    /// With no remote-owned columns the local table is authoritative as a
    /// whole and is written as it is.
    pub fn upload_table(&self, request: &PushRequest) -> Result<TableReport> {
        let started = Instant::now();
        let table = request.table.as_str();
        let target = self.target(table)?;
        let ownership = request.ownership.as_ref().unwrap_or(&target.owned);

        let local = self.db.select_all(table)?;
        if ownership.is_empty() {
            return self.push_local(table, target, &local, started);
        }

        let (tab, remote) = self.fetch(table, target, HeaderMode::Named)?;
        let remote = if target.header_mode == HeaderMode::Numeric {
            renumber(remote)
        } else {
            remote
        };

        let reconciled = reconcile(&local.header, &local.rows, &remote, ownership);
        let paired = reconciled.paired_remote(&remote);
        let merged = merge(&local.header, &reconciled.rows, &paired, ownership);
        let grid = merged.to_grid();
        self.guard.call("write", || tab.write(&grid))?;

        let mut report = TableReport::new(table, SyncOperation::Upload, tab.title());
        report.rows_written = merged.rows.len();
        report.reconcile = Some(reconciled.report);
        report.merge = Some(merged.report);
        report.duration_ms = started.elapsed().as_millis();
        Ok(report)
    }

    fn push_local(
        &self,
        table: &str,
        target: &TableTarget,
        local: &Snapshot,
        started: Instant,
    ) -> Result<TableReport> {
        let tab = self.open_tab(target)?;
        let grid = local.to_grid();
        self.guard.call("write", || tab.write(&grid))?;
        debug!(table, rows = local.rows.len(), "Pushed local rows as they are");

        let mut report = TableReport::new(table, SyncOperation::Upload, tab.title());
        report.rows_written = local.rows.len();
        report.duration_ms = started.elapsed().as_millis();
        Ok(report)
    }

    fn batch<F>(&self, tables: &[String], run: F) -> BatchReport
    where
        F: Fn(&str) -> Result<TableReport>,
    {
        let tables: Vec<&str> = if tables.is_empty() {
            self.targets.keys().map(String::as_str).collect()
        } else {
            tables.iter().map(String::as_str).collect()
        };
        let mut batch = BatchReport::default();
        for table in tables {
            batch.record(table, run(table));
        }
        batch
    }

    fn target(&self, table: &str) -> Result<&TableTarget> {
        self.targets
            .get(table)
            .ok_or_else(|| SyncError::UnknownTable(table.to_string()))
    }

    /// Open the document, pick the last tab and read it, each call guarded.
    fn fetch(&self, table: &str, target: &TableTarget, mode: HeaderMode) -> Result<(TabOf<R>, Snapshot)> {
        let tab = self.open_tab(target)?;
        let grid = self.guard.call("read_all", || tab.read_all())?;
        let snapshot = Snapshot::from_grid(&grid, mode);
        debug!(
            table,
            tab = tab.title(),
            width = snapshot.width(),
            rows = snapshot.rows.len(),
            "Fetched remote snapshot"
        );
        Ok((tab, snapshot))
    }

    fn open_tab(&self, target: &TableTarget) -> Result<TabOf<R>> {
        let document = self.guard.call("open", || self.remote.open(&target.locator))?;
        self.guard.call("last_tab", || document.last_tab())
    }

    /// Truncate and bulk insert, rows fitted to the local schema.
    fn store_rows(&self, table: &str, remote: &Snapshot) -> Result<usize> {
        let columns = self.db.table_columns(table)?;
        let width = columns.len();
        let rows: Vec<_> = remote
            .rows
            .iter()
            .map(|row| crate::table::fit_row(row.clone(), width))
            .collect();
        self.db.replace_rows(table, &columns, &rows)
    }
}

fn numeric_override(table: &str, numeric: Option<&str>) -> Option<HeaderMode> {
    (numeric == Some(table)).then_some(HeaderMode::Numeric)
}

/// Rename remote columns by position, keeping the raw header text.
fn renumber(snapshot: Snapshot) -> Snapshot {
    let raw_header = snapshot.raw_header;
    let header = crate::table::Header::from_raw(&raw_header, raw_header.len(), HeaderMode::Numeric);
    Snapshot {
        header,
        raw_header,
        rows: snapshot.rows,
    }
}
