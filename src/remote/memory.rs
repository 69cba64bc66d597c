//! In-memory remote store.
//!
//! Behaves like a spreadsheet service for tests and dry runs: documents are
//! keyed by locator, writes overwrite from the top-left cell and booleans are
//! rendered as `TRUE`/`FALSE`. Failures can be injected per operation to
//! exercise the transport guard.
//!
//! ```rust,ignore
//! let store = InMemoryStore::new();
//! store.insert_document("orders", "Sheet1", grid);
//! store.fail_next(MemoryOp::ReadAll, 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, SyncError};
use crate::table::Row;

use super::{RemoteDocument, RemoteStore, RemoteTab};

/// Remote operation, used to target failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    Open,
    LastTab,
    ReadAll,
    Write,
}

#[derive(Debug, Clone, Default)]
struct MemoryTabData {
    title: String,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<String, Vec<MemoryTabData>>,
    failures: HashMap<MemoryOp, usize>,
    calls: HashMap<MemoryOp, usize>,
}

impl MemoryState {
    fn enter(&mut self, op: MemoryOp) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        if let Some(remaining) = self.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SyncError::RateLimited(format!("injected failure for {op:?}")));
            }
        }
        Ok(())
    }
}

/// Shared in-memory store. Clones see the same documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document with a single tab, replacing any previous one.
    pub fn insert_document(&self, locator: &str, title: &str, values: Vec<Vec<String>>) {
        self.state.lock().documents.insert(
            locator.to_string(),
            vec![MemoryTabData {
                title: title.to_string(),
                values,
            }],
        );
    }

    /// Append a tab to an existing document. Returns `false` if the document
    /// does not exist.
    pub fn add_tab(&self, locator: &str, title: &str, values: Vec<Vec<String>>) -> bool {
        let mut state = self.state.lock();
        let Some(tabs) = state.documents.get_mut(locator) else {
            return false;
        };
        tabs.push(MemoryTabData {
            title: title.to_string(),
            values,
        });
        true
    }

    /// Current values of the last tab.
    #[must_use]
    pub fn last_tab_values(&self, locator: &str) -> Option<Vec<Vec<String>>> {
        let state = self.state.lock();
        state
            .documents
            .get(locator)
            .and_then(|tabs| tabs.last())
            .map(|tab| tab.values.clone())
    }

    /// Replace the values of the last tab.
    pub fn set_last_tab_values(&self, locator: &str, values: Vec<Vec<String>>) {
        let mut state = self.state.lock();
        if let Some(tab) = state.documents.get_mut(locator).and_then(|tabs| tabs.last_mut()) {
            tab.values = values;
        }
    }

    /// Make the next `times` calls of `op` fail.
    pub fn fail_next(&self, op: MemoryOp, times: usize) {
        self.state.lock().failures.insert(op, times);
    }

    /// Number of calls made for `op`, failed ones included.
    #[must_use]
    pub fn calls(&self, op: MemoryOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }
}

impl RemoteStore for InMemoryStore {
    type Document = MemoryDocument;

    fn open(&self, locator: &str) -> Result<MemoryDocument> {
        let mut state = self.state.lock();
        state.enter(MemoryOp::Open)?;
        if !state.documents.contains_key(locator) {
            return Err(SyncError::Remote {
                status: 404,
                message: format!("document not found: {locator}"),
            });
        }
        Ok(MemoryDocument {
            store: self.clone(),
            locator: locator.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    store: InMemoryStore,
    locator: String,
}

impl RemoteDocument for MemoryDocument {
    type Tab = MemoryTab;

    fn last_tab(&self) -> Result<MemoryTab> {
        let mut state = self.store.state.lock();
        state.enter(MemoryOp::LastTab)?;
        let tabs = state.documents.get(&self.locator).map_or(&[][..], Vec::as_slice);
        let Some(last) = tabs.last() else {
            return Err(SyncError::Remote {
                status: 404,
                message: format!("document has no tabs: {}", self.locator),
            });
        };
        Ok(MemoryTab {
            store: self.store.clone(),
            locator: self.locator.clone(),
            index: tabs.len() - 1,
            title: last.title.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTab {
    store: InMemoryStore,
    locator: String,
    index: usize,
    title: String,
}

impl MemoryTab {
    fn with_tab<T>(&self, op: MemoryOp, f: impl FnOnce(&mut MemoryTabData) -> T) -> Result<T> {
        let mut state = self.store.state.lock();
        state.enter(op)?;
        state
            .documents
            .get_mut(&self.locator)
            .and_then(|tabs| tabs.get_mut(self.index))
            .map(f)
            .ok_or_else(|| SyncError::Remote {
                status: 404,
                message: format!("tab {} vanished from {}", self.title, self.locator),
            })
    }
}

impl RemoteTab for MemoryTab {
    fn title(&self) -> &str {
        &self.title
    }

    fn read_all(&self) -> Result<Vec<Vec<String>>> {
        self.with_tab(MemoryOp::ReadAll, |tab| tab.values.clone())
    }

    fn write(&self, grid: &[Row]) -> Result<()> {
        self.with_tab(MemoryOp::Write, |tab| {
            for (r, row) in grid.iter().enumerate() {
                if tab.values.len() <= r {
                    tab.values.resize_with(r + 1, Vec::new);
                }
                let target = &mut tab.values[r];
                if target.len() < row.len() {
                    target.resize(row.len(), String::new());
                }
                for (c, cell) in row.iter().enumerate() {
                    target[c] = cell.as_text().into_owned();
                }
            }
        })
    }
}
