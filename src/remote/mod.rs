//! Remote document stores.
//!
//! A remote document is a spreadsheet: it has ordered tabs, and the sync
//! always works against the last one. The traits mirror the three blocking
//! round trips a cycle needs (open, pick tab, read or write all cells).

pub mod memory;
pub mod sheets;

pub use memory::{InMemoryStore, MemoryOp};
pub use sheets::{SheetsClient, parse_locator};

use crate::error::Result;
use crate::table::Row;

/// Entry point to a remote document store.
pub trait RemoteStore {
    type Document: RemoteDocument;

    /// Open the document identified by `locator`.
    fn open(&self, locator: &str) -> Result<Self::Document>;
}

/// An opened document.
pub trait RemoteDocument {
    type Tab: RemoteTab;

    /// The right-most tab.
    fn last_tab(&self) -> Result<Self::Tab>;
}

/// One tab of a document.
pub trait RemoteTab {
    fn title(&self) -> &str;

    /// Every cell as displayed, row-major. Rows may be ragged.
    fn read_all(&self) -> Result<Vec<Vec<String>>>;

    /// Overwrite the tab starting at the top-left cell.
    fn write(&self, grid: &[Row]) -> Result<()>;
}
