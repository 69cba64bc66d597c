//! Cell normalization and table shapes.
//!
//! Raw spreadsheet text becomes typed [`Cell`]s here, headers get their
//! placeholder names, and [`transpose`] provides the single row/column pivot
//! used by reconciliation and merging.

pub mod cell;
pub mod grid;
pub mod snapshot;

pub use cell::Cell;
pub use grid::{Row, extend_by_repeating, fit_row, normalize_row, transpose};
pub use snapshot::{Header, HeaderMode, PLACEHOLDER_PREFIX, Snapshot, placeholder};
