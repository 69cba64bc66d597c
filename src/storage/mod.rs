//! Local relational storage.
//!
//! One SQLite table per synced remote document. Every table has an integer
//! `id` key plus one TEXT column per remote header entry.

pub mod schema;
pub mod sqlite;

pub use schema::{ColumnDef, ColumnType, ID_COLUMN, TableSchema, quote_identifier};
pub use sqlite::Database;
