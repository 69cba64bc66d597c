//! SQLite database layer

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::table::{Cell, Header, Row, Snapshot};

use super::schema::{
    COLUMN_SOURCES_TABLE, ID_COLUMN, TableSchema, quote_identifier, validate_table_name,
};

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// SQLite database holding the synced tables.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        Self::ensure_bookkeeping(&conn)?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_pragmas(&conn)?;
        Self::ensure_bookkeeping(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back otherwise.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// User tables, sorted by name.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map([COLUMN_SOURCES_TABLE], |row| row.get(0))?;
        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    pub fn create_table(&self, schema: &TableSchema) -> Result<()> {
        if self.table_exists(&schema.table)? {
            return Err(SyncError::TableExists(schema.table.clone()));
        }
        self.with_transaction(|conn| {
            conn.execute(&schema.create_sql(), [])?;
            let mut stmt = conn.prepare(&format!(
                "INSERT INTO {COLUMN_SOURCES_TABLE} (table_name, column_name, source) VALUES (?1, ?2, ?3)"
            ))?;
            for column in schema.columns.iter().filter(|c| c.is_renamed()) {
                stmt.execute([&schema.table, &column.name, &column.source])?;
            }
            Ok(())
        })?;
        debug!(table = %schema.table, columns = schema.columns.len(), "Created table");
        Ok(())
    }

    pub fn delete_table(&self, table: &str) -> Result<()> {
        self.require_table(table)?;
        self.with_transaction(|conn| {
            conn.execute(&format!("DROP TABLE {}", quote_identifier(table)), [])?;
            conn.execute(
                &format!("DELETE FROM {COLUMN_SOURCES_TABLE} WHERE table_name = ?1"),
                [table],
            )?;
            Ok(())
        })?;
        debug!(table, "Dropped table");
        Ok(())
    }

    /// Delete every row, keeping the table. Returns the number of rows removed.
    pub fn delete_all_rows(&self, table: &str) -> Result<usize> {
        self.require_table(table)?;
        Ok(delete_all(&self.conn, table)?)
    }

    pub fn insert_row(&self, table: &str, columns: &[String], values: &[Cell]) -> Result<()> {
        self.require_table(table)?;
        insert(&self.conn, table, columns, values)?;
        Ok(())
    }

    /// Truncate `table` and insert `rows`, all in one transaction.
    pub fn replace_rows(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<usize> {
        self.require_table(table)?;
        self.with_transaction(|conn| {
            let removed = delete_all(conn, table)?;
            for row in rows {
                insert(conn, table, columns, row)?;
            }
            debug!(table, removed, inserted = rows.len(), "Replaced rows");
            Ok(rows.len())
        })
    }

    /// Column names in declaration order, without the `id` key.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        self.require_table(table)?;
        let mut stmt = self.conn.prepare(&format!(
            "PRAGMA table_info({})",
            quote_identifier(table)
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut columns = Vec::new();
        for name in rows {
            let name = name?;
            if name != ID_COLUMN {
                columns.push(name);
            }
        }
        Ok(columns)
    }

    /// Every row in insertion order.
    ///
    /// The snapshot header carries the names the columns were derived from,
    /// so it aligns with the remote header even for renamed duplicates.
    pub fn select_all(&self, table: &str) -> Result<Snapshot> {
        let columns = self.table_columns(table)?;
        let select_list = if columns.is_empty() {
            quote_identifier(ID_COLUMN)
        } else {
            column_list(&columns)
        };
        let sql = format!(
            "SELECT {select_list} FROM {} ORDER BY {}",
            quote_identifier(table),
            quote_identifier(ID_COLUMN)
        );
        let width = columns.len();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(cell_from_value))
                .collect::<rusqlite::Result<Row>>()
        })?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(Snapshot::new(self.source_header(table, &columns)?, data))
    }

    /// Values of `column` in rows where `filter_column` equals `filter_value`.
    pub fn select_where(
        &self,
        table: &str,
        column: &str,
        filter_column: &str,
        filter_value: &Cell,
    ) -> Result<Vec<Cell>> {
        self.require_columns(table, &[column, filter_column])?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {}",
            quote_identifier(column),
            quote_identifier(table),
            quote_identifier(filter_column),
            quote_identifier(ID_COLUMN)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([filter_value], |row| row.get_ref(0).map(cell_from_value))?;
        let mut values = Vec::new();
        for value in rows {
            values.push(value?);
        }
        Ok(values)
    }

    /// Set `column` to `value` in rows where `filter_column` equals
    /// `filter_value`. Returns the number of rows changed.
    pub fn update_where(
        &self,
        table: &str,
        column: &str,
        value: &Cell,
        filter_column: &str,
        filter_value: &Cell,
    ) -> Result<usize> {
        self.require_columns(table, &[column, filter_column])?;
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {} = ?",
            quote_identifier(table),
            quote_identifier(column),
            quote_identifier(filter_column)
        );
        let changed = self.with_transaction(|conn| Ok(conn.execute(&sql, [value, filter_value])?))?;
        debug!(table, column, changed, "Updated rows");
        Ok(changed)
    }

    /// Header text each column was derived from, in column order.
    pub fn source_header(&self, table: &str, columns: &[String]) -> Result<Header> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT column_name, source FROM {COLUMN_SOURCES_TABLE} WHERE table_name = ?1"
        ))?;
        let rows = stmt.query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut sources = HashMap::new();
        for row in rows {
            let (column, source) = row?;
            sources.insert(column, source);
        }
        Ok(Header::new(
            columns
                .iter()
                .map(|c| sources.get(c).cloned().unwrap_or_else(|| c.clone()))
                .collect(),
        ))
    }

    fn require_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;
        if self.table_exists(table)? {
            Ok(())
        } else {
            Err(SyncError::TableNotFound(table.to_string()))
        }
    }

    fn require_columns(&self, table: &str, wanted: &[&str]) -> Result<()> {
        let columns = self.table_columns(table)?;
        for name in wanted {
            if *name != ID_COLUMN && !columns.iter().any(|c| c == name) {
                return Err(SyncError::InvalidIdentifier {
                    name: (*name).to_string(),
                    reason: format!("no such column in table {table}"),
                });
            }
        }
        Ok(())
    }

    fn ensure_bookkeeping(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {COLUMN_SOURCES_TABLE} (
                table_name TEXT NOT NULL,
                column_name TEXT NOT NULL,
                source TEXT NOT NULL,
                PRIMARY KEY (table_name, column_name)
            );"
        ))?;
        Ok(())
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn delete_all(conn: &Connection, table: &str) -> rusqlite::Result<usize> {
    conn.execute(&format!("DELETE FROM {}", quote_identifier(table)), [])
}

fn insert(conn: &Connection, table: &str, columns: &[String], values: &[Cell]) -> Result<()> {
    if columns.len() != values.len() {
        return Err(SyncError::InvalidIdentifier {
            name: table.to_string(),
            reason: format!("{} values for {} columns", values.len(), columns.len()),
        });
    }
    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table))
    } else {
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_identifier(table),
            column_list(columns)
        )
    };
    conn.prepare_cached(&sql)?.execute(params_from_iter(values))?;
    Ok(())
}

/// Booleans are stored as `TRUE`/`FALSE` text so they fold back on read.
impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let text: &[u8] = match self {
            Self::Bool(true) => b"TRUE",
            Self::Bool(false) => b"FALSE",
            Self::Text(text) => text.as_bytes(),
        };
        Ok(ToSqlOutput::Borrowed(ValueRef::Text(text)))
    }
}

fn cell_from_value(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::empty(),
        ValueRef::Integer(i) => Cell::Text(i.to_string()),
        ValueRef::Real(f) => Cell::Text(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Cell::from_raw_owned(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Header;
    use tempfile::tempdir;

    fn header(names: &[&str]) -> Header {
        Header::new(names.iter().map(|n| (*n).to_string()).collect())
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|n| (*n).to_string()).collect()
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        let schema = TableSchema::from_header("tasks", &header(&["name", "done"])).unwrap();
        db.create_table(&schema).unwrap();
        db.replace_rows(
            "tasks",
            &names(&["name", "done"]),
            &[
                vec![Cell::from("write"), Cell::Bool(false)],
                vec![Cell::from("ship"), Cell::Bool(true)],
            ],
        )
        .unwrap();
        db
    }

    #[test]
    fn test_wal_mode_enabled() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");
        let db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
        let mode: String = db
            .conn()
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn create_twice_reports_existing_table() {
        let db = seeded();
        let schema = TableSchema::from_header("tasks", &header(&["x"])).unwrap();
        assert!(matches!(db.create_table(&schema), Err(SyncError::TableExists(t)) if t == "tasks"));
    }

    #[test]
    fn delete_missing_table_reports_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.delete_table("ghost"),
            Err(SyncError::TableNotFound(t)) if t == "ghost"
        ));
    }

    #[test]
    fn select_all_folds_booleans_back() {
        let db = seeded();
        let snapshot = db.select_all("tasks").unwrap();
        assert_eq!(snapshot.header.names(), ["name", "done"]);
        assert_eq!(
            snapshot.rows,
            vec![
                vec![Cell::from("write"), Cell::Bool(false)],
                vec![Cell::from("ship"), Cell::Bool(true)],
            ]
        );
        let stored: String = db
            .conn()
            .query_row("SELECT done FROM tasks WHERE name = 'ship'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, "TRUE");
    }

    #[test]
    fn replace_rows_truncates_first() {
        let db = seeded();
        db.replace_rows("tasks", &names(&["name", "done"]), &[vec![Cell::from("only"), Cell::empty()]])
            .unwrap();
        assert_eq!(db.select_all("tasks").unwrap().rows.len(), 1);
    }

    #[test]
    fn failed_replace_rolls_back() {
        let db = seeded();
        let err = db
            .replace_rows(
                "tasks",
                &names(&["name", "done"]),
                &[vec![Cell::from("a"), Cell::empty()], vec![Cell::from("short")]],
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidIdentifier { .. }));
        assert_eq!(db.select_all("tasks").unwrap().rows.len(), 2);
    }

    #[test]
    fn point_query_and_update() {
        let db = seeded();
        assert_eq!(
            db.select_where("tasks", "done", "name", &Cell::from("ship")).unwrap(),
            vec![Cell::Bool(true)]
        );
        let changed = db
            .update_where("tasks", "done", &Cell::Bool(false), "name", &Cell::from("ship"))
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(
            db.select_where("tasks", "name", "done", &Cell::Bool(false)).unwrap(),
            vec![Cell::from("write"), Cell::from("ship")]
        );
    }

    #[test]
    fn unknown_column_is_rejected() {
        let db = seeded();
        assert!(matches!(
            db.select_where("tasks", "nope", "name", &Cell::from("x")),
            Err(SyncError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn renamed_duplicates_keep_source_names() {
        let db = Database::open_in_memory().unwrap();
        let schema = TableSchema::from_header("dup", &header(&["x", "x", "id"])).unwrap();
        db.create_table(&schema).unwrap();
        assert_eq!(db.table_columns("dup").unwrap(), ["x", "x__1", "id__2"]);
        assert_eq!(db.select_all("dup").unwrap().header.names(), ["x", "x", "id"]);
    }

    #[test]
    fn suffix_like_header_is_read_back_verbatim() {
        let db = Database::open_in_memory().unwrap();
        let schema = TableSchema::from_header("t", &header(&["b", "b__1", "a", "a__2", "a"])).unwrap();
        db.create_table(&schema).unwrap();
        assert_eq!(db.table_columns("t").unwrap(), ["b", "b__1", "a", "a__2", "a__4"]);
        assert_eq!(
            db.select_all("t").unwrap().header.names(),
            ["b", "b__1", "a", "a__2", "a"]
        );
    }

    #[test]
    fn dropping_a_table_forgets_its_renames() {
        let db = Database::open_in_memory().unwrap();
        let schema = TableSchema::from_header("dup", &header(&["x", "x"])).unwrap();
        db.create_table(&schema).unwrap();
        db.delete_table("dup").unwrap();
        let count: i64 = db
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {COLUMN_SOURCES_TABLE}"), [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn row_level_helpers() {
        let db = seeded();
        db.insert_row("tasks", &names(&["name", "done"]), &[Cell::from("test"), Cell::Bool(true)])
            .unwrap();
        assert_eq!(db.select_all("tasks").unwrap().rows.len(), 3);
        assert!(matches!(
            db.insert_row("tasks", &names(&["name", "done"]), &[Cell::from("short")]),
            Err(SyncError::InvalidIdentifier { .. })
        ));
        assert_eq!(db.delete_all_rows("tasks").unwrap(), 3);
        assert!(db.select_all("tasks").unwrap().rows.is_empty());
        assert!(matches!(
            db.delete_all_rows("ghost"),
            Err(SyncError::TableNotFound(_))
        ));
    }

    #[test]
    fn lists_tables() {
        let db = seeded();
        assert_eq!(db.list_tables().unwrap(), ["tasks"]);
        db.delete_table("tasks").unwrap();
        assert!(db.list_tables().unwrap().is_empty());
    }
}
