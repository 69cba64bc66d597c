//! Local table schemas derived from a remote header.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Result, SyncError};
use crate::table::Header;

/// Surrogate key present in every synced table.
pub const ID_COLUMN: &str = "id";

/// Bookkeeping table mapping renamed columns back to their header text.
pub const COLUMN_SOURCES_TABLE: &str = "tabsync_columns";

/// Separator between a column name and the suffix used to keep schema column
/// names unique.
const DEDUPE_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    /// Header text the column was derived from.
    pub source: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    #[must_use]
    pub fn is_renamed(&self) -> bool {
        self.name != self.source
    }
}

/// Ordered column list of one local table, excluding the `id` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// One TEXT column per header name.
    ///
    /// SQLite rejects repeated column names, so a name already taken (or
    /// colliding with `id`, case-insensitively) becomes `<name>__<n>`, with
    /// `n` starting at the column position and chosen so the result clashes
    /// with no header name at all. The original text stays in
    /// [`ColumnDef::source`].
    pub fn from_header(table: &str, header: &Header) -> Result<Self> {
        validate_table_name(table)?;
        let reserved: HashSet<String> = header.names().iter().map(|n| n.to_lowercase()).collect();
        let mut used: HashSet<String> = HashSet::from([ID_COLUMN.to_string()]);
        let mut columns = Vec::with_capacity(header.len());
        for (position, source) in header.names().iter().enumerate() {
            validate_identifier(source)?;
            let name = if used.contains(&source.to_lowercase()) {
                unique_name(source, position, |candidate| {
                    used.contains(candidate) || reserved.contains(candidate)
                })
            } else {
                source.clone()
            };
            used.insert(name.to_lowercase());
            columns.push(ColumnDef {
                name,
                source: source.clone(),
                column_type: ColumnType::Text,
            });
        }
        Ok(Self {
            table: table.to_string(),
            columns,
        })
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// `CREATE TABLE` statement for this schema.
    #[must_use]
    pub fn create_sql(&self) -> String {
        let mut definitions = vec![format!(
            "{} {} PRIMARY KEY NOT NULL",
            quote_identifier(ID_COLUMN),
            ColumnType::Integer.as_sql()
        )];
        definitions.extend(
            self.columns
                .iter()
                .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type.as_sql())),
        );
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.table),
            definitions.join(", ")
        )
    }
}

fn unique_name(base: &str, position: usize, clashes: impl Fn(&str) -> bool) -> String {
    let mut suffix = position;
    loop {
        let candidate = format!("{base}{DEDUPE_SEPARATOR}{suffix}");
        if !clashes(&candidate.to_lowercase()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Double-quote an identifier for SQL.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "identifier is empty"));
    }
    if name.contains('\0') {
        return Err(invalid(name, "identifier contains a NUL character"));
    }
    Ok(())
}

pub fn validate_table_name(name: &str) -> Result<()> {
    validate_identifier(name)?;
    let lowered = name.to_ascii_lowercase();
    if lowered.starts_with("sqlite_") {
        return Err(invalid(name, "names starting with sqlite_ are reserved"));
    }
    if lowered == COLUMN_SOURCES_TABLE {
        return Err(invalid(name, "name is reserved for column bookkeeping"));
    }
    Ok(())
}

fn invalid(name: &str, reason: &str) -> SyncError {
    SyncError::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
