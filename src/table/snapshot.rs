//! Header and snapshot types.

use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::grid::{Row, fit_row, normalize_row};

/// Prefix used for columns whose header cell is blank.
pub const PLACEHOLDER_PREFIX: &str = "empty";

/// How header cells become column names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderMode {
    /// Use the header text, blank cells become `empty<i>`.
    #[default]
    Named,
    /// Ignore the header text and name columns by position (`0`, `1`, ...).
    Numeric,
}

/// Ordered column names. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    #[must_use]
    pub const fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Derive column names from a raw header row.
    #[must_use]
    pub fn from_raw(raw: &[String], width: usize, mode: HeaderMode) -> Self {
        let names = (0..width)
            .map(|i| match mode {
                HeaderMode::Numeric => i.to_string(),
                HeaderMode::Named => match raw.get(i).map(String::as_str) {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => placeholder(i),
                },
            })
            .collect();
        Self { names }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    /// Name as written back to the remote side: placeholders become blank.
    #[must_use]
    pub fn remote_name(&self, index: usize) -> String {
        match self.names.get(index) {
            Some(name) if *name == placeholder(index) => String::new(),
            Some(name) => name.clone(),
            None => String::new(),
        }
    }

    /// For each of our columns, the index of the column with the same name in
    /// `other`. Repeated names pair up in order of appearance.
    #[must_use]
    pub fn align_to(&self, other: &Self) -> Vec<Option<usize>> {
        let mut taken = vec![false; other.len()];
        self.names
            .iter()
            .map(|name| {
                let found = other
                    .names
                    .iter()
                    .enumerate()
                    .position(|(i, candidate)| !taken[i] && candidate == name);
                if let Some(i) = found {
                    taken[i] = true;
                }
                found
            })
            .collect()
    }
}

/// Placeholder name for a blank header cell at `index`.
#[must_use]
pub fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}")
}

/// A header plus rectangular data rows captured from one store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub header: Header,
    /// Header row exactly as the source holds it, padded to the header width.
    pub raw_header: Vec<String>,
    pub rows: Vec<Row>,
}

impl Snapshot {
    /// Build a snapshot from already typed rows. Rows are fitted to the header.
    #[must_use]
    pub fn new(header: Header, rows: Vec<Row>) -> Self {
        let width = header.len();
        let raw_header = (0..width).map(|i| header.remote_name(i)).collect();
        let rows = rows.into_iter().map(|row| fit_row(row, width)).collect();
        Self {
            header,
            raw_header,
            rows,
        }
    }

    /// Normalize a raw row-major text grid. Row 0 is the header.
    ///
    /// The width is the longest row in the grid, since spreadsheet APIs trim
    /// trailing blank cells per row.
    #[must_use]
    pub fn from_grid(grid: &[Vec<String>], mode: HeaderMode) -> Self {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let Some((raw_header, data)) = grid.split_first() else {
            return Self::default();
        };
        let header = Header::from_raw(raw_header, width, mode);
        let mut padded_header = raw_header.clone();
        padded_header.resize(width, String::new());
        let rows = data.iter().map(|raw| normalize_row(raw, width)).collect();
        Self {
            header,
            raw_header: padded_header,
            rows,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Header row plus data rows, ready for a bulk write.
    #[must_use]
    pub fn to_grid(&self) -> Vec<Row> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.raw_header.iter().map(|n| Cell::Text(n.clone())).collect());
        grid.extend(self.rows.iter().cloned());
        grid
    }
}
