//! Rectangular grid helpers shared by the reconciler and the merger.

use super::cell::Cell;

/// One data row.
pub type Row = Vec<Cell>;

/// Pivot a row-major grid to column-major, or back.
///
/// Ragged input is padded with `T::default()` up to the longest row, so the
/// output is always rectangular. Transposing twice returns the padded input.
#[must_use]
pub fn transpose<T: Clone + Default>(grid: &[Vec<T>]) -> Vec<Vec<T>> {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            grid.iter()
                .map(|row| row.get(col).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Pad with empty cells or truncate so the row has exactly `width` cells.
#[must_use]
pub fn fit_row(mut row: Row, width: usize) -> Row {
    row.resize_with(width, Cell::empty);
    row
}

/// Normalize one raw row to `width` typed cells.
#[must_use]
pub fn normalize_row(raw: &[String], width: usize) -> Row {
    let mut row: Row = raw.iter().take(width).map(|c| Cell::from_raw(c)).collect();
    row.resize_with(width, Cell::empty);
    row
}

/// Extend `rows` to `len` by repeating its last row.
///
/// An empty grid has nothing to repeat and is filled with empty rows of
/// `width` cells instead.
pub fn extend_by_repeating(rows: &mut Vec<Row>, len: usize, width: usize) {
    if rows.len() >= len {
        return;
    }
    let filler = rows.last().cloned().unwrap_or_else(|| vec![Cell::empty(); width]);
    rows.resize(len, filler);
}
