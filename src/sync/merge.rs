//! Column ownership merge.

use serde::Serialize;
use tracing::debug;

use crate::table::{Cell, Header, Row, Snapshot, extend_by_repeating, fit_row, transpose};

use super::ownership::OwnershipPolicy;

/// Merged table ready to be written to the remote side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedTable {
    /// Local column names, followed by remote-only columns.
    pub header: Header,
    /// Header row as written remotely: remote header text where the column
    /// exists remotely, blank for local placeholder columns.
    pub header_row: Vec<String>,
    pub rows: Vec<Row>,
    pub report: MergeReport,
}

impl MergedTable {
    /// Header row followed by the merged rows.
    #[must_use]
    pub fn to_grid(&self) -> Vec<Row> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.header_row.iter().cloned().map(Cell::Text).collect());
        grid.extend(self.rows.iter().cloned());
        grid
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Rows identical on both sides.
    pub unchanged: usize,
    /// Rows combined column by column.
    pub merged: usize,
    /// Rows added to the shorter side by repeating its last row.
    pub padded: usize,
}

/// Combine local rows with the remote snapshot column by column.
///
/// Both sides are first brought to the same shape: remote columns are
/// aligned to the local header by name, remote-only columns are appended,
/// and a column missing on one side is copied from the other. A row-count
/// mismatch is evened out by repeating the shorter side's last row.
///
/// Identical rows are emitted as they are without consulting `ownership`.
/// Otherwise every cell comes from the remote row when its column is
/// remote-owned and from the local row when it is not.
#[must_use]
pub fn merge<P: OwnershipPolicy + ?Sized>(
    local_header: &Header,
    local_rows: &[Row],
    remote: &Snapshot,
    ownership: &P,
) -> MergedTable {
    let local_width = local_header.len();
    let alignment = local_header.align_to(&remote.header);
    let extras: Vec<usize> = (0..remote.width())
        .filter(|r| !alignment.contains(&Some(*r)))
        .collect();

    let mut header = local_header.clone();
    let mut header_row: Vec<String> = alignment
        .iter()
        .enumerate()
        .map(|(i, slot)| match slot {
            Some(r) => remote.raw_header[*r].clone(),
            None => local_header.remote_name(i),
        })
        .collect();
    for &r in &extras {
        header.push(remote.header.names()[r].clone());
        header_row.push(remote.raw_header[r].clone());
    }
    let width = header.len();

    let mut local: Vec<Row> = local_rows
        .iter()
        .map(|row| fit_row(row.clone(), local_width))
        .collect();
    let mut theirs: Vec<Row> = remote
        .rows
        .iter()
        .map(|row| fit_row(row.clone(), remote.width()))
        .collect();

    let len = local.len().max(theirs.len());
    let padded = (len - local.len()) + (len - theirs.len());
    extend_by_repeating(&mut local, len, local_width);
    extend_by_repeating(&mut theirs, len, remote.width());

    let (local, theirs) = if width == 0 {
        (vec![Row::new(); len], vec![Row::new(); len])
    } else {
        equalize_columns(&local, &theirs, &alignment, &extras, len)
    };

    let mut report = MergeReport {
        padded,
        ..MergeReport::default()
    };
    let names = header.names();
    let rows = local
        .into_iter()
        .zip(theirs)
        .map(|(mine, remote_row)| {
            if mine == remote_row {
                report.unchanged += 1;
                return mine;
            }
            report.merged += 1;
            mine.into_iter()
                .zip(remote_row)
                .enumerate()
                .map(|(i, (local_cell, remote_cell))| {
                    if ownership.is_remote_owned(i, &names[i]) {
                        remote_cell
                    } else {
                        local_cell
                    }
                })
                .collect()
        })
        .collect();

    debug!(
        unchanged = report.unchanged,
        merged = report.merged,
        padded = report.padded,
        width,
        "merged rows"
    );

    MergedTable {
        header,
        header_row,
        rows,
        report,
    }
}

/// Bring both sides to the merged column layout through the column-major view.
fn equalize_columns(
    local: &[Row],
    theirs: &[Row],
    alignment: &[Option<usize>],
    extras: &[usize],
    len: usize,
) -> (Vec<Row>, Vec<Row>) {
    let mut local_columns = transpose(local);
    let remote_columns = transpose(theirs);
    let blank = || vec![Cell::empty(); len];

    local_columns.resize_with(alignment.len(), blank);
    let mut aligned: Vec<Row> = alignment
        .iter()
        .enumerate()
        .map(|(i, slot)| match slot {
            Some(r) => remote_columns.get(*r).cloned().unwrap_or_else(blank),
            None => local_columns[i].clone(),
        })
        .collect();
    for &r in extras {
        let column = remote_columns.get(r).cloned().unwrap_or_else(blank);
        local_columns.push(column.clone());
        aligned.push(column);
    }

    (transpose(&local_columns), transpose(&aligned))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell as Counter;

    use super::*;
    use crate::sync::ownership::ColumnOwnership;

    fn header(names: &[&str]) -> Header {
        Header::new(names.iter().map(|n| (*n).to_string()).collect())
    }

    fn rows(values: &[&[&str]]) -> Vec<Row> {
        values
            .iter()
            .map(|row| row.iter().map(|c| Cell::from_raw(c)).collect())
            .collect()
    }

    fn remote(names: &[&str], values: &[&[&str]]) -> Snapshot {
        Snapshot::new(header(names), rows(values))
    }

    struct SpyPolicy {
        inner: ColumnOwnership,
        lookups: Counter<usize>,
    }

    impl OwnershipPolicy for SpyPolicy {
        fn is_remote_owned(&self, position: usize, name: &str) -> bool {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.is_remote_owned(position, name)
        }
    }

    #[test]
    fn owned_columns_take_remote_values() {
        let merged = merge(
            &header(&["name", "status"]),
            &rows(&[&["A", "open"], &["B", "open"]]),
            &remote(&["name", "status"], &[&["A", "closed"], &["B", "open"]]),
            &ColumnOwnership::remote(["status"]),
        );
        assert_eq!(merged.rows, rows(&[&["A", "closed"], &["B", "open"]]));
        assert_eq!(merged.report.merged, 1);
        assert_eq!(merged.report.unchanged, 1);
    }

    #[test]
    fn bot_columns_keep_local_values() {
        let merged = merge(
            &header(&["name", "score"]),
            &rows(&[&["A", "10"]]),
            &remote(&["name", "score"], &[&["A", "3"]]),
            &ColumnOwnership::remote(["name"]),
        );
        assert_eq!(merged.rows, rows(&[&["A", "10"]]));
    }

    #[test]
    fn identical_rows_skip_ownership_lookup() {
        let spy = SpyPolicy {
            inner: ColumnOwnership::remote(["b"]),
            lookups: Counter::new(0),
        };
        let merged = merge(
            &header(&["a", "b"]),
            &rows(&[&["1", "2"], &["3", "4"]]),
            &remote(&["a", "b"], &[&["1", "2"], &["3", "4"]]),
            &spy,
        );
        assert_eq!(spy.lookups.get(), 0);
        assert_eq!(merged.report.unchanged, 2);

        let _ = merge(
            &header(&["a", "b"]),
            &rows(&[&["1", "2"]]),
            &remote(&["a", "b"], &[&["1", "9"]]),
            &spy,
        );
        assert_eq!(spy.lookups.get(), 2);
    }

    #[test]
    fn remote_only_columns_are_appended() {
        let merged = merge(
            &header(&["a"]),
            &rows(&[&["1"]]),
            &remote(&["a", "extra"], &[&["1", "e"]]),
            &ColumnOwnership::bot_only(),
        );
        assert_eq!(merged.header.names(), ["a", "extra"]);
        assert_eq!(merged.rows, rows(&[&["1", "e"]]));
        assert_eq!(merged.report.unchanged, 1);
    }

    #[test]
    fn local_only_columns_survive_remote_ownership() {
        let merged = merge(
            &header(&["a", "computed"]),
            &rows(&[&["1", "c"]]),
            &remote(&["a"], &[&["2"]]),
            &ColumnOwnership::remote(["a", "computed"]),
        );
        assert_eq!(merged.rows, rows(&[&["2", "c"]]));
    }

    #[test]
    fn reordered_remote_columns_align_by_name() {
        let merged = merge(
            &header(&["a", "b"]),
            &rows(&[&["1", "local"]]),
            &remote(&["b", "a"], &[&["remote", "1"]]),
            &ColumnOwnership::remote(["b"]),
        );
        assert_eq!(merged.rows, rows(&[&["1", "remote"]]));
    }

    #[test]
    fn shorter_side_repeats_its_last_row() {
        let merged = merge(
            &header(&["k", "v"]),
            &rows(&[&["A", "1"]]),
            &remote(&["k", "v"], &[&["A", "1"], &["B", "2"]]),
            &ColumnOwnership::remote(["v"]),
        );
        assert_eq!(merged.rows, rows(&[&["A", "1"], &["A", "2"]]));
        assert_eq!(merged.report.padded, 1);
    }

    #[test]
    fn placeholder_headers_are_written_blank() {
        let local = header(&["name", "empty1"]);
        let merged = merge(
            &local,
            &rows(&[&["A", "x"]]),
            &Snapshot::from_grid(
                &[
                    vec!["name".to_string(), String::new()],
                    vec!["A".to_string(), "x".to_string()],
                ],
                crate::table::HeaderMode::Named,
            ),
            &ColumnOwnership::bot_only(),
        );
        let grid = merged.to_grid();
        assert_eq!(grid[0], vec![Cell::Text("name".into()), Cell::empty()]);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn empty_inputs_produce_header_only() {
        let merged = merge(
            &header(&["a"]),
            &[],
            &remote(&["a"], &[]),
            &ColumnOwnership::bot_only(),
        );
        assert!(merged.rows.is_empty());
        assert_eq!(merged.to_grid().len(), 1);
    }
}
