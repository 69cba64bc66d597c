use proptest::prelude::*;

use tabsync::sync::{ColumnOwnership, merge, reconcile};
use tabsync::table::{Cell, Header, Row, Snapshot, transpose};

const WIDTH: usize = 3;

fn header() -> Header {
    Header::new(vec!["key".into(), "value".into(), "owned".into()])
}

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        "[a-c]{0,1}".prop_map(Cell::Text),
        any::<bool>().prop_map(Cell::Bool),
    ]
}

fn arb_rows(max: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(prop::collection::vec(arb_cell(), WIDTH), 0..max)
}

fn owned() -> ColumnOwnership {
    ColumnOwnership::remote(["owned"])
}

proptest! {
    #[test]
    fn reconcile_accounts_for_every_row(local in arb_rows(12), remote in arb_rows(12)) {
        let snapshot = Snapshot::new(header(), remote.clone());
        let result = reconcile(&header(), &local, &snapshot, &owned());
        prop_assert_eq!(result.report.kept + result.report.added.len(), remote.len());
        prop_assert_eq!(result.report.kept + result.report.removed.len(), local.len());
        prop_assert_eq!(result.rows.len(), remote.len());
        prop_assert!(result.rows.iter().all(|row| row.len() == WIDTH));
    }

    #[test]
    fn reconcile_with_itself_is_identity(local in arb_rows(12)) {
        let snapshot = Snapshot::new(header(), local.clone());
        let result = reconcile(&header(), &local, &snapshot, &owned());
        prop_assert_eq!(&result.rows, &local);
        prop_assert!(result.report.added.is_empty());
        prop_assert!(result.report.removed.is_empty());
    }

    #[test]
    fn kept_rows_keep_owned_cells(
        local in arb_rows(12),
        edits in prop::collection::vec(arb_cell(), 12),
    ) {
        let remote: Vec<Row> = local
            .iter()
            .zip(&edits)
            .map(|(row, edit)| {
                let mut row = row.clone();
                row[2] = edit.clone();
                row
            })
            .collect();
        let result = reconcile(&header(), &local, &Snapshot::new(header(), remote), &owned());
        prop_assert_eq!(&result.rows, &local);
    }

    #[test]
    fn inserted_row_lands_at_its_index(local in arb_rows(10), at in 0usize..10) {
        let at = at.min(local.len());
        let fresh = vec![Cell::Text("zz".into()), Cell::Text("new".into()), Cell::empty()];
        let mut remote = local.clone();
        remote.insert(at, fresh.clone());

        let result = reconcile(&header(), &local, &Snapshot::new(header(), remote.clone()), &owned());
        prop_assert_eq!(result.report.added, vec![at]);
        prop_assert_eq!(result.rows, remote);
    }

    #[test]
    fn merge_output_is_rectangular(local in arb_rows(10), remote in arb_rows(10)) {
        let merged = merge(&header(), &local, &Snapshot::new(header(), remote.clone()), &owned());
        prop_assert_eq!(merged.rows.len(), local.len().max(remote.len()));
        prop_assert!(merged.rows.iter().all(|row| row.len() == WIDTH));
        for (r, row) in merged.rows.iter().enumerate() {
            if let Some(remote_row) = remote.get(r) {
                if local.get(r) != Some(remote_row) {
                    prop_assert_eq!(&row[2], &remote_row[2]);
                }
            }
        }
    }

    #[test]
    fn merged_rows_take_owned_cells_from_their_matched_remote_row(
        local in arb_rows(10),
        remote in arb_rows(10),
    ) {
        let snapshot = Snapshot::new(header(), remote);
        let reconciled = reconcile(&header(), &local, &snapshot, &owned());
        let paired = reconciled.paired_remote(&snapshot);
        let merged = merge(&header(), &reconciled.rows, &paired, &owned());
        prop_assert_eq!(merged.rows.len(), reconciled.rows.len());
        for (row, &source) in merged.rows.iter().zip(&reconciled.sources) {
            prop_assert_eq!(&row[2], &snapshot.rows[source][2]);
            prop_assert_eq!(&row[..2], &snapshot.rows[source][..2]);
        }
    }

    #[test]
    fn transpose_round_trips_rectangles(rows in prop::collection::vec(prop::collection::vec(arb_cell(), WIDTH), 1..10)) {
        prop_assert_eq!(transpose(&transpose(&rows)), rows);
    }
}
