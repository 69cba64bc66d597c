//! Row reconciliation between a local table and a remote snapshot.
//!
//! There is no shared row key. A row's identity is the tuple of its
//! bot-authoritative cells, and rows are paired by multiset matching on that
//! tuple: every remote row consumes the earliest still-unmatched local row
//! with the same identity. Consequences worth knowing:
//!
//! - a row that moved but is otherwise unchanged is simply kept where the
//!   local table has it;
//! - two rows with equal identity cells are interchangeable, so either one
//!   may be kept when only one of them survives on the remote side.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::debug;

use crate::table::{Cell, Header, Row, Snapshot, fit_row};

use super::ownership::OwnershipPolicy;

/// Result of reconciling local rows against a remote snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Local rows after pulling structural changes, laid out on the local
    /// header.
    pub rows: Vec<Row>,
    /// For each output row, the index of the remote row it corresponds to.
    pub sources: Vec<usize>,
    pub report: ReconcileReport,
}

impl Reconciliation {
    /// `remote` with its rows reordered to line up with [`Self::rows`].
    #[must_use]
    pub fn paired_remote(&self, remote: &Snapshot) -> Snapshot {
        Snapshot {
            header: remote.header.clone(),
            raw_header: remote.raw_header.clone(),
            rows: self
                .sources
                .iter()
                .map(|&r| remote.rows[r].clone())
                .collect(),
        }
    }
}

/// What happened to each row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub kept: usize,
    /// Remote row indices that had no local counterpart.
    pub added: Vec<usize>,
    /// Local row indices with no remote counterpart.
    pub removed: Vec<usize>,
}

/// Match `local_rows` against `remote` and splice in structural changes.
///
/// Kept rows are returned untouched, owned cells included. Added rows are
/// inserted at the index they hold on the remote side and are projected onto
/// the local header by column name; local columns unknown to the remote side
/// get empty cells. Removed rows are dropped.
#[must_use]
pub fn reconcile<P: OwnershipPolicy + ?Sized>(
    local_header: &Header,
    local_rows: &[Row],
    remote: &Snapshot,
    ownership: &P,
) -> Reconciliation {
    let width = local_header.len();
    let identity: Vec<usize> = local_header
        .names()
        .iter()
        .enumerate()
        .filter(|(i, name)| !ownership.is_remote_owned(*i, name))
        .map(|(i, _)| i)
        .collect();
    let alignment = local_header.align_to(&remote.header);

    let mut remaining: HashMap<Vec<Cell>, VecDeque<usize>> = HashMap::new();
    for (index, row) in local_rows.iter().enumerate() {
        remaining
            .entry(local_identity(row, &identity))
            .or_default()
            .push_back(index);
    }

    // Remote index matched by each local row.
    let mut matched: Vec<Option<usize>> = vec![None; local_rows.len()];
    let mut added = Vec::new();
    for (position, row) in remote.rows.iter().enumerate() {
        let key = remote_identity(row, &identity, &alignment);
        match remaining.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(index) => matched[index] = Some(position),
            None => added.push(position),
        }
    }

    let removed: Vec<usize> = matched
        .iter()
        .enumerate()
        .filter(|(_, source)| source.is_none())
        .map(|(i, _)| i)
        .collect();

    let (mut rows, mut sources): (Vec<Row>, Vec<usize>) = local_rows
        .iter()
        .zip(&matched)
        .filter_map(|(row, source)| source.map(|r| (fit_row(row.clone(), width), r)))
        .unzip();
    let kept = rows.len();

    for &position in &added {
        let at = position.min(rows.len());
        rows.insert(at, project(&remote.rows[position], &alignment));
        sources.insert(at, position);
    }

    debug!(
        kept,
        added = added.len(),
        removed = removed.len(),
        identity_columns = identity.len(),
        "reconciled rows"
    );

    Reconciliation {
        rows,
        sources,
        report: ReconcileReport {
            kept,
            added,
            removed,
        },
    }
}

fn local_identity(row: &Row, identity: &[usize]) -> Vec<Cell> {
    identity
        .iter()
        .map(|&i| row.get(i).cloned().unwrap_or_default())
        .collect()
}

fn remote_identity(row: &Row, identity: &[usize], alignment: &[Option<usize>]) -> Vec<Cell> {
    identity
        .iter()
        .map(|&i| remote_cell(row, alignment[i]))
        .collect()
}

/// Lay a remote row out on the local header.
fn project(row: &Row, alignment: &[Option<usize>]) -> Row {
    alignment.iter().map(|&slot| remote_cell(row, slot)).collect()
}

fn remote_cell(row: &Row, slot: Option<usize>) -> Cell {
    slot.and_then(|r| row.get(r)).cloned().unwrap_or_default()
}
