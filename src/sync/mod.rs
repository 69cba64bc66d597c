//! Reconciliation and merge engine.
//!
//! Pure parts ([`reconcile`], [`merge`]) work on snapshots; [`SyncEngine`]
//! wires them to the local database and a remote store, with every remote
//! call wrapped by the [`TransportGuard`].

pub mod engine;
pub mod guard;
pub mod merge;
pub mod ownership;
pub mod reconcile;

pub use engine::{
    BatchReport, PushRequest, SyncEngine, SyncOperation, TableFailure, TableReport, TableTarget,
};
pub use guard::{DEFAULT_COOLDOWN, DEFAULT_PACING, RecordingSleeper, Sleeper, ThreadSleeper, TransportGuard};
pub use merge::{MergeReport, MergedTable, merge};
pub use ownership::{ColumnOwnership, ColumnRef, OwnershipPolicy};
pub use reconcile::{ReconcileReport, Reconciliation, reconcile};
