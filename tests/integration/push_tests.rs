use tabsync::remote::MemoryOp;
use tabsync::SyncError;
use tabsync::sync::{ColumnOwnership, PushRequest};
use tabsync::table::Cell;
use tabsync::test_utils::{SyncFixture, grid};

fn orders() -> Vec<Vec<String>> {
    grid(&[
        &["order", "status"],
        &["A", "open"],
        &["B", "open"],
    ])
}

fn pulled(fixture: &mut SyncFixture) -> tabsync::sync::SyncEngine<tabsync::remote::InMemoryStore> {
    fixture.remote_table_with("orders", orders(), |target| {
        target.with_owned(ColumnOwnership::remote(["status"]))
    });
    let engine = fixture.engine().unwrap();
    assert!(engine.init(&[], None).is_success());
    engine
}

#[test]
fn added_remote_row_lands_at_its_position() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);
    fixture.set_remote_values(
        "orders",
        grid(&[&["order", "status"], &["A", "open"], &["C", "new"], &["B", "open"]]),
    );

    let batch = engine.upload(&[]);
    assert!(batch.is_success(), "{:?}", batch.failures);
    let reconcile = batch.reports[0].reconcile.as_ref().unwrap();
    assert_eq!(reconcile.added, vec![1]);
    assert_eq!(reconcile.kept, 2);
    assert_eq!(
        fixture.remote_values("orders"),
        grid(&[&["order", "status"], &["A", "open"], &["C", "new"], &["B", "open"]])
    );
}

#[test]
fn removed_remote_row_is_dropped() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);
    fixture.set_remote_values("orders", grid(&[&["order", "status"], &["B", "open"], &["", ""]]));

    let report = engine.upload_table(&"orders".into()).unwrap();
    let reconcile = report.reconcile.unwrap();
    assert_eq!(reconcile.removed, vec![0]);
    assert_eq!(
        fixture.remote_values("orders"),
        grid(&[&["order", "status"], &["B", "open"], &["", ""]])
    );
}

#[test]
fn owned_column_edits_on_remote_win() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);
    engine
        .database()
        .update_where("orders", "status", &Cell::from("local"), "order", &Cell::from("A"))
        .unwrap();
    fixture.set_remote_values("orders", grid(&[&["order", "status"], &["A", "paid"], &["B", "open"]]));

    let report = engine.upload_table(&"orders".into()).unwrap();
    assert_eq!(report.merge.as_ref().unwrap().merged, 1);
    assert_eq!(report.merge.as_ref().unwrap().unchanged, 1);
    assert_eq!(
        fixture.remote_values("orders"),
        grid(&[&["order", "status"], &["A", "paid"], &["B", "open"]])
    );
}

#[test]
fn explicit_ownership_overrides_configuration() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);
    fixture.set_remote_values("orders", grid(&[&["order", "status"], &["A", "paid"], &["B", "open"]]));

    let report = engine.upload_table(&PushRequest::bot_owned("orders")).unwrap();
    assert!(report.reconcile.is_none());
    assert_eq!(fixture.remote_values("orders"), orders());
}

#[test]
fn bot_owned_upload_pushes_local_edits() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("notes", grid(&[&["k", "note"], &["A", "old"], &["B", "b"]]));
    let engine = fixture.engine().unwrap();
    assert!(engine.init(&[], None).is_success());
    engine
        .database()
        .update_where("notes", "note", &Cell::from("new"), "k", &Cell::from("A"))
        .unwrap();

    let report = engine.upload_table(&PushRequest::bot_owned("notes")).unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(
        fixture.remote_values("notes"),
        grid(&[&["k", "note"], &["A", "new"], &["B", "b"]])
    );
}

#[test]
fn reordered_remote_keeps_owned_cells_on_their_rows() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);
    fixture.set_remote_values("orders", grid(&[&["order", "status"], &["B", "closed"], &["A", "open"]]));

    let report = engine.upload_table(&"orders".into()).unwrap();
    assert_eq!(report.reconcile.as_ref().unwrap().kept, 2);
    assert_eq!(
        fixture.remote_values("orders"),
        grid(&[&["order", "status"], &["A", "open"], &["B", "closed"]])
    );
}

#[test]
fn reorder_with_insertion_pairs_rows_by_identity() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);
    fixture.set_remote_values(
        "orders",
        grid(&[&["order", "status"], &["C", "new"], &["B", "closed"], &["A", "paid"]]),
    );

    let report = engine.upload_table(&"orders".into()).unwrap();
    let reconcile = report.reconcile.as_ref().unwrap();
    assert_eq!(reconcile.added, vec![0]);
    assert_eq!(reconcile.kept, 2);
    assert_eq!(
        fixture.remote_values("orders"),
        grid(&[&["order", "status"], &["C", "new"], &["A", "paid"], &["B", "closed"]])
    );
}

#[test]
fn remote_only_columns_are_preserved() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);
    fixture.set_remote_values(
        "orders",
        grid(&[&["order", "status", "note"], &["A", "open", "call"], &["B", "open"]]),
    );

    engine.upload_table(&"orders".into()).unwrap();
    assert_eq!(
        fixture.remote_values("orders"),
        grid(&[&["order", "status", "note"], &["A", "open", "call"], &["B", "open", ""]])
    );
}

#[test]
fn booleans_are_written_as_text() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("flags", grid(&[&["name", "on"], &["x", "true"]]));
    let engine = fixture.engine().unwrap();
    engine.init(&[], None);

    engine.upload_table(&"flags".into()).unwrap();
    assert_eq!(fixture.remote_values("flags"), grid(&[&["name", "on"], &["x", "TRUE"]]));
}

#[test]
fn write_failing_twice_reports_the_table() {
    let mut fixture = SyncFixture::new().unwrap();
    let engine = pulled(&mut fixture);

    fixture.store.fail_next(MemoryOp::Write, 2);
    let err = engine.upload_table(&"orders".into()).unwrap_err();
    assert!(matches!(err, SyncError::RateLimited(_)));
    assert_eq!(fixture.cooldowns(), 1);
    assert_eq!(fixture.store.calls(MemoryOp::Write), 2);
    assert_eq!(fixture.remote_values("orders"), orders());
}

#[test]
fn uploading_an_unpulled_table_fails() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("orders", orders());
    let engine = fixture.engine().unwrap();
    let batch = engine.upload(&[PushRequest::new("orders")]);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].error.code, tabsync::error::ErrorCode::TableNotFound);
}
