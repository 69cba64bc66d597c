use tabsync::error::ErrorCode;
use tabsync::remote::MemoryOp;
use tabsync::sync::SyncOperation;
use tabsync::table::{Cell, HeaderMode};
use tabsync::test_utils::{SyncFixture, grid, rows};

fn tasks() -> Vec<Vec<String>> {
    grid(&[
        &["task", "owner", "", "done"],
        &["write docs", "ana", "x", "TRUE"],
        &["ship", "bo"],
        &["review", "", "", "False"],
    ])
}

#[test]
fn init_derives_schema_and_pads_rows() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("tasks", tasks());
    let engine = fixture.engine().unwrap();

    let batch = engine.init(&[], None);
    assert!(batch.is_success(), "{:?}", batch.failures);
    assert!(batch.reports[0].created);

    let db = engine.database();
    assert_eq!(
        db.table_columns("tasks").unwrap(),
        ["task", "owner", "empty2", "done"]
    );
    assert_eq!(
        db.select_all("tasks").unwrap().rows,
        rows(&[
            &["write docs", "ana", "x", "true"],
            &["ship", "bo", "", ""],
            &["review", "", "", "false"],
        ])
    );
}

#[test]
fn pull_is_idempotent() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("tasks", tasks());
    let engine = fixture.engine().unwrap();

    engine.init(&[], None);
    let first = engine.database().select_all("tasks").unwrap();
    let batch = engine.refresh(&[]);
    assert!(batch.is_success());
    engine.refresh(&[]);
    assert_eq!(engine.database().select_all("tasks").unwrap(), first);
}

#[test]
fn refresh_keeps_schema_when_header_drifts() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("tasks", grid(&[&["task", "done"], &["a", "true"]]));
    let engine = fixture.engine().unwrap();
    engine.init(&[], None);

    fixture.set_remote_values(
        "tasks",
        grid(&[&["task", "done", "notes"], &["a", "true", "n"], &["b", "false", "m"]]),
    );
    let batch = engine.refresh(&[]);
    assert_eq!(batch.reports[0].rows_written, 2);
    assert_eq!(engine.database().table_columns("tasks").unwrap(), ["task", "done"]);
    assert_eq!(
        engine.database().select_all("tasks").unwrap().rows,
        vec![
            vec![Cell::from("a"), Cell::Bool(true)],
            vec![Cell::from("b"), Cell::Bool(false)],
        ]
    );
}

#[test]
fn reset_rebuilds_with_new_header() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("tasks", grid(&[&["task"], &["a"]]));
    let engine = fixture.engine().unwrap();
    engine.init(&[], None);

    fixture.set_remote_values("tasks", grid(&[&["task", "done"], &["a", "TRUE"]]));
    let batch = engine.reset(&[], None);
    let report = &batch.reports[0];
    assert_eq!(report.operation, SyncOperation::Reset);
    assert!(report.dropped);
    assert!(report.created);
    assert_eq!(engine.database().table_columns("tasks").unwrap(), ["task", "done"]);
}

#[test]
fn numeric_header_mode_from_target() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table_with("raw", grid(&[&["a", "b"], &["1", "2"]]), |target| {
        target.with_header_mode(HeaderMode::Numeric)
    });
    let engine = fixture.engine().unwrap();
    engine.init(&[], None);
    assert_eq!(engine.database().table_columns("raw").unwrap(), ["0", "1"]);
    assert_eq!(
        engine.database().select_all("raw").unwrap().rows,
        rows(&[&["1", "2"]])
    );
}

#[test]
fn transient_read_failure_is_retried_after_cooldown() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("tasks", tasks());
    let engine = fixture.engine().unwrap();

    fixture.store.fail_next(MemoryOp::ReadAll, 1);
    let batch = engine.init(&[], None);
    assert!(batch.is_success());
    assert_eq!(fixture.store.calls(MemoryOp::ReadAll), 2);
    assert_eq!(fixture.cooldowns(), 1);
    assert_eq!(fixture.pacing_pauses(), 3);
}

#[test]
fn one_failing_table_does_not_stop_the_batch() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture
        .remote_table("tasks", tasks())
        .remote_table("people", grid(&[&["name"], &["ana"]]));
    let engine = fixture.engine().unwrap();

    fixture.store.fail_next(MemoryOp::Open, 2);
    let batch = engine.init(&[], None);
    assert!(!batch.is_success());
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].table, "people");
    assert_eq!(batch.failures[0].error.code, ErrorCode::RateLimited);
    assert_eq!(batch.reports[0].table, "tasks");
    assert!(!engine.database().table_exists("people").unwrap());
}

#[test]
fn data_survives_reopening_the_database() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("tasks", tasks());
    fixture.engine().unwrap().init(&[], None);

    let reopened = fixture.engine().unwrap();
    assert_eq!(reopened.database().select_all("tasks").unwrap().rows.len(), 3);
}

#[test]
fn suffix_like_header_names_initialize_and_round_trip() {
    let mut fixture = SyncFixture::new().unwrap();
    fixture.remote_table("dups", grid(&[&["a", "a__2", "a"], &["1", "2", "3"]]));
    let engine = fixture.engine().unwrap();
    let batch = engine.init(&[], None);
    assert!(batch.is_success(), "{:?}", batch.failures);
    assert_eq!(
        engine.database().select_all("dups").unwrap().header.names(),
        ["a", "a__2", "a"]
    );

    engine.upload_table(&"dups".into()).unwrap();
    assert_eq!(
        fixture.remote_values("dups"),
        grid(&[&["a", "a__2", "a"], &["1", "2", "3"]])
    );
}
