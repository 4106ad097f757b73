//! End-to-end migration scenarios over the in-memory adapters.

use std::sync::{Arc, Mutex};

use sql_doc_migrate::{
    ColumnDescriptor, Config, DocValue, EventKind, MemorySource, MemoryStore, Orchestrator,
    Progress, RawValue, TableStatus,
};
use tokio::sync::watch;

fn users_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "INT", false),
        ColumnDescriptor::new("name", "VARCHAR(50)", true),
        ColumnDescriptor::new("active", "BIT", false),
    ]
}

fn users_rows() -> Vec<Vec<RawValue>> {
    vec![
        vec![RawValue::Integer(1), RawValue::Text("Ann".into()), RawValue::Integer(1)],
        vec![RawValue::Integer(2), RawValue::Text("Bo".into()), RawValue::Integer(0)],
        vec![RawValue::Integer(3), RawValue::Text("Cy".into()), RawValue::Integer(1)],
    ]
}

fn config_with_batch_size(tables: &[&str], batch_size: usize) -> Config {
    let mut config = Config::for_tables(tables.iter().copied());
    config.migration.batch_size = Some(batch_size);
    config
}

#[tokio::test]
async fn users_table_migrates_in_two_batches() {
    let source = Arc::new(MemorySource::new("mssql").with_table(
        "users",
        users_columns(),
        users_rows(),
    ));
    let target = Arc::new(MemoryStore::new());
    let config = config_with_batch_size(&["users"], 2);

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    assert_eq!(report.tables.len(), 1);
    let result = &report.tables[0];
    assert_eq!(result.status, TableStatus::Success);
    assert_eq!(result.rows_read, 3);
    assert_eq!(result.rows_written, 3);
    assert!(result.batches_failed.is_empty());

    let docs = target.open("users").documents();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].get("id"), Some(&DocValue::Integer(1)));
    assert_eq!(docs[0].get("name"), Some(&DocValue::String("Ann".into())));
    assert_eq!(docs[0].get("active"), Some(&DocValue::Boolean(true)));
    assert_eq!(docs[1].get("active"), Some(&DocValue::Boolean(false)));
    assert_eq!(docs[2].get("id"), Some(&DocValue::Integer(3)));

    // Every document carries exactly the table's field set.
    for doc in &docs {
        assert_eq!(doc.len(), 3);
        let names: Vec<_> = doc.field_names().collect();
        assert_eq!(names, vec!["id", "name", "active"]);
    }

    // ceil(3/2) = 2 batch_written entries, bracketed by start/complete.
    let events: Vec<_> = log.snapshot().iter().map(|e| e.event).collect();
    assert_eq!(
        events,
        vec![
            EventKind::TableStarted,
            EventKind::BatchWritten,
            EventKind::BatchWritten,
            EventKind::TableCompleted,
        ]
    );
}

#[tokio::test]
async fn chunked_source_replies_lose_no_rows() {
    // The connection legally returns fewer rows than asked for per call; the
    // run must still read and write every row rather than stopping at the
    // first short reply.
    let source = Arc::new(
        MemorySource::new("mysql")
            .with_table("users", users_columns(), users_rows())
            .with_reply_cap(1),
    );
    let target = Arc::new(MemoryStore::new());
    let config = config_with_batch_size(&["users"], 2);

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let report = orchestrator.run(None).await;

    let result = &report.tables[0];
    assert_eq!(result.status, TableStatus::Success);
    assert_eq!(result.rows_read, 3);
    assert_eq!(result.rows_written, 3);
    assert_eq!(target.open("users").documents().len(), 3);
}

#[tokio::test]
async fn failed_batch_is_skipped_and_table_ends_partial() {
    let source = Arc::new(MemorySource::new("postgres").with_table(
        "users",
        users_columns(),
        users_rows(),
    ));
    let target = Arc::new(MemoryStore::new());
    // Fail the second bulk insert (batch index 1 of 2).
    target.open("users").fail_on_call(1);

    let config = config_with_batch_size(&["users"], 2);
    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let report = orchestrator.run(None).await;

    let result = &report.tables[0];
    assert_eq!(result.status, TableStatus::PartialFailure);
    assert_eq!(result.rows_read, 3);
    assert_eq!(result.rows_written, 2);
    assert_eq!(result.batches_failed.len(), 1);
    assert_eq!(result.batches_failed[0].batch_index, 1);
    assert!(!result.batches_failed[0].error.is_empty());

    // Row conservation: written rows plus rows in failed batches cover R.
    assert_eq!(result.rows_written + 1, result.rows_read);
}

#[tokio::test]
async fn ghost_table_fails_without_batch_entries() {
    let source = Arc::new(MemorySource::new("sqlite"));
    let target = Arc::new(MemoryStore::new());
    let config = Config::for_tables(["ghost"]);

    let orchestrator = Orchestrator::new(source, target, config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    let result = &report.tables[0];
    assert_eq!(result.status, TableStatus::Failed);
    assert_eq!(result.rows_read, 0);
    assert_eq!(result.rows_written, 0);

    let snap = log.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].event, EventKind::TableFailed);
    assert!(!snap
        .iter()
        .any(|e| e.event == EventKind::BatchWritten));
}

#[tokio::test]
async fn empty_table_is_a_success() {
    let source =
        Arc::new(MemorySource::new("mysql").with_table("empty", users_columns(), vec![]));
    let target = Arc::new(MemoryStore::new());
    let config = Config::for_tables(["empty"]);

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    let result = &report.tables[0];
    assert_eq!(result.status, TableStatus::Success);
    assert_eq!(result.rows_read, 0);
    assert_eq!(result.rows_written, 0);
    assert!(target.open("empty").documents().is_empty());

    let events: Vec<_> = log.snapshot().iter().map(|e| e.event).collect();
    assert_eq!(events, vec![EventKind::TableStarted, EventKind::TableCompleted]);
}

#[tokio::test]
async fn batch_count_and_row_conservation() {
    let rows: Vec<Vec<RawValue>> = (0..10).map(|i| vec![RawValue::Integer(i)]).collect();
    let source = Arc::new(MemorySource::new("postgres").with_table(
        "seq",
        vec![ColumnDescriptor::new("n", "BIGINT", false)],
        rows,
    ));
    let target = Arc::new(MemoryStore::new());
    let config = config_with_batch_size(&["seq"], 3);

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    // ceil(10/3) = 4 batches
    let batch_entries = log
        .snapshot()
        .iter()
        .filter(|e| e.event == EventKind::BatchWritten)
        .count();
    assert_eq!(batch_entries, 4);
    assert_eq!(report.tables[0].rows_written, 10);
    assert_eq!(target.open("seq").documents().len(), 10);
}

#[tokio::test]
async fn table_failure_does_not_stop_the_run() {
    let source = Arc::new(
        MemorySource::new("mssql").with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    let config = Config::for_tables(["ghost", "users"]);

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let report = orchestrator.run(None).await;

    assert_eq!(report.tables.len(), 2);
    assert_eq!(report.tables[0].table_name, "ghost");
    assert_eq!(report.tables[0].status, TableStatus::Failed);
    assert_eq!(report.tables[1].table_name, "users");
    assert_eq!(report.tables[1].status, TableStatus::Success);
    assert_eq!(report.tables_success, 1);
    assert_eq!(report.tables_failed, 1);
    assert_eq!(target.open("users").documents().len(), 3);
}

#[tokio::test]
async fn read_failure_mid_table_aborts_only_that_table() {
    let source = Arc::new(
        MemorySource::new("postgres")
            .with_table("flaky", users_columns(), users_rows())
            .with_read_failure_at("flaky", 2)
            .with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    let config = config_with_batch_size(&["flaky", "users"], 2);

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    let flaky = &report.tables[0];
    assert_eq!(flaky.status, TableStatus::Failed);
    assert_eq!(flaky.rows_read, 2);
    assert_eq!(flaky.rows_written, 2);

    // The next table is unaffected.
    assert_eq!(report.tables[1].status, TableStatus::Success);

    let flaky_failed = log
        .snapshot()
        .iter()
        .filter(|e| e.table == "flaky" && e.event == EventKind::TableFailed)
        .count();
    assert_eq!(flaky_failed, 1);
}

#[tokio::test]
async fn all_batches_failing_means_table_failed() {
    let source = Arc::new(
        MemorySource::new("mysql").with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    let coll = target.open("users");
    coll.fail_on_call(0);
    coll.fail_on_call(1);

    let config = config_with_batch_size(&["users"], 2);
    let orchestrator = Orchestrator::new(source, target, config).unwrap();
    let report = orchestrator.run(None).await;

    let result = &report.tables[0];
    assert_eq!(result.status, TableStatus::Failed);
    assert_eq!(result.rows_read, 3);
    assert_eq!(result.rows_written, 0);
    assert_eq!(result.batches_failed.len(), 2);
}

#[tokio::test]
async fn stop_on_batch_failure_halts_the_table() {
    let source = Arc::new(
        MemorySource::new("mysql").with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    target.open("users").fail_on_call(0);

    let mut config = config_with_batch_size(&["users"], 1);
    config.migration.stop_on_batch_failure = true;

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let report = orchestrator.run(None).await;

    let result = &report.tables[0];
    assert_eq!(result.status, TableStatus::Failed);
    assert_eq!(result.rows_read, 1);
    assert_eq!(result.batches_failed.len(), 1);
    assert!(target.open("users").documents().is_empty());
}

#[tokio::test]
async fn halting_batch_failure_still_reports_progress() {
    // The batch that trips stop_on_batch_failure is still a completed batch
    // and must reach the sink before the table stops.
    let source = Arc::new(
        MemorySource::new("mysql").with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    target.open("users").fail_on_call(1);

    let mut config = config_with_batch_size(&["users"], 1);
    config.migration.stop_on_batch_failure = true;

    let seen: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();

    let orchestrator = Orchestrator::new(source, target, config)
        .unwrap()
        .with_progress_sink(move |p: &Progress| {
            sink_seen.lock().unwrap().push(p.clone());
        });
    let report = orchestrator.run(None).await;

    assert_eq!(report.tables[0].status, TableStatus::PartialFailure);
    assert_eq!(report.tables[0].batches_failed.len(), 1);

    // One update per batch read, including the failed one that halted the
    // table.
    let updates = seen.lock().unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].rows_processed, 2);
}

#[tokio::test]
async fn misaligned_rows_abort_the_table() {
    // Schema says three columns; the rows carry one value each.
    let source = Arc::new(MemorySource::new("sqlite").with_table(
        "broken",
        users_columns(),
        vec![vec![RawValue::Integer(1)]],
    ));
    let target = Arc::new(MemoryStore::new());
    let config = Config::for_tables(["broken"]);

    let orchestrator = Orchestrator::new(source, target, config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    assert_eq!(report.tables[0].status, TableStatus::Failed);
    let snap = log.snapshot();
    let failed = snap
        .iter()
        .find(|e| e.event == EventKind::TableFailed)
        .unwrap();
    assert!(failed.detail["error"]
        .as_str()
        .unwrap()
        .contains("misalignment"));
}

#[tokio::test]
async fn conversion_fallbacks_are_recorded_not_fatal() {
    let source = Arc::new(MemorySource::new("mysql").with_table(
        "notes",
        vec![ColumnDescriptor::new("amount", "INT", true)],
        vec![vec![RawValue::Text("not-a-number".into())]],
    ));
    let target = Arc::new(MemoryStore::new());
    let config = Config::for_tables(["notes"]);

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    assert_eq!(report.tables[0].status, TableStatus::Success);
    let docs = target.open("notes").documents();
    assert_eq!(
        docs[0].get("amount"),
        Some(&DocValue::String("not-a-number".into()))
    );

    let snap = log.snapshot();
    let written = snap
        .iter()
        .find(|e| e.event == EventKind::BatchWritten)
        .unwrap();
    let fallbacks = written.detail["fallbacks"].as_array().unwrap();
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0]["column"], "amount");
    assert_eq!(fallbacks[0]["expected_kind"], "integer");
}

#[tokio::test]
async fn progress_is_reported_after_each_batch() {
    let source = Arc::new(
        MemorySource::new("postgres").with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    let config = config_with_batch_size(&["users"], 2);

    let seen: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();

    let orchestrator = Orchestrator::new(source, target, config)
        .unwrap()
        .with_progress_sink(move |p: &Progress| {
            sink_seen.lock().unwrap().push(p.clone());
        });
    orchestrator.run(None).await;

    let updates = seen.lock().unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].rows_processed, 2);
    assert_eq!(updates[1].rows_processed, 3);
    assert!(updates.windows(2).all(|w| w[0].rows_processed <= w[1].rows_processed));
    assert_eq!(updates[0].rows_total, Some(3));
    assert_eq!(updates[0].table, "users");
}

#[tokio::test]
async fn collection_override_redirects_documents() {
    let source = Arc::new(
        MemorySource::new("mssql").with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    let mut config = Config::for_tables(["users"]);
    config
        .migration
        .collection_overrides
        .insert("users".into(), "app_users".into());

    let orchestrator = Orchestrator::new(source, target.clone(), config).unwrap();
    orchestrator.run(None).await;

    assert_eq!(target.open("app_users").documents().len(), 3);
    assert!(target.open("users").documents().is_empty());
}

#[tokio::test]
async fn cancellation_still_yields_one_result_per_table() {
    let source = Arc::new(
        MemorySource::new("mssql")
            .with_table("a", users_columns(), users_rows())
            .with_table("b", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    let config = Config::for_tables(["a", "b"]);

    let (tx, rx) = watch::channel(true);
    let orchestrator = Orchestrator::new(source, target, config).unwrap();
    let report = orchestrator.run(Some(rx)).await;
    drop(tx);

    assert!(report.cancelled);
    assert_eq!(report.tables.len(), 2);
    assert!(report
        .tables
        .iter()
        .all(|t| t.status == TableStatus::Failed));
}

#[tokio::test]
async fn log_export_is_self_contained_json() {
    let source = Arc::new(
        MemorySource::new("sqlite").with_table("users", users_columns(), users_rows()),
    );
    let target = Arc::new(MemoryStore::new());
    let config = Config::for_tables(["users"]);

    let orchestrator = Orchestrator::new(source, target, config).unwrap();
    let log = orchestrator.log_handle();
    let report = orchestrator.run(None).await;

    let exported: serde_json::Value = serde_json::from_str(&log.to_json().unwrap()).unwrap();
    let entries = exported.as_array().unwrap();
    assert!(!entries.is_empty());
    for entry in entries {
        assert!(entry["timestamp"].is_string());
        assert_eq!(entry["table"], "users");
        assert!(entry["detail"].is_object());
    }

    // The run report also round-trips through JSON.
    let report_json: serde_json::Value =
        serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(report_json["tables"][0]["status"], "success");
}
