//! Merging databases renumbers sessions and deduplicates on request.

#![allow(clippy::unwrap_used)]

use drover_store::{
    merge_into, LogLevel, LogStore, MergeOptions, NewLogRecord, NewSession, SessionContext,
    SessionStatus,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn session(workflow: &str) -> NewSession {
    NewSession {
        workflow_name: workflow.to_string(),
        overlay_name: None,
        inventory_name: None,
        node_count: 1,
        context: SessionContext::default(),
    }
}

async fn populate(path: &PathBuf, workflow: &str, records: usize) {
    let store = LogStore::open(path).await.unwrap();
    let id = store.open_session(session(workflow)).await.unwrap();
    for i in 0..records {
        store
            .submit_record(NewLogRecord::message(
                id,
                "cli",
                LogLevel::Info,
                format!("record {i}"),
            ))
            .await
            .unwrap();
    }
    store.end_session(id, SessionStatus::Completed).await.unwrap();
    store.close().await.unwrap();
}

#[tokio::test]
async fn merge_renumbers_sessions() {
    let dir = TempDir::new().unwrap();
    let source_a = dir.path().join("a.db");
    let source_b = dir.path().join("b.db");
    let target = dir.path().join("merged.db");

    populate(&source_a, "deploy", 3).await;
    populate(&source_b, "provision", 2).await;

    let report = merge_into(
        &target,
        &[source_a.clone(), source_b.clone()],
        &MergeOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.sessions_merged, 2);
    assert_eq!(report.records_copied, 5);

    let merged = LogStore::open(&target).await.unwrap();
    let sessions = merged.reader().list_sessions(10).await.unwrap();
    assert_eq!(sessions.len(), 2);
    // Renumbered: distinct ids 1 and 2 in the target.
    let mut ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
    merged.close().await.unwrap();
}

#[tokio::test]
async fn merge_skip_duplicates_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("src.db");
    let target = dir.path().join("merged.db");

    populate(&source, "deploy", 4).await;

    let options = MergeOptions {
        dry_run: false,
        skip_duplicates: true,
    };

    let first = merge_into(&target, &[source.clone()], &options).await.unwrap();
    assert_eq!(first.sessions_merged, 1);

    let second = merge_into(&target, &[source.clone()], &options).await.unwrap();
    assert_eq!(second.sessions_merged, 0);
    assert_eq!(second.sessions_skipped, 1);

    let merged = LogStore::open(&target).await.unwrap();
    assert_eq!(merged.reader().session_count().await.unwrap(), 1);
    merged.close().await.unwrap();
}

#[tokio::test]
async fn merge_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("src.db");
    let target = dir.path().join("merged.db");

    populate(&source, "deploy", 2).await;

    let report = merge_into(
        &target,
        &[source],
        &MergeOptions {
            dry_run: true,
            skip_duplicates: false,
        },
    )
    .await
    .unwrap();
    assert_eq!(report.sessions_merged, 1);
    assert_eq!(report.records_copied, 2);

    let merged = LogStore::open(&target).await.unwrap();
    assert_eq!(merged.reader().session_count().await.unwrap(), 0);
    merged.close().await.unwrap();
}

#[tokio::test]
async fn merge_missing_source_fails_early() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("merged.db");

    let result = merge_into(
        &target,
        &[dir.path().join("missing.db")],
        &MergeOptions::default(),
    )
    .await;
    assert!(result.is_err());
}
