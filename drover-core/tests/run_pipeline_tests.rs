//! Whole-pipeline runs against localhost inventories.

#![allow(clippy::unwrap_used)]

use drover_core::{execute_run, RunOptions};
use drover_store::{LogReader, NodeStatus, SessionStatus};
use tempfile::TempDir;

const LINEAR: &str = r#"
name: linear
description: two hops then done
transitions:
  - states: ["0", "1"]
    actions:
      - actor: subWorkflow
        method: doNothing
    note: warm up
  - states: ["1", "end"]
    actions:
      - actor: subWorkflow
        method: doNothing
"#;

fn options(dir: &TempDir, workflow: &str) -> RunOptions {
    let mut options = RunOptions::new(dir.path(), workflow);
    options.quiet = true;
    options.log_db = Some(dir.path().join("run.db"));
    options
}

#[tokio::test]
async fn linear_workflow_on_one_node() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("linear.yaml"), LINEAR).unwrap();

    let outcome = execute_run(options(&dir, "linear.yaml")).await.unwrap();
    assert!(outcome.success, "{}", outcome.reason);
    let session = outcome.session_id.unwrap();

    let reader = LogReader::open(dir.path().join("run.db")).await.unwrap();

    let summary = reader.summary(session).await.unwrap();
    assert_eq!(summary.session.status, SessionStatus::Completed);
    assert_eq!(summary.nodes_total, 1);
    assert_eq!(summary.nodes_success, 1);

    let records = reader.logs_by_node(session, "node-localhost").await.unwrap();
    let transitions: Vec<&str> = records
        .iter()
        .filter(|record| record.message.starts_with("Transition "))
        .map(|record| record.message.as_str())
        .collect();
    assert_eq!(
        transitions,
        vec!["Transition 0->1: SUCCESS", "Transition 1->end: SUCCESS"]
    );

    let results = reader.node_results(session).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].node_id, "node-localhost");
    assert_eq!(results[0].status, NodeStatus::Success);
}

#[tokio::test]
async fn missing_workflow_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let result = execute_run(options(&dir, "ghost.yaml")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn parse_failure_fails_the_session() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.yaml"), "transitions: [\n").unwrap();

    let outcome = execute_run(options(&dir, "broken.yaml")).await.unwrap();
    assert!(!outcome.success);

    let reader = LogReader::open(dir.path().join("run.db")).await.unwrap();
    let summary = reader.summary(outcome.session_id.unwrap()).await.unwrap();
    assert_eq!(summary.session.status, SessionStatus::Failed);
}

#[tokio::test]
async fn parallel_fan_out_aggregates_partial_failure() {
    let dir = TempDir::new().unwrap();

    // Three loopback "hosts"; all run locally under distinct node names.
    std::fs::write(
        dir.path().join("hosts.ini"),
        "localhost\n127.0.0.1\n::1\n",
    )
    .unwrap();

    // The first transition is only eligible on node-127.0.0.1 and fails
    // there; every other node takes the fallback and succeeds.
    std::fs::write(
        dir.path().join("split.yaml"),
        r#"
name: split
transitions:
  - states: ["0", "doomed"]
    guards:
      - actor: node
        method: getNode
        expect: "node-127.0.0.1"
    actions:
      - actor: node
        method: run
        arguments: ["echo boom 1>&2; exit 7"]
  - states: ["0", "end"]
    actions:
      - actor: subWorkflow
        method: doNothing
"#,
    )
    .unwrap();

    let outcome = execute_run(options(&dir, "split.yaml")).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.reason.contains("1 of 3 nodes failed"), "{}", outcome.reason);
    assert!(outcome.reason.contains("node-127.0.0.1"));

    let reader = LogReader::open(dir.path().join("run.db")).await.unwrap();
    let session = outcome.session_id.unwrap();

    let results = reader.node_results(session).await.unwrap();
    assert_eq!(results.len(), 3);
    let failed: Vec<&str> = results
        .iter()
        .filter(|result| result.status == NodeStatus::Failed)
        .map(|result| result.node_id.as_str())
        .collect();
    assert_eq!(failed, vec!["node-127.0.0.1"]);

    let summary = reader.summary(session).await.unwrap();
    assert_eq!(summary.session.status, SessionStatus::Failed);
    assert_eq!(summary.nodes_success, 2);
    assert_eq!(summary.nodes_failed, 1);
}

#[tokio::test]
async fn host_limit_restricts_and_rejects_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hosts.ini"), "localhost\n127.0.0.1\n").unwrap();
    std::fs::write(
        dir.path().join("noop.yaml"),
        "transitions:\n  - states: [\"0\", \"end\"]\n",
    )
    .unwrap();

    let mut limited = options(&dir, "noop.yaml");
    limited.limit = Some("localhost".to_string());
    let outcome = execute_run(limited).await.unwrap();
    assert!(outcome.success, "{}", outcome.reason);

    let reader = LogReader::open(dir.path().join("run.db")).await.unwrap();
    let results = reader
        .node_results(outcome.session_id.unwrap())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].node_id, "node-localhost");

    // An empty intersection is a hard failure and creates no nodes.
    let mut empty = options(&dir, "noop.yaml");
    empty.limit = Some("mars-01".to_string());
    let outcome = execute_run(empty).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.reason.contains("matches no inventory host"));
}

#[tokio::test]
async fn file_log_receives_prefixed_output() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("say.yaml"),
        r#"
name: say
transitions:
  - states: ["0", "end"]
    actions:
      - actor: node
        method: run
        arguments: ["echo from-the-node"]
"#,
    )
    .unwrap();

    let mut with_file = options(&dir, "say.yaml");
    with_file.file_log = Some(dir.path().join("run.out"));
    let outcome = execute_run(with_file).await.unwrap();
    assert!(outcome.success, "{}", outcome.reason);

    let written = std::fs::read_to_string(dir.path().join("run.out")).unwrap();
    assert!(written.contains("[node-localhost] from-the-node"));
}
