//! Log service end to end: protocol clients, `/info`, and discovery.

#![allow(clippy::unwrap_used)]

use drover_store::{
    discover_service, LogLevel, LogService, LogServiceConfig, NewLogRecord, NewSession,
    RemoteStore, SessionContext, SessionStatus,
};
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

// Test ports live far from the conventional range so parallel test
// binaries and real services do not collide.
const PORT_A: u16 = 38091;
const PORT_B: u16 = 38095;

#[tokio::test]
async fn remote_client_full_roundtrip() {
    let dir = TempDir::new().unwrap();
    let config = LogServiceConfig::new(dir.path().join("svc.db")).with_port(PORT_A);
    let service = LogService::start(config).await.unwrap();

    let client = RemoteStore::connect(format!("127.0.0.1:{PORT_A}"))
        .await
        .unwrap();

    let id = client.open_session(session("deploy")).await.unwrap();
    client
        .submit_record(NewLogRecord::message(
            id,
            "node-web-01",
            LogLevel::Warn,
            "[node-web-01] careful",
        ))
        .await
        .unwrap();
    client.end_session(id, SessionStatus::Completed).await.unwrap();

    let records = client.logs_by_node(id, "node-web-01").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, LogLevel::Warn);

    let summary = client.summary(id).await.unwrap();
    assert_eq!(summary.session.status, SessionStatus::Completed);
    assert_eq!(summary.warn_count, 1);

    assert_eq!(client.latest_session_id().await.unwrap(), Some(id));
    assert_eq!(
        client.nodes_in_session(id).await.unwrap(),
        vec!["node-web-01"]
    );

    service.stop().await.unwrap();
}

#[tokio::test]
async fn info_endpoint_reports_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("svc.db");
    let config = LogServiceConfig::new(&db_path).with_port(PORT_B);
    let service = LogService::start(config).await.unwrap();

    let url = format!("http://127.0.0.1:{}/info", PORT_B - 200);
    let info: drover_store::ServiceInfo =
        reqwest::get(&url).await.unwrap().json().await.unwrap();

    assert_eq!(info.server, "drover-log-service");
    assert_eq!(info.port, PORT_B);
    assert_eq!(info.http_port, PORT_B - 200);
    assert!(info.db_path.ends_with("svc.db"));
    assert_eq!(info.db_file, "svc.db");
    assert_eq!(info.session_count, 0);

    // Discovery over a range containing the service finds it...
    let found = discover_service(&db_path, PORT_B - 2..=PORT_B + 2).await;
    assert_eq!(found.unwrap().port, PORT_B);

    // ...and a different database matches nothing, scan completing cleanly.
    let other = dir.path().join("other.db");
    assert!(discover_service(&other, PORT_B - 2..=PORT_B + 2)
        .await
        .is_none());

    service.stop().await.unwrap();
}

#[tokio::test]
async fn malformed_request_gets_error_response() {
    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::{Framed, LinesCodec};

    let dir = TempDir::new().unwrap();
    let config = LogServiceConfig::new(dir.path().join("svc.db")).with_port(38099);
    let service = LogService::start(config).await.unwrap();

    let stream = tokio::net::TcpStream::connect("127.0.0.1:38099").await.unwrap();
    let mut framed = Framed::new(stream, LinesCodec::new());
    framed.send("{not json".to_string()).await.unwrap();

    let line = framed.next().await.unwrap().unwrap();
    assert!(line.contains("\"status\":\"error\""));

    service.stop().await.unwrap();
}
