//! Log service discovery by port-range scan.

// Layer 1: Standard library
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

// Layer 2: Third-party
use reqwest::Client;

// Layer 3: Internal
use super::protocol::ServiceInfo;
use crate::HTTP_PORT_OFFSET;

/// How long one `/info` probe may take before the port counts as closed.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Scan `ports` for a service bound to `db_path`.
///
/// For each port the corresponding HTTP info port is probed; a service
/// matches when its canonicalized `db_path` equals ours. First match
/// wins. Pure read: discovery never starts a server.
pub async fn discover_service(
    db_path: &Path,
    ports: RangeInclusive<u16>,
) -> Option<ServiceInfo> {
    let target = canonical(db_path);
    let client = Client::builder().timeout(PROBE_TIMEOUT).build().ok()?;

    for port in ports {
        let Some(http_port) = port.checked_sub(HTTP_PORT_OFFSET) else {
            continue;
        };
        let url = format!("http://127.0.0.1:{http_port}/info");
        let Ok(response) = client.get(&url).send().await else {
            continue;
        };
        let Ok(info) = response.json::<ServiceInfo>().await else {
            continue;
        };
        if canonical(Path::new(&info.db_path)) == target {
            tracing::debug!(port, db = %info.db_path, "log service matched");
            return Some(info);
        }
    }
    None
}

/// Canonicalize where possible; a not-yet-created database falls back to
/// its textual path.
fn canonical(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
