//! HTTP `/info` endpoint.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;

// Layer 3: Internal
use super::protocol::ServiceInfo;
use super::server::ServiceState;
use crate::store::LogStore;

#[derive(Clone)]
struct HttpContext {
    state: Arc<ServiceState>,
    store: Arc<LogStore>,
}

/// Serve `/info` until the shutdown signal flips.
pub(crate) async fn serve(
    listener: TcpListener,
    state: Arc<ServiceState>,
    store: Arc<LogStore>,
    mut shutdown: watch::Receiver<bool>,
) {
    let router = Router::new()
        .route("/info", get(info))
        .with_state(HttpContext { state, store });

    let served = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = shutdown.changed().await;
    });

    if let Err(error) = served.await {
        tracing::error!(%error, "http endpoint failed");
    }
}

async fn info(State(ctx): State<HttpContext>) -> Json<ServiceInfo> {
    Json(ctx.state.info(&ctx.store).await)
}
