//! The log service process: TCP protocol endpoint plus HTTP `/info`.

// Layer 1: Standard library
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

// Layer 2: Third-party
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};

// Layer 3: Internal
use super::http;
use super::protocol::{Request, Response, ServiceInfo};
use crate::error::StoreError;
use crate::store::LogStore;
use crate::{HTTP_PORT_OFFSET, SERVICE_PORT_BASE};

/// Configuration of one service instance.
#[derive(Debug, Clone)]
pub struct LogServiceConfig {
    /// Database the service owns the writer for.
    pub db_path: PathBuf,

    /// TCP protocol port; the HTTP info port is derived from it.
    pub port: u16,
}

impl LogServiceConfig {
    /// Service on the conventional port for `db_path`.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            port: SERVICE_PORT_BASE,
        }
    }

    /// Override the TCP port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Mutable service-wide bookkeeping shared with the HTTP endpoint.
pub(crate) struct ServiceState {
    pub(crate) port: u16,
    pub(crate) http_port: u16,
    pub(crate) db_path: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) last_activity: Mutex<Instant>,
    pub(crate) active_connections: AtomicI64,
}

impl ServiceState {
    pub(crate) fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub(crate) async fn info(&self, store: &LogStore) -> ServiceInfo {
        let session_count = store.reader().session_count().await.unwrap_or(-1);
        let db_file = PathBuf::from(&self.db_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        ServiceInfo {
            server: "drover-log-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            port: self.port,
            http_port: self.http_port,
            db_path: self.db_path.clone(),
            db_file,
            started_at: self.started_at,
            session_count,
            active_connections: self.active_connections.load(Ordering::Relaxed),
            idle_time_ms: self.last_activity.lock().elapsed().as_millis() as i64,
        }
    }
}

/// A running log service.
///
/// Owns the store (and with it the single writer) for its lifetime.
/// Shutdown order: HTTP endpoint first, then the TCP endpoint, then the
/// writer drains and the store closes.
pub struct LogService {
    store: Arc<LogStore>,
    state: Arc<ServiceState>,
    shutdown: watch::Sender<bool>,
    tcp_task: JoinHandle<()>,
    http_task: JoinHandle<()>,
}

impl LogService {
    /// Open the database and bind both endpoints.
    pub async fn start(config: LogServiceConfig) -> Result<Self, StoreError> {
        let store = LogStore::open(&config.db_path).await?;

        let http_port = config
            .port
            .checked_sub(HTTP_PORT_OFFSET)
            .ok_or_else(|| StoreError::protocol(format!("port {} too low", config.port)))?;

        let tcp_listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        let http_listener = TcpListener::bind(("0.0.0.0", http_port)).await?;

        let db_path = std::fs::canonicalize(&config.db_path)
            .unwrap_or_else(|_| config.db_path.clone())
            .display()
            .to_string();

        let state = Arc::new(ServiceState {
            port: config.port,
            http_port,
            db_path,
            started_at: Utc::now(),
            last_activity: Mutex::new(Instant::now()),
            active_connections: AtomicI64::new(0),
        });

        let (shutdown, _) = watch::channel(false);

        let http_task = tokio::spawn(http::serve(
            http_listener,
            Arc::clone(&state),
            Arc::clone(&store),
            shutdown.subscribe(),
        ));
        let tcp_task = tokio::spawn(accept_loop(
            tcp_listener,
            Arc::clone(&state),
            Arc::clone(&store),
            shutdown.subscribe(),
        ));

        tracing::info!(
            port = state.port,
            http_port = state.http_port,
            db = %state.db_path,
            "log service started"
        );

        Ok(Self {
            store,
            state,
            shutdown,
            tcp_task,
            http_task,
        })
    }

    /// TCP port the service listens on.
    pub fn port(&self) -> u16 {
        self.state.port
    }

    /// HTTP info port.
    pub fn http_port(&self) -> u16 {
        self.state.http_port
    }

    /// Current info body, as `/info` would serve it.
    pub async fn info(&self) -> ServiceInfo {
        self.state.info(&self.store).await
    }

    /// Graceful stop: HTTP first, then TCP, then drain the writer.
    pub async fn stop(self) -> Result<(), StoreError> {
        let _ = self.shutdown.send(true);

        if let Err(error) = self.http_task.await {
            tracing::warn!(%error, "http task join failed");
        }
        if let Err(error) = self.tcp_task.await {
            tracing::warn!(%error, "tcp task join failed");
        }

        self.store.close().await
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<ServiceState>,
    store: Arc<LogStore>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "log service client connected");
                        tokio::spawn(serve_connection(
                            stream,
                            Arc::clone(&state),
                            Arc::clone(&store),
                            shutdown.clone(),
                        ));
                    }
                    Err(error) => {
                        tracing::warn!(%error, "accept failed");
                    }
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    state: Arc<ServiceState>,
    store: Arc<LogStore>,
    mut shutdown: watch::Receiver<bool>,
) {
    state.active_connections.fetch_add(1, Ordering::Relaxed);
    let mut framed = Framed::new(stream, LinesCodec::new());

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            line = framed.next() => line,
        };
        let Some(line) = line else { break };
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                tracing::debug!(%error, "client framing error");
                break;
            }
        };

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(&state, &store, request).await,
            Err(error) => Response::Error {
                message: format!("bad request: {error}"),
            },
        };

        let encoded = match serde_json::to_string(&response) {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::error!(%error, "response encoding failed");
                break;
            }
        };
        if framed.send(encoded).await.is_err() {
            break;
        }
    }

    state.active_connections.fetch_sub(1, Ordering::Relaxed);
}

async fn handle_request(state: &ServiceState, store: &Arc<LogStore>, request: Request) -> Response {
    match request {
        Request::OpenSession { session } => {
            state.touch();
            match store.open_session(session).await {
                Ok(id) => Response::SessionId { id },
                Err(error) => error_response(error),
            }
        }
        Request::AppendRecord { record } => {
            state.touch();
            match store.submit_record(record).await {
                Ok(()) => Response::Ok,
                Err(error) => error_response(error),
            }
        }
        Request::PutNodeResult { result } => match store.submit_node_result(result).await {
            Ok(()) => Response::Ok,
            Err(error) => error_response(error),
        },
        Request::EndSession { session_id, status } => {
            match store.end_session(session_id, status).await {
                Ok(()) => Response::Ok,
                Err(error) => error_response(error),
            }
        }
        Request::Flush => match store.flush().await {
            Ok(()) => Response::Ok,
            Err(error) => error_response(error),
        },
        Request::LatestSessionId => match store.reader().latest_session_id().await {
            Ok(id) => Response::MaybeSessionId { id },
            Err(error) => error_response(error),
        },
        Request::ListSessions { limit } => match store.reader().list_sessions(limit).await {
            Ok(sessions) => Response::Sessions { sessions },
            Err(error) => error_response(error),
        },
        Request::ListSessionsFiltered { filter } => {
            match store.reader().list_sessions_filtered(&filter).await {
                Ok(sessions) => Response::Sessions { sessions },
                Err(error) => error_response(error),
            }
        }
        Request::Summary { session_id } => match store.reader().summary(session_id).await {
            Ok(summary) => Response::Summary {
                summary: Box::new(summary),
            },
            Err(error) => error_response(error),
        },
        Request::LogsByNode {
            session_id,
            node_id,
        } => match store.reader().logs_by_node(session_id, &node_id).await {
            Ok(records) => Response::Records { records },
            Err(error) => error_response(error),
        },
        Request::LogsByLevel {
            session_id,
            min_level,
        } => match store.reader().logs_by_level(session_id, min_level).await {
            Ok(records) => Response::Records { records },
            Err(error) => error_response(error),
        },
        Request::LogsInSession { session_id } => {
            match store.reader().logs_in_session(session_id).await {
                Ok(records) => Response::Records { records },
                Err(error) => error_response(error),
            }
        }
        Request::NodesInSession { session_id } => {
            match store.reader().nodes_in_session(session_id).await {
                Ok(nodes) => Response::Nodes { nodes },
                Err(error) => error_response(error),
            }
        }
        Request::NodeResults { session_id } => {
            match store.reader().node_results(session_id).await {
                Ok(results) => Response::NodeResults { results },
                Err(error) => error_response(error),
            }
        }
        Request::Info => Response::Info {
            info: Box::new(state.info(store).await),
        },
    }
}

fn error_response(error: StoreError) -> Response {
    Response::Error {
        message: error.to_string(),
    }
}
