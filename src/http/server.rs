//! Gateway server: route table ownership, listener lifecycle, request dispatch.
//!
//! # Responsibilities
//! - Own the route table and expose route registration
//! - Start and stop the client listener (`Stopped` ⇄ `Listening`)
//! - Read each request head and dispatch it: lookup, then 404 or forward
//! - Turn every per-request failure into an HTTP response
//!
//! # Design Decisions
//! - One request per client connection; the socket is closed afterwards
//! - `stop` stops accepting and releases the port but does not wait for
//!   in-flight requests
//! - Dropping a listening gateway forces it to stop

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::http::forward::Forwarder;
use crate::http::request::{read_request_head, InboundRequest};
use crate::http::response::write_error;
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::Listener;
use crate::observability::metrics;
use crate::routing::{Route, RouteTable};

/// Tunables for the client-facing side of the gateway.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub max_connections: usize,
    pub max_header_bytes: usize,
    pub connect_timeout: Option<Duration>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

impl From<&GatewayConfig> for ServerSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            max_connections: config.listener.max_connections,
            max_header_bytes: config.listener.max_header_bytes,
            connect_timeout: config.timeouts.connect_secs.map(Duration::from_secs),
        }
    }
}

/// Listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayState {
    Stopped,
    Listening,
}

/// How a single request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Forwarded,
    NoRoute,
    UpstreamUnavailable,
    UpstreamError,
    BadRequest,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Forwarded => "forwarded",
            DispatchOutcome::NoRoute => "no_route",
            DispatchOutcome::UpstreamUnavailable => "upstream_unavailable",
            DispatchOutcome::UpstreamError => "upstream_error",
            DispatchOutcome::BadRequest => "bad_request",
        }
    }
}

struct RunningListener {
    address: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

/// Reverse-proxy gateway with a mutable route table.
pub struct Gateway {
    dispatcher: Dispatcher,
    tracker: ConnectionTracker,
    max_connections: usize,
    listener: Mutex<Option<RunningListener>>,
}

impl Gateway {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            dispatcher: Dispatcher {
                routes: Arc::new(RouteTable::new()),
                forwarder: Forwarder::new(settings.connect_timeout),
                max_header_bytes: settings.max_header_bytes,
            },
            tracker: ConnectionTracker::new(),
            max_connections: settings.max_connections,
            listener: Mutex::new(None),
        }
    }

    /// Register a route and return it as stored. Allowed at any time,
    /// including while listening.
    pub fn add_route(&self, method: &str, path: &str, target: &str) -> Result<Route> {
        let route = self.dispatcher.routes.add(method, path, target)?;
        metrics::set_route_count(self.dispatcher.routes.len());
        Ok(route)
    }

    /// Replace the first route with the same method and path, or append one.
    pub fn upsert_route(&self, method: &str, path: &str, target: &str) -> Result<bool> {
        let replaced = self.dispatcher.routes.upsert(method, path, target)?;
        metrics::set_route_count(self.dispatcher.routes.len());
        Ok(replaced)
    }

    /// Snapshot of registered routes in insertion order.
    pub fn routes(&self) -> Vec<Route> {
        self.dispatcher.routes.list()
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.dispatcher.routes
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    pub async fn state(&self) -> GatewayState {
        match *self.listener.lock().await {
            Some(_) => GatewayState::Listening,
            None => GatewayState::Stopped,
        }
    }

    /// Address of the active listener, if any.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().await.as_ref().map(|l| l.address)
    }

    /// Bind `host:port` and start serving. Returns the bound address.
    pub async fn listen(&self, host: &str, port: i64) -> Result<SocketAddr> {
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or(GatewayError::InvalidPort(port))?;

        let mut running = self.listener.lock().await;
        if let Some(active) = running.as_ref() {
            return Err(GatewayError::AlreadyRunning(active.address));
        }

        let listen_failed = |source| GatewayError::ListenFailed {
            address: format!("{host}:{port}"),
            source,
        };
        let listener = Listener::bind(host, port, self.max_connections)
            .await
            .map_err(listen_failed)?;
        let address = listener.local_addr().map_err(listen_failed)?;

        let shutdown = Shutdown::new();
        let task = tokio::spawn(accept_loop(
            listener,
            self.dispatcher.clone(),
            self.tracker.clone(),
            shutdown.subscribe(),
        ));

        tracing::info!(address = %address, routes = self.dispatcher.routes.len(), "Gateway listening");
        *running = Some(RunningListener { address, shutdown, task });
        Ok(address)
    }

    /// Stop accepting connections and release the port. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        let mut running = self.listener.lock().await;
        if let Some(active) = running.take() {
            active.shutdown.trigger();
            if let Err(e) = active.task.await {
                tracing::warn!(error = %e, "Accept loop ended abnormally");
            }
            tracing::info!(address = %active.address, "Gateway stopped");
        }
        Ok(())
    }

    /// Dispatch one already-parsed request: 404 on a miss, otherwise forward.
    /// Failures are answered on `sink`, never returned.
    pub async fn dispatch<B, W>(&self, request: InboundRequest<B>, sink: &mut W) -> DispatchOutcome
    where
        B: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.dispatcher.dispatch(request, sink).await
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(ServerSettings::default())
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(active) = self.listener.get_mut().take() {
            active.shutdown.trigger();
            active.task.abort();
            tracing::info!(address = %active.address, "Gateway dropped while listening; listener released");
        }
    }
}

/// Per-request handling shared by every connection task.
#[derive(Clone)]
struct Dispatcher {
    routes: Arc<RouteTable>,
    forwarder: Forwarder,
    max_header_bytes: usize,
}

impl Dispatcher {
    async fn serve_connection(&self, mut stream: TcpStream) {
        let started = Instant::now();
        let (mut reader, mut writer) = stream.split();

        match read_request_head(&mut reader, self.max_header_bytes).await {
            Ok(Some((head, buffered))) => {
                let body = Cursor::new(buffered).chain(reader);
                self.dispatch(InboundRequest::new(head, body), &mut writer).await;
            }
            Ok(None) => {
                tracing::debug!("Client closed before sending a request");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting malformed request");
                if let Err(e) = write_error(&mut writer, StatusCode::BAD_REQUEST, "Bad Request").await {
                    tracing::debug!(error = %e, "Failed to write 400 to client");
                }
                metrics::record_request("-", DispatchOutcome::BadRequest.as_str(), started);
            }
        }

        let _ = writer.shutdown().await;
    }

    /// Look up the route and forward, or answer 404. Never fails: every
    /// error ends up as a response written to `sink`.
    async fn dispatch<B, W>(&self, request: InboundRequest<B>, sink: &mut W) -> DispatchOutcome
    where
        B: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let method = request.head.method.to_ascii_uppercase();
        let path = request.head.path.clone();

        let outcome = match self.routes.lookup(&method, &path) {
            None => {
                let err = GatewayError::NoRouteMatch {
                    method: method.clone(),
                    path: path.clone(),
                };
                tracing::warn!(error = %err, "No route matched");
                if let Err(e) = write_error(sink, StatusCode::NOT_FOUND, "Not Found").await {
                    tracing::debug!(error = %e, "Failed to write 404 to client");
                }
                DispatchOutcome::NoRoute
            }
            Some(route) => match self.forwarder.forward(&route, request, sink).await {
                Ok(bytes) => {
                    tracing::info!(
                        method = %method,
                        path = %path,
                        upstream = %route.upstream_authority(),
                        bytes,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Request forwarded"
                    );
                    metrics::record_upstream_bytes(bytes);
                    DispatchOutcome::Forwarded
                }
                Err(e @ GatewayError::UpstreamConnectFailed { .. }) => {
                    tracing::warn!(method = %method, path = %path, error = %e, "Upstream unavailable");
                    DispatchOutcome::UpstreamUnavailable
                }
                Err(e) => {
                    tracing::warn!(method = %method, path = %path, error = %e, "Upstream relay failed");
                    DispatchOutcome::UpstreamError
                }
            },
        };

        metrics::record_request(&method, outcome.as_str(), started);
        outcome
    }
}

async fn accept_loop(
    listener: Listener,
    dispatcher: Dispatcher,
    tracker: ConnectionTracker,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    let guard = tracker.track();
                    let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(
                        async move {
                            let _permit = permit;
                            let _guard = guard;
                            dispatcher.serve_connection(stream).await;
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Accept loop exited");
}
