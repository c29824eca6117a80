//! Admin API: route registration, listing and listener control over HTTP.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::error::{GatewayError, Result};
use crate::http::Gateway;

#[derive(Clone)]
pub struct AdminState {
    pub gateway: Arc<Gateway>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(gateway: Arc<Gateway>, api_key: &str) -> Self {
        Self {
            gateway,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(list_routes).post(add_route).put(upsert_route))
        .route("/admin/listen", post(listen))
        .route("/admin/stop", post(stop))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the admin API on `bind_address` and serve it until `shutdown` resolves.
pub async fn serve<F>(state: AdminState, bind_address: &str, shutdown: F) -> Result<SocketAddr>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listen_failed = |source| GatewayError::ListenFailed {
        address: bind_address.to_string(),
        source,
    };
    let listener = TcpListener::bind(bind_address).await.map_err(listen_failed)?;
    let address = listener.local_addr().map_err(listen_failed)?;
    let router = setup_admin_router(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown).await {
            tracing::error!(error = %e, "Admin API failed");
        }
        tracing::info!("Admin API stopped");
    });

    tracing::info!(address = %address, "Admin API listening");
    Ok(address)
}
