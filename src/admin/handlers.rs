use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::admin::AdminState;
use crate::error::GatewayError;
use crate::http::GatewayState;
use crate::routing::RouteSummary;

#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub version: String,
    pub state: GatewayState,
    pub address: Option<SocketAddr>,
    pub routes: usize,
    pub active_connections: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteRequest {
    pub method: String,
    #[serde(default)]
    pub path: String,
    pub target: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListenRequest {
    pub host: String,
    pub port: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListenResponse {
    pub address: SocketAddr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertResponse {
    pub replaced: bool,
}

/// JSON error body with a status matching the error kind.
pub struct AdminError(GatewayError);

impl From<GatewayError> for AdminError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            GatewayError::InvalidTarget { .. } | GatewayError::InvalidMethod(_) | GatewayError::InvalidPort(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::AlreadyRunning(_) => StatusCode::CONFLICT,
            GatewayError::ListenFailed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<GatewayStatus> {
    let gateway = &state.gateway;
    Json(GatewayStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        state: gateway.state().await,
        address: gateway.local_addr().await,
        routes: gateway.route_table().len(),
        active_connections: gateway.active_connections(),
    })
}

pub async fn list_routes(State(state): State<AdminState>) -> Json<Vec<RouteSummary>> {
    Json(state.gateway.routes().iter().map(|r| r.summary()).collect())
}

pub async fn add_route(
    State(state): State<AdminState>,
    Json(request): Json<RouteRequest>,
) -> Result<(StatusCode, Json<RouteSummary>), AdminError> {
    let route = state.gateway.add_route(&request.method, &request.path, &request.target)?;
    Ok((StatusCode::CREATED, Json(route.summary())))
}

pub async fn upsert_route(
    State(state): State<AdminState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<UpsertResponse>, AdminError> {
    let replaced = state
        .gateway
        .upsert_route(&request.method, &request.path, &request.target)?;
    Ok(Json(UpsertResponse { replaced }))
}

pub async fn listen(
    State(state): State<AdminState>,
    Json(request): Json<ListenRequest>,
) -> Result<Json<ListenResponse>, AdminError> {
    let address = state.gateway.listen(&request.host, request.port).await?;
    Ok(Json(ListenResponse { address }))
}

pub async fn stop(State(state): State<AdminState>) -> Result<Json<serde_json::Value>, AdminError> {
    state.gateway.stop().await?;
    Ok(Json(serde_json::json!({ "state": "stopped" })))
}
