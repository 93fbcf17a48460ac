//! Health check and statistics endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::connection_manager::ConnectionStats;
use crate::error::Result;
use crate::realtime::DispatcherStatsSnapshot;
use crate::server::AppState;

use super::response::ApiResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealthResponse,
    pub connections: ConnectionHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub backend: String,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealthResponse {
    pub total: usize,
    pub unique_users: usize,
    pub rooms_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: ConnectionStats,
    pub events: DispatcherStatsSnapshot,
}

/// GET /health
///
/// Responds 503 while the store is unreachable.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = state.store.ping().await;
    let conn_stats = state.connection_manager.stats();

    let (code, status) = if connected {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store: StoreHealthResponse {
            backend: state.store.backend_type().to_string(),
            connected,
        },
        connections: ConnectionHealthResponse {
            total: conn_stats.total_connections,
            unique_users: conn_stats.unique_users,
            rooms_count: conn_stats.rooms.len(),
        },
    };
    (code, Json(body))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> Result<ApiResponse<StatsResponse>> {
    auth.require_staff()?;
    Ok(ApiResponse::ok(StatsResponse {
        connections: state.connection_manager.stats(),
        events: state.dispatcher.stats(),
    }))
}
