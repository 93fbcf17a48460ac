//! Prometheus metrics endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::metrics;
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    update_metrics_from_state(&state);

    match metrics::encode_metrics() {
        Ok(output) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Refresh point-in-time gauges before a scrape.
fn update_metrics_from_state(state: &AppState) {
    let conn_stats = state.connection_manager.stats();
    metrics::CONNECTIONS_TOTAL.set(conn_stats.total_connections as i64);
    metrics::USERS_CONNECTED.set(conn_stats.unique_users as i64);
    metrics::ROOMS_ACTIVE.set(conn_stats.rooms.len() as i64);
}
