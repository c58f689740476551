//! Health check endpoints.

use axum::{extract::State, http::StatusCode};
use tracing::warn;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Pings the database (or, without one, reads the catalog from the
/// configured store). Returns 503 Service Unavailable if that fails.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let ready = match state.pg() {
        Some(pg) => sqlx::query("SELECT 1")
            .fetch_one(pg.pool())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
        None => state
            .products()
            .list_products()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
    };

    match ready {
        Ok(()) => StatusCode::OK,
        Err(error) => {
            warn!(%error, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
