/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "database": "connected" }
/// ```
///
/// Always answers 200; a failed or slow database check reports
/// `"degraded"` / `"disconnected"`.

use crate::app::AppState;
use axum::{extract::State, Json};
use grocer_shared::db::pool;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the database check
const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = matches!(
        tokio::time::timeout(CHECK_TIMEOUT, pool::health_check(&state.db)).await,
        Ok(Ok(()))
    );

    if !connected {
        tracing::warn!("Health check could not reach the database");
    }

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: grocer_shared::VERSION.to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
