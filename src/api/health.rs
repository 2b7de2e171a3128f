//! Liveness and database diagnostics.

use std::time::Duration;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::db;
use crate::AppState;

/// Upper bound on the database probe; the pool's acquire timeout is far longer.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database_status: &'static str,
    pub database_type: &'static str,
    pub timestamp: String,
}

/// GET /health - Always 200; a failed database probe only degrades the status.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = tokio::time::timeout(PROBE_TIMEOUT, db::ping(state.repo.pool())).await;

    let (status, database_status) = match probe {
        Ok(Ok(())) => ("healthy", "connected"),
        Ok(Err(e)) => {
            tracing::warn!("Health probe failed: {}", e);
            ("degraded", "disconnected")
        }
        Err(_) => {
            tracing::warn!("Health probe timed out after {:?}", PROBE_TIMEOUT);
            ("degraded", "disconnected")
        }
    };

    Json(HealthResponse {
        status,
        database_status,
        database_type: state.config.database.kind(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
