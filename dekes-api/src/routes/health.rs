/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {"status": "healthy", "version": "0.1.0", "database": "connected"}
/// ```
///
/// Always answers 200; a failed database probe reports `degraded`.

use crate::app::AppState;
use axum::{extract::State, Json};
use dekes_shared::db::pool::ping;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match ping(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health probe failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
