//! Health check.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use notekeep_db::ConnectionState;

use crate::config::Environment;
use crate::state::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    /// `OK` while the store is connected, `DEGRADED` otherwise.
    pub status: String,
    pub timestamp: chrono::DateTime<Utc>,
    #[schema(value_type = String)]
    pub environment: Environment,
    /// Seconds since the server started.
    pub uptime: f64,
    #[schema(value_type = String)]
    pub database: ConnectionState,
}

/// Liveness and store connection state.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.connection.state();
    Json(HealthResponse {
        success: true,
        status: if database == ConnectionState::Connected {
            "OK"
        } else {
            "DEGRADED"
        }
        .to_string(),
        timestamp: Utc::now(),
        environment: state.environment,
        uptime: state.started_at.elapsed().as_secs_f64(),
        database,
    })
}
