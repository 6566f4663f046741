//! API handlers for the Mutuelle backend

pub mod auth;
pub mod loan;
pub mod loan_request;
pub mod member;

use axum::{extract::State, http::StatusCode, Json};

use crate::db;
use crate::models::HealthResponse;
use crate::state::AppState;

pub use crate::middleware::{ApiJson, AuthenticatedMember};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match &state.db {
        Some(pool) => match db::check_health(pool).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Health check failed");
                false
            }
        },
        None => true,
    };

    let (code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            storage: state.store.backend_name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
