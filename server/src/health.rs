//! Health check endpoints.
//!
//! Provides endpoints for monitoring service health and readiness.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Health check endpoint.
///
/// Returns 200 OK if the service is running.
/// This is a simple liveness check - it doesn't verify dependencies.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Equipment storage reachable
    pub equipment_store: bool,
    /// Reservation storage reachable
    pub reservation_store: bool,
}

/// Readiness check endpoint.
///
/// Returns 200 OK once both stores answer a probe, 503 otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"ready":true,"equipment_store":true,"reservation_store":true}
/// ```
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let (equipment, reservations) = tokio::join!(
        state.equipment_store.ping(),
        state.reservation_store.ping()
    );

    if let Err(e) = &equipment {
        tracing::warn!(error = %e, "Equipment store not ready");
    }
    if let Err(e) = &reservations {
        tracing::warn!(error = %e, "Reservation store not ready");
    }

    let response = ReadinessResponse {
        ready: equipment.is_ok() && reservations.is_ok(),
        equipment_store: equipment.is_ok(),
        reservation_store: reservations.is_ok(),
    };
    let status = if response.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
