//! Router configuration for the booking service.
//!
//! Builds the complete Axum router with all endpoints.

use crate::api::{availability, equipment, reservations};
use crate::health::{health_check, readiness_check};
use crate::state::AppState;
use axum::{
    Router,
    http::HeaderName,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the complete Axum router.
///
/// Configures:
/// - Health checks (no authentication)
/// - Reservation endpoints
/// - Availability queries
/// - Equipment catalog endpoints
///
/// Every response carries an `x-request-id` header, generated when the
/// client did not send one.
pub fn build_router(state: AppState) -> Router {
    let reservation_routes = Router::new()
        .route(
            "/",
            post(reservations::create_reservation).get(reservations::list_reservations),
        )
        .route("/mine", get(reservations::list_mine))
        .route("/pending", get(reservations::list_pending))
        .route("/approved", get(reservations::list_approved))
        .route("/rejected", get(reservations::list_rejected))
        .route("/stats", get(reservations::reservation_stats))
        .route("/availability", get(availability::check_availability))
        .route(
            "/:id",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route("/:id/status", patch(reservations::decide_reservation))
        .route("/:id/process", post(reservations::process_reservation));

    let equipment_routes = Router::new()
        .route(
            "/",
            post(equipment::create_equipment).get(equipment::list_equipment),
        )
        .route("/stats", get(equipment::equipment_stats))
        .route(
            "/:id",
            get(equipment::get_equipment)
                .put(equipment::update_equipment)
                .delete(equipment::delete_equipment),
        )
        .route("/:id/status", patch(equipment::set_equipment_status));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/reservations", reservation_routes)
        .nest("/equipment", equipment_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
