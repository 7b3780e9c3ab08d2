//! Application state for the booking HTTP server.
//!
//! Contains all shared resources needed by HTTP handlers:
//! - Admission controller (reservation lifecycle)
//! - Catalog service (equipment management)
//! - Token verifier (authentication)
//! - Storage probes (readiness)

use crate::auth::TokenVerifier;
use axum::extract::FromRef;
use equipment_booking_core::admission::AdmissionController;
use equipment_booking_core::catalog::{CatalogService, EquipmentCatalog};
use equipment_booking_core::reservations::ReservationStore;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// It's cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Reservation lifecycle orchestrator
    pub controller: Arc<AdmissionController>,

    /// Equipment management
    pub catalog: CatalogService,

    /// Bearer token verification
    pub tokens: Arc<TokenVerifier>,

    /// Equipment storage, probed by readiness checks
    pub equipment_store: Arc<dyn EquipmentCatalog>,

    /// Reservation storage, probed by readiness checks
    pub reservation_store: Arc<dyn ReservationStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        controller: Arc<AdmissionController>,
        catalog: CatalogService,
        tokens: Arc<TokenVerifier>,
        equipment_store: Arc<dyn EquipmentCatalog>,
        reservation_store: Arc<dyn ReservationStore>,
    ) -> Self {
        Self {
            controller,
            catalog,
            tokens,
            equipment_store,
            reservation_store,
        }
    }
}

// Lets the auth extractors pull the verifier out of any state that carries one
impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for Axum)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
