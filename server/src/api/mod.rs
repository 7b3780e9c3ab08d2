//! API endpoints for the booking service.
//!
//! This module contains all HTTP API handlers organized by domain:
//! - Reservations: submitting, editing, deciding and listing reservations
//! - Availability: remaining capacity over a window
//! - Equipment: catalog management

pub mod availability;
pub mod equipment;
pub mod reservations;

use serde::Serialize;

pub use availability::check_availability;
pub use equipment::{
    create_equipment, delete_equipment, equipment_stats, get_equipment, list_equipment,
    set_equipment_status, update_equipment,
};
pub use reservations::{
    create_reservation, decide_reservation, delete_reservation, get_reservation,
    list_approved, list_mine, list_pending, list_rejected, list_reservations,
    process_reservation, reservation_stats, update_reservation,
};

/// Acknowledgement with no payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement carrying a payload.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    /// Human-readable outcome
    pub message: String,
    /// Result
    pub data: T,
}

impl<T> DataResponse<T> {
    pub(crate) fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}
