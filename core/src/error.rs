//! Error taxonomy for booking operations.
//!
//! Every failure a caller can observe maps to exactly one [`ErrorCategory`],
//! and every variant carries a stable machine-readable [`code`](BookingError::code).

use crate::types::{Capacity, ReservationStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Coarse classification used by transport layers to choose a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or malformed input
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Operation not allowed in the current lifecycle state
    State,
    /// Capacity or overlap violation
    Conflict,
    /// Missing credentials or insufficient permission
    Auth,
    /// Storage or infrastructure failure
    Internal,
}

/// Errors returned by catalog, availability and admission operations.
#[derive(Debug, Clone, Error)]
pub enum BookingError {
    /// One or more input fields failed validation.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Quantity is not positive or exceeds the equipment's total capacity.
    #[error("invalid quantity {requested}: must be positive and within capacity{}", capacity_suffix(.capacity))]
    InvalidQuantity {
        /// Requested quantity
        requested: i64,
        /// Equipment capacity, when the equipment was resolved
        capacity: Option<Capacity>,
    },

    /// The reservation window is empty or inverted.
    #[error("invalid range: start {start} must be before end {end}")]
    InvalidRange {
        /// Window start
        start: DateTime<Utc>,
        /// Window end
        end: DateTime<Utc>,
    },

    /// An equipment or reservation id could not be resolved.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity kind ("Equipment", "Reservation")
        entity: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// The reservation has already been processed.
    #[error("reservation {id} is {status} and can no longer be modified")]
    InvalidState {
        /// Reservation id
        id: String,
        /// Its current status
        status: ReservationStatus,
    },

    /// Admitting the reservation would exceed capacity.
    #[error("conflict: requested {requested}, available {available} ({reason})")]
    Conflict {
        /// Requested quantity
        requested: u32,
        /// Capacity left by other active reservations
        available: u32,
        /// Human-readable cause
        reason: String,
    },

    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking the required permission or ownership.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

fn capacity_suffix(capacity: &Option<Capacity>) -> String {
    capacity
        .map(|c| format!(" ({} {})", c.value, c.unit))
        .unwrap_or_default()
}

impl BookingError {
    /// Shorthand for a not-found equipment.
    #[must_use]
    pub fn equipment_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Equipment",
            id: id.to_string(),
        }
    }

    /// Shorthand for a not-found reservation.
    #[must_use]
    pub fn reservation_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Reservation",
            id: id.to_string(),
        }
    }

    /// Wraps any storage-layer error.
    #[must_use]
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Conflict { .. } => "CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// Taxonomy class of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::InvalidQuantity { .. } | Self::InvalidRange { .. } => {
                ErrorCategory::Validation
            },
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidState { .. } => ErrorCategory::State,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Unauthorized(_) | Self::Forbidden(_) => ErrorCategory::Auth,
            Self::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// Per-field messages for multi-field validation failures.
    #[must_use]
    pub fn field_errors(&self) -> &[String] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CapacityUnit;

    #[test]
    fn test_validation_lists_every_field() {
        let err = BookingError::Validation(vec![
            "name is required".to_string(),
            "capacity.value must be greater than 0".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: name is required; capacity.value must be greater than 0"
        );
        assert_eq!(err.field_errors().len(), 2);
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_invalid_quantity_message() {
        let err = BookingError::InvalidQuantity {
            requested: 7,
            capacity: Some(Capacity::new(5, CapacityUnit::Units)),
        };
        assert_eq!(
            err.to_string(),
            "invalid quantity 7: must be positive and within capacity (5 unités)"
        );

        let unresolved = BookingError::InvalidQuantity {
            requested: 0,
            capacity: None,
        };
        assert_eq!(unresolved.to_string(), "invalid quantity 0: must be positive and within capacity");
        assert_eq!(err.code(), "INVALID_QUANTITY");
    }

    #[test]
    fn test_not_found_message() {
        let err = BookingError::reservation_not_found("123");
        assert_eq!(err.to_string(), "Reservation with id 123 not found");
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_categories() {
        let state = BookingError::InvalidState {
            id: "r1".to_string(),
            status: ReservationStatus::Approved,
        };
        assert_eq!(state.category(), ErrorCategory::State);
        assert_eq!(state.code(), "INVALID_STATE");
        assert_eq!(BookingError::storage("boom").category(), ErrorCategory::Internal);
        assert_eq!(BookingError::Forbidden("no".into()).category(), ErrorCategory::Auth);
    }
}
