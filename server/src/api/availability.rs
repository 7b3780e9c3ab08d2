//! Availability query endpoint.
//!
//! - GET /reservations/availability?equipmentId=all|<id>&startDate=..&endDate=..

#![allow(clippy::missing_errors_doc)]

use crate::api::DataResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use equipment_booking_core::availability::Availability;
use equipment_booking_core::types::EquipmentId;
use serde::Deserialize;

/// Availability query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityParams {
    /// `all` or an equipment id
    #[serde(default)]
    pub equipment_id: Option<String>,
    /// Window start (inclusive)
    pub start_date: DateTime<Utc>,
    /// Window end (exclusive)
    pub end_date: DateTime<Utc>,
}

/// Which equipment a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every catalog entry
    All,
    /// A single entry
    One(EquipmentId),
}

impl AvailabilityParams {
    fn scope(&self) -> Result<Scope, AppError> {
        match self.equipment_id.as_deref().map(str::trim) {
            None | Some("" | "all") => Ok(Scope::All),
            Some(raw) => raw
                .parse()
                .map(Scope::One)
                .map_err(|_| AppError::validation(format!("equipmentId must be 'all' or a UUID, got '{raw}'"))),
        }
    }
}

/// Remaining capacity of one equipment, or of every equipment, over a window.
///
/// Read-only: repeated calls with the same inputs return the same result.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/reservations/availability?equipmentId=all&startDate=2025-03-01T09:00:00Z&endDate=2025-03-01T12:00:00Z" \
///   -H "Authorization: Bearer $TOKEN"
/// ```
///
/// Response:
/// ```json
/// {
///   "message": "Availability computed",
///   "data": [{
///     "equipmentId": "...",
///     "equipmentName": "Projector",
///     "status": "Available",
///     "unit": "unités",
///     "startDate": "2025-03-01T09:00:00Z",
///     "endDate": "2025-03-01T12:00:00Z",
///     "capacityTotal": 1,
///     "capacityUsed": 0,
///     "capacityAvailable": 1,
///     "available": true,
///     "reason": null
///   }]
/// }
/// ```
pub async fn check_availability(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    params: Result<Query<AvailabilityParams>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<Availability>>>, AppError> {
    let Query(params) = params?;
    let equipment_id = match params.scope()? {
        Scope::All => None,
        Scope::One(id) => Some(id),
    };
    let report = state
        .controller
        .check_availability(equipment_id, params.start_date, params.end_date)
        .await?;
    Ok(Json(DataResponse::new("Availability computed", report)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn params(equipment_id: Option<&str>) -> AvailabilityParams {
        let start = Utc::now();
        AvailabilityParams {
            equipment_id: equipment_id.map(str::to_string),
            start_date: start,
            end_date: start + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!(params(None).scope().unwrap(), Scope::All);
        assert_eq!(params(Some("all")).scope().unwrap(), Scope::All);

        let id = EquipmentId::new();
        assert_eq!(params(Some(&id.to_string())).scope().unwrap(), Scope::One(id));
        assert!(params(Some("projector")).scope().is_err());
    }
}
