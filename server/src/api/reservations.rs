//! Reservation endpoints.
//!
//! - POST   /reservations              - Submit a reservation
//! - GET    /reservations              - List with filters (admin)
//! - GET    /reservations/mine         - Caller's own reservations
//! - GET    /reservations/pending      - Pending reservations (admin)
//! - GET    /reservations/approved     - Approved reservations (admin)
//! - GET    /reservations/rejected     - Rejected reservations (admin)
//! - GET    /reservations/stats        - Counts by status (admin)
//! - GET    /reservations/:id          - Read one
//! - PUT    /reservations/:id          - Edit (owner or admin)
//! - DELETE /reservations/:id          - Delete (owner or admin)
//! - PATCH  /reservations/:id/status   - Approve or reject (admin)
//! - POST   /reservations/:id/process  - Re-run the admission check and decide (admin)

#![allow(clippy::missing_errors_doc)]

use crate::api::{DataResponse, MessageResponse};
use crate::auth::{AuthUser, RequireReservationManager};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use equipment_booking_core::admission::{
    Decision, ReservationChanges, ReservationQuery, ReservationRequest,
};
use equipment_booking_core::reservations::{ReservationFilter, ReservationStats};
use equipment_booking_core::types::{
    EquipmentId, Reservation, ReservationId, ReservationStatus, TimeRange, UserId,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// One reservation with an outcome message.
#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    /// Human-readable outcome
    pub message: String,
    /// The reservation
    pub reservation: Reservation,
}

/// A list of reservations.
#[derive(Debug, Serialize)]
pub struct ReservationsResponse {
    /// Human-readable outcome
    pub message: String,
    /// Number of reservations returned
    pub count: usize,
    /// The reservations
    pub reservations: Vec<Reservation>,
}

impl From<Vec<Reservation>> for ReservationsResponse {
    fn from(reservations: Vec<Reservation>) -> Self {
        Self {
            message: format!("{} reservation(s) found", reservations.len()),
            count: reservations.len(),
            reservations,
        }
    }
}

/// Query filters for the admin reservation list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationListParams {
    /// Only this equipment
    pub equipment_id: Option<EquipmentId>,
    /// Only this requester
    pub user_id: Option<UserId>,
    /// Only this status
    pub status: Option<ReservationStatus>,
    /// Window start; requires `endDate`
    pub start_date: Option<DateTime<Utc>>,
    /// Window end; requires `startDate`
    pub end_date: Option<DateTime<Utc>>,
    /// Created at or after
    pub created_start: Option<DateTime<Utc>>,
    /// Created at or before
    pub created_end: Option<DateTime<Utc>>,
    /// Drop reservations whose equipment can no longer hold them
    #[serde(default)]
    pub available_only: bool,
}

impl ReservationListParams {
    fn into_query(self) -> Result<ReservationQuery, AppError> {
        let window = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(TimeRange::new(start, end)?),
            (None, None) => None,
            _ => {
                return Err(AppError::validation(
                    "startDate and endDate must be provided together",
                ));
            },
        };
        Ok(ReservationQuery {
            filter: ReservationFilter {
                equipment_id: self.equipment_id,
                user_id: self.user_id,
                status: self.status,
                window,
                created_from: self.created_start,
                created_to: self.created_end,
            },
            available_only: self.available_only,
        })
    }
}

/// Administrator decision body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// `approved` or `rejected`
    pub status: ReservationStatus,
    /// Shown to the requester on rejection
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl DecisionRequest {
    fn into_decision(self) -> Result<Decision, AppError> {
        match self.status {
            ReservationStatus::Approved => Ok(Decision::Approve),
            ReservationStatus::Rejected => Ok(Decision::Reject {
                reason: self.rejection_reason,
            }),
            ReservationStatus::Pending => Err(AppError::validation(
                "status must be either 'approved' or 'rejected'",
            )),
        }
    }
}

fn outcome_message(reservation: &Reservation) -> &'static str {
    match reservation.status {
        ReservationStatus::Pending => "Reservation submitted and awaiting approval",
        ReservationStatus::Approved => "Reservation approved",
        ReservationStatus::Rejected => "Reservation rejected",
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a reservation.
///
/// Capacity conflicts are not errors: the reservation is recorded as
/// `rejected` with a reason and returned with `201 Created`.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/reservations \
///   -H "Authorization: Bearer $TOKEN" \
///   -H "Content-Type: application/json" \
///   -d '{"equipmentId": "...", "startDate": "2025-03-01T09:00:00Z",
///        "endDate": "2025-03-01T10:00:00Z", "quantity": 1}'
/// ```
pub async fn create_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let Json(request) = body?;
    let reservation = state.controller.create_reservation(&user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse {
            message: outcome_message(&reservation).to_string(),
            reservation,
        }),
    ))
}

/// List reservations with filters.
pub async fn list_reservations(
    State(state): State<AppState>,
    RequireReservationManager(_admin): RequireReservationManager,
    params: Result<Query<ReservationListParams>, QueryRejection>,
) -> Result<Json<ReservationsResponse>, AppError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let reservations = state.controller.list_reservations(&query).await?;
    Ok(Json(reservations.into()))
}

/// List the caller's own reservations.
pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ReservationsResponse>, AppError> {
    let reservations = state.controller.list_for_user(user.id).await?;
    Ok(Json(reservations.into()))
}

async fn list_in(
    state: &AppState,
    status: ReservationStatus,
) -> Result<Json<ReservationsResponse>, AppError> {
    let reservations = state.controller.list_by_status(status).await?;
    Ok(Json(reservations.into()))
}

/// List pending reservations.
pub async fn list_pending(
    State(state): State<AppState>,
    RequireReservationManager(_admin): RequireReservationManager,
) -> Result<Json<ReservationsResponse>, AppError> {
    list_in(&state, ReservationStatus::Pending).await
}

/// List approved reservations.
pub async fn list_approved(
    State(state): State<AppState>,
    RequireReservationManager(_admin): RequireReservationManager,
) -> Result<Json<ReservationsResponse>, AppError> {
    list_in(&state, ReservationStatus::Approved).await
}

/// List rejected reservations.
pub async fn list_rejected(
    State(state): State<AppState>,
    RequireReservationManager(_admin): RequireReservationManager,
) -> Result<Json<ReservationsResponse>, AppError> {
    list_in(&state, ReservationStatus::Rejected).await
}

/// Reservation counts by status.
pub async fn reservation_stats(
    State(state): State<AppState>,
    RequireReservationManager(_admin): RequireReservationManager,
) -> Result<Json<DataResponse<ReservationStats>>, AppError> {
    let stats = state.controller.stats().await?;
    Ok(Json(DataResponse::new("Reservation statistics", stats)))
}

/// Read one reservation.
pub async fn get_reservation(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.controller.get_reservation(id).await?;
    Ok(Json(ReservationResponse {
        message: "Reservation found".to_string(),
        reservation,
    }))
}

/// Edit a reservation.
///
/// Under auto-decide the admission check runs again and may change the
/// status; under manual approval only pending reservations can be edited.
pub async fn update_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<ReservationId>,
    body: Result<Json<ReservationChanges>, JsonRejection>,
) -> Result<Json<ReservationResponse>, AppError> {
    let Json(changes) = body?;
    let reservation = state.controller.update_reservation(&user, id, changes).await?;
    Ok(Json(ReservationResponse {
        message: format!("Reservation updated ({})", reservation.status),
        reservation,
    }))
}

/// Delete a reservation.
pub async fn delete_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<ReservationId>,
) -> Result<Json<MessageResponse>, AppError> {
    state.controller.delete_reservation(&user, id).await?;
    Ok(Json(MessageResponse::new("Reservation deleted")))
}

/// Approve or reject a pending reservation.
///
/// # Example
///
/// ```bash
/// curl -X PATCH http://localhost:8080/reservations/$ID/status \
///   -H "Authorization: Bearer $ADMIN_TOKEN" \
///   -H "Content-Type: application/json" \
///   -d '{"status": "rejected", "rejectionReason": "Maintenance planned"}'
/// ```
pub async fn decide_reservation(
    State(state): State<AppState>,
    RequireReservationManager(admin): RequireReservationManager,
    Path(id): Path<ReservationId>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, AppError> {
    let Json(request) = body?;
    let decision = request.into_decision()?;
    let reservation = state.controller.decide(&admin, id, decision).await?;
    Ok(Json(ReservationResponse {
        message: outcome_message(&reservation).to_string(),
        reservation,
    }))
}

/// Decide a pending reservation from the current admission check.
pub async fn process_reservation(
    State(state): State<AppState>,
    RequireReservationManager(admin): RequireReservationManager,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.controller.process_reservation(&admin, id).await?;
    Ok(Json(ReservationResponse {
        message: "Reservation processed and requester notified".to_string(),
        reservation,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_half_window_is_rejected() {
        let params = ReservationListParams {
            start_date: Some(Utc::now()),
            ..ReservationListParams::default()
        };
        assert!(params.into_query().is_err());
    }

    #[test]
    fn test_params_map_to_filter() {
        let start = Utc::now();
        let params = ReservationListParams {
            start_date: Some(start),
            end_date: Some(start + chrono::Duration::hours(1)),
            available_only: true,
            ..ReservationListParams::default()
        };
        let query = params.into_query().unwrap();
        assert!(query.available_only);
        assert_eq!(query.filter.window.map(|w| w.start()), Some(start));
    }

    #[test]
    fn test_pending_is_not_a_decision() {
        let request = DecisionRequest {
            status: ReservationStatus::Pending,
            rejection_reason: None,
        };
        assert!(request.into_decision().is_err());

        let request = DecisionRequest {
            status: ReservationStatus::Rejected,
            rejection_reason: Some("Maintenance".to_string()),
        };
        assert_eq!(
            request.into_decision().unwrap(),
            Decision::Reject {
                reason: Some("Maintenance".to_string())
            }
        );
    }
}
