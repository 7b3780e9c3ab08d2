//! Equipment catalog endpoints.
//!
//! - POST   /equipment             - Create (`manage_system`)
//! - GET    /equipment             - List with `status`, `location`, `type` filters
//! - GET    /equipment/stats       - Counts by status
//! - GET    /equipment/:id         - Read one
//! - PUT    /equipment/:id         - Partial update (`manage_system`)
//! - PATCH  /equipment/:id/status  - Set the operational flag (`manage_system`)
//! - DELETE /equipment/:id         - Delete (`manage_system`)

#![allow(clippy::missing_errors_doc)]

use crate::api::MessageResponse;
use crate::auth::{AuthUser, RequireSystemManager};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
};
use equipment_booking_core::catalog::{EquipmentFilter, EquipmentInput, EquipmentStats};
use equipment_booking_core::types::{Equipment, EquipmentId, EquipmentStatus};
use serde::{Deserialize, Serialize};

/// One equipment with an outcome message.
#[derive(Debug, Serialize)]
pub struct EquipmentResponse {
    /// Human-readable outcome
    pub message: String,
    /// The equipment
    pub equipment: Equipment,
}

impl EquipmentResponse {
    fn new(message: &str, equipment: Equipment) -> Self {
        Self {
            message: message.to_string(),
            equipment,
        }
    }
}

/// A list of equipment.
#[derive(Debug, Serialize)]
pub struct EquipmentListResponse {
    /// Number of entries returned
    pub count: usize,
    /// The entries, ordered by name
    pub equipment: Vec<Equipment>,
}

/// Operational status change body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// New status
    pub status: EquipmentStatus,
}

/// Create an equipment entry.
pub async fn create_equipment(
    State(state): State<AppState>,
    RequireSystemManager(admin): RequireSystemManager,
    body: Result<Json<EquipmentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<EquipmentResponse>), AppError> {
    let Json(input) = body?;
    let equipment = state.catalog.create(&admin, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(EquipmentResponse::new("Equipment created", equipment)),
    ))
}

/// List equipment.
pub async fn list_equipment(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    filter: Result<Query<EquipmentFilter>, QueryRejection>,
) -> Result<Json<EquipmentListResponse>, AppError> {
    let Query(filter) = filter?;
    let equipment = state.catalog.list(&filter).await?;
    Ok(Json(EquipmentListResponse {
        count: equipment.len(),
        equipment,
    }))
}

/// Equipment counts by status.
pub async fn equipment_stats(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
) -> Result<Json<EquipmentStats>, AppError> {
    Ok(Json(state.catalog.stats().await?))
}

/// Read one equipment entry.
pub async fn get_equipment(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<EquipmentId>,
) -> Result<Json<EquipmentResponse>, AppError> {
    let equipment = state.catalog.get(id).await?;
    Ok(Json(EquipmentResponse::new("Equipment found", equipment)))
}

/// Merge and re-validate fields of an equipment entry.
pub async fn update_equipment(
    State(state): State<AppState>,
    RequireSystemManager(admin): RequireSystemManager,
    Path(id): Path<EquipmentId>,
    body: Result<Json<EquipmentInput>, JsonRejection>,
) -> Result<Json<EquipmentResponse>, AppError> {
    let Json(input) = body?;
    let equipment = state.catalog.update(&admin, id, input).await?;
    Ok(Json(EquipmentResponse::new("Equipment updated", equipment)))
}

/// Set the operational status flag.
pub async fn set_equipment_status(
    State(state): State<AppState>,
    RequireSystemManager(admin): RequireSystemManager,
    Path(id): Path<EquipmentId>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<EquipmentResponse>, AppError> {
    let Json(request) = body?;
    let equipment = state.catalog.set_status(&admin, id, request.status).await?;
    Ok(Json(EquipmentResponse::new("Equipment status updated", equipment)))
}

/// Delete an equipment entry. Its reservations are kept.
pub async fn delete_equipment(
    State(state): State<AppState>,
    RequireSystemManager(admin): RequireSystemManager,
    Path(id): Path<EquipmentId>,
) -> Result<Json<MessageResponse>, AppError> {
    state.catalog.delete(&admin, id).await?;
    Ok(Json(MessageResponse::new("Equipment deleted")))
}
