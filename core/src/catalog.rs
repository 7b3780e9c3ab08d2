//! Resource Catalog: equipment definitions.
//!
//! [`EquipmentCatalog`] is the storage seam. [`CatalogService`] layers input
//! validation, timestamps and permission checks on top of it.
//!
//! Input arrives as [`EquipmentInput`], where every field is optional and
//! enums are raw strings. Validation reports *every* failing field at once
//! instead of stopping at the first one.

use crate::clock::Clock;
use crate::error::BookingError;
use crate::identity::{CurrentUser, Permission};
use crate::types::{
    Capacity, CapacityUnit, Equipment, EquipmentId, EquipmentStatus, EquipmentType, Location,
    WeeklySchedule,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Storage seam
// ============================================================================

/// Persistence for equipment records.
///
/// Writes are last-write-wins per record; there is no version check.
#[async_trait]
pub trait EquipmentCatalog: Send + Sync {
    /// Stores a new record.
    async fn insert(&self, equipment: Equipment) -> Result<(), BookingError>;

    /// Reads one record.
    async fn get(&self, id: EquipmentId) -> Result<Option<Equipment>, BookingError>;

    /// Lists records matching `filter`, ordered by name.
    async fn list(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, BookingError>;

    /// Replaces a record. Returns `false` if it does not exist.
    async fn update(&self, equipment: Equipment) -> Result<bool, BookingError>;

    /// Overwrites only the status. Returns `false` if the record does not exist.
    async fn set_status(
        &self,
        id: EquipmentId,
        status: EquipmentStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BookingError>;

    /// Removes a record. Returns `false` if it did not exist.
    async fn delete(&self, id: EquipmentId) -> Result<bool, BookingError>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), BookingError> {
        Ok(())
    }
}

/// Equipment list filter. `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct EquipmentFilter {
    /// Only this status
    pub status: Option<EquipmentStatus>,
    /// Only this location
    pub location: Option<Location>,
    /// Only this type
    #[serde(rename = "type")]
    pub equipment_type: Option<EquipmentType>,
}

impl EquipmentFilter {
    /// Whether `equipment` passes the filter.
    #[must_use]
    pub fn matches(&self, equipment: &Equipment) -> bool {
        self.status.is_none_or(|s| s == equipment.status)
            && self.location.is_none_or(|l| l == equipment.location)
            && self.equipment_type.is_none_or(|t| t == equipment.equipment_type)
    }
}

// ============================================================================
// Input and validation
// ============================================================================

/// Raw capacity as submitted by a client.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CapacityInput {
    /// Must be a positive whole number
    pub value: Option<f64>,
    /// Must be a known [`CapacityUnit`] label
    pub unit: Option<String>,
}

/// Raw equipment fields as submitted by a client.
///
/// Used both for creation (all required fields must be present) and for
/// partial updates (only present fields are validated and merged).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EquipmentInput {
    pub name: Option<String>,
    pub photo: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<CapacityInput>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    pub location: Option<String>,
    pub schedule: Option<WeeklySchedule>,
    pub access_conditions: Option<String>,
    pub status: Option<String>,
}

/// Validated equipment fields, ready to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct NewEquipment {
    pub name: String,
    pub photo: Option<String>,
    pub description: String,
    pub capacity: Capacity,
    pub equipment_type: EquipmentType,
    pub location: Location,
    pub schedule: WeeklySchedule,
    pub access_conditions: String,
    pub status: EquipmentStatus,
}

impl NewEquipment {
    /// Materializes the record with a fresh id.
    #[must_use]
    pub fn into_equipment(self, id: EquipmentId, now: DateTime<Utc>) -> Equipment {
        Equipment {
            id,
            name: self.name,
            photo: self.photo,
            description: self.description,
            capacity: self.capacity,
            equipment_type: self.equipment_type,
            location: self.location,
            schedule: self.schedule,
            access_conditions: self.access_conditions,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Collects per-field errors while parsing an [`EquipmentInput`].
#[derive(Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn text(&mut self, field: &str, value: Option<String>, required: bool) -> Option<String> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Some(v),
            Some(_) => {
                self.0.push(format!("{field} must not be empty"));
                None
            },
            None => {
                if required {
                    self.0.push(format!("{field} is required"));
                }
                None
            },
        }
    }

    fn label<T>(&mut self, field: &str, value: Option<String>, required: bool) -> Option<T>
    where
        T: FromStr<Err = crate::types::UnknownLabel>,
    {
        match value {
            Some(raw) => match raw.parse() {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    self.0.push(format!("{field}: {err}"));
                    None
                },
            },
            None => {
                if required {
                    self.0.push(format!("{field} is required"));
                }
                None
            },
        }
    }

    fn capacity(&mut self, value: Option<CapacityInput>, required: bool) -> Option<CapacityParts> {
        let Some(input) = value else {
            if required {
                self.0.push("capacity.value is required".to_string());
                self.0.push("capacity.unit is required".to_string());
            }
            return None;
        };
        let amount = match input.value {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(v) if v.is_finite() && v.fract() == 0.0 && v >= 1.0 && v <= f64::from(u32::MAX) => {
                Some(v as u32)
            },
            Some(_) => {
                self.0.push("capacity.value must be a positive whole number".to_string());
                None
            },
            None if required => {
                self.0.push("capacity.value is required".to_string());
                None
            },
            None => None,
        };
        let unit = self.label::<CapacityUnit>("capacity.unit", input.unit, required);
        Some(CapacityParts { amount, unit })
    }

    fn finish(self) -> Result<(), BookingError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(BookingError::Validation(self.0))
        }
    }
}

struct CapacityParts {
    amount: Option<u32>,
    unit: Option<CapacityUnit>,
}

impl EquipmentInput {
    /// Validates a full record for creation.
    ///
    /// Status defaults to `Available` and the schedule to closed every day.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] listing every missing or
    /// malformed field.
    pub fn into_new(self) -> Result<NewEquipment, BookingError> {
        let mut errors = FieldErrors::default();
        let name = errors.text("name", self.name, true);
        let description = errors.text("description", self.description, true);
        let access_conditions = errors.text("accessConditions", self.access_conditions, true);
        let capacity = errors.capacity(self.capacity, true);
        let equipment_type = errors.label::<EquipmentType>("type", self.equipment_type, true);
        let location = errors.label::<Location>("location", self.location, true);
        let status = errors.label::<EquipmentStatus>("status", self.status, false);
        errors.finish()?;

        match (name, description, access_conditions, capacity, equipment_type, location) {
            (
                Some(name),
                Some(description),
                Some(access_conditions),
                Some(CapacityParts {
                    amount: Some(value),
                    unit: Some(unit),
                }),
                Some(equipment_type),
                Some(location),
            ) => Ok(NewEquipment {
                name,
                photo: self.photo.filter(|p| !p.trim().is_empty()),
                description,
                capacity: Capacity::new(value, unit),
                equipment_type,
                location,
                schedule: self.schedule.unwrap_or_default(),
                access_conditions,
                status: status.unwrap_or_default(),
            }),
            _ => Err(BookingError::Validation(vec![
                "incomplete equipment definition".to_string(),
            ])),
        }
    }

    /// Validates the present fields and merges them into `equipment`.
    ///
    /// Nothing is modified when any field fails.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] listing every malformed field.
    pub fn apply_to(self, equipment: &mut Equipment) -> Result<(), BookingError> {
        let mut errors = FieldErrors::default();
        let name = errors.text("name", self.name, false);
        let description = errors.text("description", self.description, false);
        let access_conditions = errors.text("accessConditions", self.access_conditions, false);
        let capacity = errors.capacity(self.capacity, false);
        let equipment_type = errors.label::<EquipmentType>("type", self.equipment_type, false);
        let location = errors.label::<Location>("location", self.location, false);
        let status = errors.label::<EquipmentStatus>("status", self.status, false);
        errors.finish()?;

        if let Some(name) = name {
            equipment.name = name;
        }
        if let Some(description) = description {
            equipment.description = description;
        }
        if let Some(access_conditions) = access_conditions {
            equipment.access_conditions = access_conditions;
        }
        if let Some(parts) = capacity {
            if let Some(value) = parts.amount {
                equipment.capacity.value = value;
            }
            if let Some(unit) = parts.unit {
                equipment.capacity.unit = unit;
            }
        }
        if let Some(equipment_type) = equipment_type {
            equipment.equipment_type = equipment_type;
        }
        if let Some(location) = location {
            equipment.location = location;
        }
        if let Some(status) = status {
            equipment.status = status;
        }
        if let Some(schedule) = self.schedule {
            equipment.schedule = schedule;
        }
        if let Some(photo) = self.photo {
            equipment.photo = Some(photo).filter(|p| !p.trim().is_empty());
        }
        Ok(())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Equipment counts by status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EquipmentStats {
    /// Total number of records
    pub total: usize,
    /// Count per status; every status is present
    pub by_status: BTreeMap<EquipmentStatus, usize>,
}

/// Catalog management operations.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn EquipmentCatalog>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Creates a new catalog service.
    #[must_use]
    pub fn new(catalog: Arc<dyn EquipmentCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    /// Validates and stores a new piece of equipment.
    ///
    /// # Errors
    ///
    /// `Forbidden` without `manage_system`, `Validation` on bad input,
    /// `Storage` on backend failure.
    pub async fn create(
        &self,
        actor: &CurrentUser,
        input: EquipmentInput,
    ) -> Result<Equipment, BookingError> {
        actor.require(Permission::ManageSystem)?;
        let equipment = input
            .into_new()?
            .into_equipment(EquipmentId::new(), self.clock.now());
        self.catalog.insert(equipment.clone()).await?;
        info!(equipment_id = %equipment.id, name = %equipment.name, "Equipment created");
        Ok(equipment)
    }

    /// Reads one piece of equipment.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub async fn get(&self, id: EquipmentId) -> Result<Equipment, BookingError> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| BookingError::equipment_not_found(id))
    }

    /// Lists equipment.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn list(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, BookingError> {
        self.catalog.list(filter).await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound`, `Validation` or `Storage`.
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: EquipmentId,
        input: EquipmentInput,
    ) -> Result<Equipment, BookingError> {
        actor.require(Permission::ManageSystem)?;
        let mut equipment = self.get(id).await?;
        input.apply_to(&mut equipment)?;
        equipment.updated_at = self.clock.now();
        if !self.catalog.update(equipment.clone()).await? {
            return Err(BookingError::equipment_not_found(id));
        }
        info!(equipment_id = %id, "Equipment updated");
        Ok(equipment)
    }

    /// Sets the operational status flag.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound` or `Storage`.
    pub async fn set_status(
        &self,
        actor: &CurrentUser,
        id: EquipmentId,
        status: EquipmentStatus,
    ) -> Result<Equipment, BookingError> {
        actor.require(Permission::ManageSystem)?;
        if !self.catalog.set_status(id, status, self.clock.now()).await? {
            return Err(BookingError::equipment_not_found(id));
        }
        info!(equipment_id = %id, %status, "Equipment status changed");
        self.get(id).await
    }

    /// Deletes a piece of equipment. Its reservations are left untouched.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound` or `Storage`.
    pub async fn delete(&self, actor: &CurrentUser, id: EquipmentId) -> Result<(), BookingError> {
        actor.require(Permission::ManageSystem)?;
        if !self.catalog.delete(id).await? {
            return Err(BookingError::equipment_not_found(id));
        }
        info!(equipment_id = %id, "Equipment deleted");
        Ok(())
    }

    /// Counts equipment by status.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn stats(&self) -> Result<EquipmentStats, BookingError> {
        let all = self.catalog.list(&EquipmentFilter::default()).await?;
        let mut by_status: BTreeMap<EquipmentStatus, usize> =
            EquipmentStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for equipment in &all {
            *by_status.entry(equipment.status).or_default() += 1;
        }
        Ok(EquipmentStats {
            total: all.len(),
            by_status,
        })
    }
}
