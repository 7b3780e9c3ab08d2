//! Builders for catalog records, users and instants.

use chrono::{DateTime, TimeZone, Utc};
use equipment_booking_core::identity::{CurrentUser, Role};
use equipment_booking_core::types::{
    Capacity, CapacityUnit, Equipment, EquipmentId, EquipmentStatus, EquipmentType, Location,
    UserId, WeeklySchedule,
};

/// Hour `hour` of 2025-03-01, UTC.
///
/// # Panics
///
/// If `hour` is not a valid hour of day.
#[must_use]
pub fn at(hour: u32) -> DateTime<Utc> {
    on(1, hour)
}

/// Hour `hour` of March `day`, 2025, UTC.
///
/// # Panics
///
/// If the day or hour is out of range.
#[must_use]
#[allow(clippy::expect_used)]
pub fn on(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("fixture instant should be valid")
}

/// Fluent builder for [`Equipment`].
#[derive(Clone, Debug)]
pub struct EquipmentBuilder {
    name: String,
    capacity: Capacity,
    equipment_type: EquipmentType,
    location: Location,
    status: EquipmentStatus,
}

impl EquipmentBuilder {
    /// Start a builder for equipment called `name`, one unit, available.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: Capacity::new(1, CapacityUnit::Units),
            equipment_type: EquipmentType::Other,
            location: Location::Warehouse,
            status: EquipmentStatus::Available,
        }
    }

    /// Set the capacity
    #[must_use]
    pub const fn capacity(mut self, value: u32, unit: CapacityUnit) -> Self {
        self.capacity = Capacity::new(value, unit);
        self
    }

    /// Set the type
    #[must_use]
    pub const fn kind(mut self, equipment_type: EquipmentType) -> Self {
        self.equipment_type = equipment_type;
        self
    }

    /// Set the location
    #[must_use]
    pub const fn location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Set the status
    #[must_use]
    pub const fn status(mut self, status: EquipmentStatus) -> Self {
        self.status = status;
        self
    }

    /// Build with a fresh id, stamped with `now`.
    #[must_use]
    pub fn build(self, now: DateTime<Utc>) -> Equipment {
        Equipment {
            id: EquipmentId::new(),
            description: format!("{} for shared use", self.name),
            name: self.name,
            photo: None,
            capacity: self.capacity,
            equipment_type: self.equipment_type,
            location: self.location,
            schedule: WeeklySchedule::default(),
            access_conditions: "Réservé au personnel".to_string(),
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single-unit projector in Salle 1.
#[must_use]
pub fn projector() -> EquipmentBuilder {
    EquipmentBuilder::new("Projector")
        .kind(EquipmentType::Computing)
        .location(Location::Room1)
}

/// A climate chamber holding `capacity` kilograms.
#[must_use]
pub fn climate_chamber(capacity: u32) -> EquipmentBuilder {
    EquipmentBuilder::new("Climate chamber")
        .capacity(capacity, CapacityUnit::Kilograms)
        .kind(EquipmentType::Laboratory)
        .location(Location::MainWorkshop)
}

/// Authenticated callers.
pub mod users {
    use super::{CurrentUser, Role, UserId};

    fn user(username: &str, role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(),
            email: format!("{username}@example.com"),
            username: username.to_string(),
            role,
        }
    }

    /// A regular user
    #[must_use]
    pub fn member(username: &str) -> CurrentUser {
        user(username, Role::user())
    }

    /// An administrator
    #[must_use]
    pub fn admin(username: &str) -> CurrentUser {
        user(username, Role::admin())
    }
}
