//! Domain types for equipment booking.
//!
//! Identifiers, the labelled enums shared by the catalog and the reservation
//! store, and the two entities: [`Equipment`] and [`Reservation`].
//!
//! Enum labels are the ones stored in the database and sent over the wire.
//! Parsing is lenient: the canonical label, any listed alias, and ASCII case
//! differences are all accepted.

use crate::error::BookingError;
use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

uuid_id!(
    /// Unique identifier for a piece of equipment
    EquipmentId
);
uuid_id!(
    /// Unique identifier for a reservation
    ReservationId
);
uuid_id!(
    /// Unique identifier for a user (issued by the authentication service)
    UserId
);

// ============================================================================
// Labelled enums
// ============================================================================

/// A label did not match any variant of a labelled enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct UnknownLabel {
    /// Name of the enum being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
    /// Comma-separated canonical labels
    pub expected: String,
}

labelled_enum! {
    /// Unit in which an equipment's capacity is expressed.
    pub enum CapacityUnit {
        /// Kilograms
        Kilograms => "kg",
        /// Litres
        Litres => "litres" | "liters",
        /// People
        Persons => "personnes" | "persons" | "people",
        /// Individual units
        Units => "unités" | "unites" | "units",
        /// Watts
        Watts => "watts",
        /// Anything else
        Other => "autres" | "other",
    }
}

labelled_enum! {
    /// Equipment category.
    pub enum EquipmentType {
        /// Computers, projectors, screens
        Computing => "Équipement informatique" | "computing",
        /// Printers, shredders, office furniture
        Office => "Équipement bureautique" | "office",
        /// Industrial machinery
        IndustrialMachine => "Machine industrielle" | "industrial_machine",
        /// Power tools
        PowerTool => "Outil électrique" | "power_tool",
        /// Laboratory equipment
        Laboratory => "Matériel de laboratoire" | "laboratory",
        /// Anything else
        Other => "Autre" | "other",
    }
}

labelled_enum! {
    /// Where a piece of equipment is kept.
    pub enum Location {
        /// Room 1
        Room1 => "Salle 1" | "room_1",
        /// Room 2
        Room2 => "Salle 2" | "room_2",
        /// Main workshop
        MainWorkshop => "Atelier Principal" | "main_workshop",
        /// Room A
        RoomA => "Salle A" | "room_a",
        /// Room B
        RoomB => "Salle B" | "room_b",
        /// Warehouse
        Warehouse => "Entrepôt" | "warehouse",
    }
}

labelled_enum! {
    /// Operational status of a piece of equipment.
    ///
    /// Only `Available` equipment accepts new reservations. The other values
    /// are operational flags set by an administrator (or, under the legacy
    /// occupancy policy, by an approval).
    pub enum EquipmentStatus {
        /// In service and bookable
        Available => "Available" | "Disponible",
        /// In use
        Occupied => "Occupied" | "Occupé" | "occupe",
        /// Broken or withdrawn
        OutOfService => "OutOfService" | "Hors service" | "out_of_service",
        /// Under maintenance
        Maintenance => "Maintenance",
    }
}

impl EquipmentStatus {
    /// Whether new reservations may be admitted in this status.
    #[must_use]
    pub const fn is_bookable(self) -> bool {
        matches!(self, Self::Available)
    }

    /// Whether capacity math applies at all.
    ///
    /// Equipment that is out of service or under maintenance always reports
    /// zero availability.
    #[must_use]
    pub const fn has_capacity(self) -> bool {
        matches!(self, Self::Available | Self::Occupied)
    }
}

impl Default for EquipmentStatus {
    fn default() -> Self {
        Self::Available
    }
}

labelled_enum! {
    /// Reservation lifecycle status.
    ///
    /// `pending → {approved, rejected}`; approved and rejected are terminal.
    pub enum ReservationStatus {
        /// Awaiting a decision
        Pending => "pending",
        /// Accepted
        Approved => "approved",
        /// Declined
        Rejected => "rejected",
    }
}

impl ReservationStatus {
    /// Whether the reservation can still be changed or decided.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

// ============================================================================
// Value objects
// ============================================================================

/// Total concurrent-use ceiling of a piece of equipment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    /// Amount of capacity, always positive
    pub value: u32,
    /// Unit of `value`
    pub unit: CapacityUnit,
}

impl Capacity {
    /// Creates a new capacity
    #[must_use]
    pub const fn new(value: u32, unit: CapacityUnit) -> Self {
        Self { value, unit }
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }
}

const CLOSED: &str = "Fermé";

fn closed() -> String {
    CLOSED.to_string()
}

/// Opening hours per weekday.
///
/// Purely descriptive: admission never consults it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct WeeklySchedule {
    #[serde(default = "closed")]
    pub monday: String,
    #[serde(default = "closed")]
    pub tuesday: String,
    #[serde(default = "closed")]
    pub wednesday: String,
    #[serde(default = "closed")]
    pub thursday: String,
    #[serde(default = "closed")]
    pub friday: String,
    #[serde(default = "closed")]
    pub saturday: String,
    #[serde(default = "closed")]
    pub sunday: String,
}

impl WeeklySchedule {
    /// Opening hours for the given weekday.
    #[must_use]
    pub fn for_weekday(&self, day: Weekday) -> &str {
        match day {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            monday: closed(),
            tuesday: closed(),
            wednesday: closed(),
            thursday: closed(),
            friday: closed(),
            saturday: closed(),
            sunday: closed(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeRange {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = BookingError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        Self::new(raw.start_date, raw.end_date)
    }
}

/// A half-open time window `[start, end)` with `start < end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    #[serde(rename = "startDate")]
    start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Builds a window, rejecting empty and inverted ones.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRange`] unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(BookingError::InvalidRange { start, end })
        }
    }

    /// Inclusive start instant
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open overlap test: `self.start < other.end && self.end > other.start`.
    ///
    /// Windows that merely touch (`a.end == b.start`) do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A bookable physical resource with finite numeric capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    /// Equipment ID
    pub id: EquipmentId,
    /// Display name
    pub name: String,
    /// Optional photo (URL or base64 data)
    pub photo: Option<String>,
    /// Free-text description
    pub description: String,
    /// Concurrent-use ceiling
    pub capacity: Capacity,
    /// Category
    #[serde(rename = "type")]
    pub equipment_type: EquipmentType,
    /// Where it is kept
    pub location: Location,
    /// Opening hours (descriptive)
    pub schedule: WeeklySchedule,
    /// Who may use it and how
    pub access_conditions: String,
    /// Operational status
    pub status: EquipmentStatus,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last modified
    pub updated_at: DateTime<Utc>,
}

/// A request to consume part of an equipment's capacity over a window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Reservation ID
    pub id: ReservationId,
    /// Equipment being booked
    pub equipment_id: EquipmentId,
    /// Requesting user
    pub user_id: UserId,
    /// Booked window
    #[serde(flatten)]
    pub window: TimeRange,
    /// Amount of capacity consumed
    pub quantity: u32,
    /// Free-text purpose
    pub description: Option<String>,
    /// Lifecycle status
    pub status: ReservationStatus,
    /// Administrator who decided, if any
    pub validated_by: Option<UserId>,
    /// When the decision was made
    pub validated_at: Option<DateTime<Utc>>,
    /// Why the reservation was rejected
    pub rejection_reason: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last modified
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether this reservation currently consumes capacity under the given
    /// set of active statuses.
    #[must_use]
    pub fn is_active_in(&self, active: &[ReservationStatus]) -> bool {
        active.contains(&self.status)
    }
}
