//! Availability Engine.
//!
//! For a piece of equipment and a window, sums the quantity of every active
//! reservation overlapping the window and reports what is left.
//!
//! [`compute`] is the pure aggregation; [`AvailabilityEngine`] fetches its
//! inputs from the catalog and the reservation store. Both are read-only.

use crate::catalog::{EquipmentCatalog, EquipmentFilter};
use crate::error::BookingError;
use crate::metrics;
use crate::reservations::ReservationStore;
use crate::types::{
    CapacityUnit, Equipment, EquipmentId, EquipmentStatus, Reservation, ReservationId,
    ReservationStatus, TimeRange,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which reservation statuses consume capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveSet {
    /// Pending reservations hold capacity optimistically
    #[default]
    PendingAndApproved,
    /// Only approved reservations hold capacity
    ApprovedOnly,
}

impl ActiveSet {
    /// The statuses in this set.
    #[must_use]
    pub const fn statuses(self) -> &'static [ReservationStatus] {
        match self {
            Self::PendingAndApproved => &[ReservationStatus::Pending, ReservationStatus::Approved],
            Self::ApprovedOnly => &[ReservationStatus::Approved],
        }
    }
}

/// Capacity report for one piece of equipment over one window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Equipment ID
    pub equipment_id: EquipmentId,
    /// Equipment name
    pub equipment_name: String,
    /// Equipment status at query time
    pub status: EquipmentStatus,
    /// Capacity unit
    pub unit: CapacityUnit,
    /// Queried window
    #[serde(flatten)]
    pub window: TimeRange,
    /// Total capacity
    pub capacity_total: u32,
    /// Quantity held by overlapping active reservations
    pub capacity_used: u32,
    /// `capacity_total - capacity_used`, or 0 when not in service
    pub capacity_available: u32,
    /// `capacity_available > 0`
    pub available: bool,
    /// Why the equipment reports no capacity regardless of bookings
    pub reason: Option<String>,
}

impl Availability {
    /// Whether `quantity` more units fit in the window.
    #[must_use]
    pub const fn can_fit(&self, quantity: u32) -> bool {
        self.capacity_available >= quantity
    }
}

/// Pure capacity aggregation.
///
/// `reservations` may be any superset of the relevant records: entries for
/// other equipment, with inactive statuses, outside the window, or equal to
/// `exclude` are ignored.
#[must_use]
pub fn compute(
    equipment: &Equipment,
    window: TimeRange,
    reservations: &[Reservation],
    active: &[ReservationStatus],
    exclude: Option<ReservationId>,
) -> Availability {
    let used: u64 = reservations
        .iter()
        .filter(|r| r.equipment_id == equipment.id)
        .filter(|r| r.is_active_in(active))
        .filter(|r| exclude != Some(r.id))
        .filter(|r| r.window.overlaps(&window))
        .map(|r| u64::from(r.quantity))
        .sum();
    let capacity_used = u32::try_from(used).unwrap_or(u32::MAX);
    let total = equipment.capacity.value;

    let (capacity_available, reason) = if equipment.status.has_capacity() {
        (total.saturating_sub(capacity_used), None)
    } else {
        (0, Some(equipment.status.to_string()))
    };

    Availability {
        equipment_id: equipment.id,
        equipment_name: equipment.name.clone(),
        status: equipment.status,
        unit: equipment.capacity.unit,
        window,
        capacity_total: total,
        capacity_used,
        capacity_available,
        available: capacity_available > 0,
        reason,
    }
}

/// Read-side capacity queries over the catalog and reservation store.
#[derive(Clone)]
pub struct AvailabilityEngine {
    catalog: Arc<dyn EquipmentCatalog>,
    reservations: Arc<dyn ReservationStore>,
    active: ActiveSet,
}

impl AvailabilityEngine {
    /// Creates a new engine counting `active` statuses.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn EquipmentCatalog>,
        reservations: Arc<dyn ReservationStore>,
        active: ActiveSet,
    ) -> Self {
        Self {
            catalog,
            reservations,
            active,
        }
    }

    /// The active set used by [`check`](Self::check) and [`check_all`](Self::check_all).
    #[must_use]
    pub const fn active_set(&self) -> ActiveSet {
        self.active
    }

    /// Availability of one piece of equipment.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown equipment, `Storage` on backend failure.
    pub async fn check(
        &self,
        equipment_id: EquipmentId,
        window: TimeRange,
    ) -> Result<Availability, BookingError> {
        metrics::record_availability_query("single");
        let equipment = self
            .catalog
            .get(equipment_id)
            .await?
            .ok_or_else(|| BookingError::equipment_not_found(equipment_id))?;
        self.check_with(&equipment, window, self.active.statuses(), None)
            .await
    }

    /// Availability of every piece of equipment, in catalog order.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn check_all(&self, window: TimeRange) -> Result<Vec<Availability>, BookingError> {
        metrics::record_availability_query("all");
        let all = self.catalog.list(&EquipmentFilter::default()).await?;
        let mut report = Vec::with_capacity(all.len());
        for equipment in &all {
            report.push(
                self.check_with(equipment, window, self.active.statuses(), None)
                    .await?,
            );
        }
        Ok(report)
    }

    /// Availability of an already-loaded equipment with an explicit active
    /// set, optionally ignoring one reservation.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn check_with(
        &self,
        equipment: &Equipment,
        window: TimeRange,
        active: &[ReservationStatus],
        exclude: Option<ReservationId>,
    ) -> Result<Availability, BookingError> {
        let overlapping = self
            .reservations
            .find_overlapping(equipment.id, &window, active, exclude)
            .await?;
        Ok(compute(equipment, window, &overlapping, active, exclude))
    }
}
