//! Reservation Store: persistence seam for reservation records.

use crate::error::BookingError;
use crate::types::{
    EquipmentId, Reservation, ReservationId, ReservationStatus, TimeRange, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Persistence for reservation records.
///
/// Writes are last-write-wins per record. Callers that need the capacity
/// invariant must serialize writes per equipment themselves (see
/// [`AdmissionController`](crate::admission::AdmissionController)).
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Stores a new record.
    async fn insert(&self, reservation: Reservation) -> Result<(), BookingError>;

    /// Reads one record.
    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, BookingError>;

    /// Replaces a record. Returns `false` if it does not exist.
    async fn update(&self, reservation: Reservation) -> Result<bool, BookingError>;

    /// Hard-deletes a record. Returns `false` if it did not exist.
    async fn delete(&self, id: ReservationId) -> Result<bool, BookingError>;

    /// Reservations of `equipment_id` whose status is in `active` and whose
    /// window overlaps `window` (half-open), optionally excluding one record.
    async fn find_overlapping(
        &self,
        equipment_id: EquipmentId,
        window: &TimeRange,
        active: &[ReservationStatus],
        exclude: Option<ReservationId>,
    ) -> Result<Vec<Reservation>, BookingError>;

    /// Lists records matching `filter`, newest first.
    async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, BookingError>;

    /// Counts records by status.
    async fn count_by_status(&self) -> Result<ReservationStats, BookingError> {
        let all = self.list(&ReservationFilter::default()).await?;
        Ok(ReservationStats::tally(all.iter().map(|r| r.status)))
    }

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), BookingError> {
        Ok(())
    }
}

/// Reservation list filter. `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    /// Only this equipment
    pub equipment_id: Option<EquipmentId>,
    /// Only this requester
    pub user_id: Option<UserId>,
    /// Only this status
    pub status: Option<ReservationStatus>,
    /// Only reservations overlapping this window
    pub window: Option<TimeRange>,
    /// Created at or after
    pub created_from: Option<DateTime<Utc>>,
    /// Created at or before
    pub created_to: Option<DateTime<Utc>>,
}

impl ReservationFilter {
    /// Filter on a single status.
    #[must_use]
    pub fn with_status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether `reservation` passes the filter.
    #[must_use]
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.equipment_id.is_none_or(|id| id == reservation.equipment_id)
            && self.user_id.is_none_or(|id| id == reservation.user_id)
            && self.status.is_none_or(|s| s == reservation.status)
            && self.window.is_none_or(|w| w.overlaps(&reservation.window))
            && self.created_from.is_none_or(|from| reservation.created_at >= from)
            && self.created_to.is_none_or(|to| reservation.created_at <= to)
    }
}

/// Reservation counts by status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReservationStats {
    /// Total number of records
    pub total: u64,
    /// Count per status; every status is present
    pub by_status: BTreeMap<ReservationStatus, u64>,
}

impl ReservationStats {
    /// Builds stats from a stream of statuses.
    pub fn tally(statuses: impl IntoIterator<Item = ReservationStatus>) -> Self {
        let mut by_status: BTreeMap<ReservationStatus, u64> =
            ReservationStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut total = 0;
        for status in statuses {
            *by_status.entry(status).or_default() += 1;
            total += 1;
        }
        Self { total, by_status }
    }

    /// Count for one status.
    #[must_use]
    pub fn count(&self, status: ReservationStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
