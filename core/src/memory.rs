//! In-memory stores.
//!
//! Backed by `tokio::sync::RwLock<HashMap<..>>`. Used by the server's
//! `memory` storage backend and throughout the test suites.

use crate::catalog::{EquipmentCatalog, EquipmentFilter};
use crate::directory::UserDirectory;
use crate::error::BookingError;
use crate::identity::UserContact;
use crate::reservations::{ReservationFilter, ReservationStore};
use crate::types::{
    Equipment, EquipmentId, EquipmentStatus, Reservation, ReservationId, ReservationStatus,
    TimeRange, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory [`EquipmentCatalog`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryEquipmentCatalog {
    records: Arc<RwLock<HashMap<EquipmentId, Equipment>>>,
}

impl InMemoryEquipmentCatalog {
    /// Create a new empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the catalog is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl EquipmentCatalog for InMemoryEquipmentCatalog {
    async fn insert(&self, equipment: Equipment) -> Result<(), BookingError> {
        self.records.write().await.insert(equipment.id, equipment);
        Ok(())
    }

    async fn get(&self, id: EquipmentId) -> Result<Option<Equipment>, BookingError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, BookingError> {
        let mut matching: Vec<Equipment> = self
            .records
            .read()
            .await
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(matching)
    }

    async fn update(&self, equipment: Equipment) -> Result<bool, BookingError> {
        let mut records = self.records.write().await;
        match records.get_mut(&equipment.id) {
            Some(slot) => {
                *slot = equipment;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn set_status(
        &self,
        id: EquipmentId,
        status: EquipmentStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(equipment) => {
                equipment.status = status;
                equipment.updated_at = at;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn delete(&self, id: EquipmentId) -> Result<bool, BookingError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}

/// In-memory [`ReservationStore`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryReservationStore {
    records: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
}

impl InMemoryReservationStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert(&self, reservation: Reservation) -> Result<(), BookingError> {
        self.records.write().await.insert(reservation.id, reservation);
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, BookingError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn update(&self, reservation: Reservation) -> Result<bool, BookingError> {
        let mut records = self.records.write().await;
        match records.get_mut(&reservation.id) {
            Some(slot) => {
                *slot = reservation;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ReservationId) -> Result<bool, BookingError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn find_overlapping(
        &self,
        equipment_id: EquipmentId,
        window: &TimeRange,
        active: &[ReservationStatus],
        exclude: Option<ReservationId>,
    ) -> Result<Vec<Reservation>, BookingError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.equipment_id == equipment_id)
            .filter(|r| r.is_active_in(active))
            .filter(|r| exclude != Some(r.id))
            .filter(|r| r.window.overlaps(window))
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, BookingError> {
        let mut matching: Vec<Reservation> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(matching)
    }
}

/// In-memory [`UserDirectory`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryUserDirectory {
    contacts: Arc<RwLock<HashMap<UserId, UserContact>>>,
}

impl InMemoryUserDirectory {
    /// Create a new empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn record(&self, contact: UserContact) -> Result<(), BookingError> {
        self.contacts.write().await.insert(contact.id, contact);
        Ok(())
    }

    async fn find(&self, id: UserId) -> Result<Option<UserContact>, BookingError> {
        Ok(self.contacts.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn booking(equipment_id: EquipmentId, from: u32, to: u32, status: ReservationStatus) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            equipment_id,
            user_id: UserId::new(),
            window: TimeRange::new(at(from), at(to)).unwrap(),
            quantity: 1,
            description: None,
            status,
            validated_by: None,
            validated_at: None,
            rejection_reason: None,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[tokio::test]
    async fn test_find_overlapping_respects_status_equipment_and_exclusion() {
        let store = InMemoryReservationStore::new();
        let projector = EquipmentId::new();
        let other = EquipmentId::new();

        let approved = booking(projector, 9, 10, ReservationStatus::Approved);
        let pending = booking(projector, 9, 11, ReservationStatus::Pending);
        let rejected = booking(projector, 9, 10, ReservationStatus::Rejected);
        let elsewhere = booking(other, 9, 10, ReservationStatus::Approved);
        let later = booking(projector, 10, 12, ReservationStatus::Approved);
        for r in [&approved, &pending, &rejected, &elsewhere, &later] {
            store.insert(r.clone()).await.unwrap();
        }

        let window = TimeRange::new(at(9), at(10)).unwrap();
        let active = [ReservationStatus::Pending, ReservationStatus::Approved];

        let found = store.find_overlapping(projector, &window, &active, None).await.unwrap();
        assert_eq!(found.len(), 2);

        let approved_only = store
            .find_overlapping(projector, &window, &[ReservationStatus::Approved], None)
            .await
            .unwrap();
        assert_eq!(approved_only.len(), 1);

        let excluding = store
            .find_overlapping(projector, &window, &active, Some(approved.id))
            .await
            .unwrap();
        assert_eq!(excluding.len(), 1);
        assert_eq!(excluding[0].id, pending.id);
    }

    #[tokio::test]
    async fn test_update_missing_record_reports_false() {
        let store = InMemoryReservationStore::new();
        let r = booking(EquipmentId::new(), 9, 10, ReservationStatus::Pending);
        assert!(!store.update(r.clone()).await.unwrap());
        store.insert(r.clone()).await.unwrap();
        assert!(store.update(r).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_by_status_default_impl() {
        let store = InMemoryReservationStore::new();
        let id = EquipmentId::new();
        store.insert(booking(id, 9, 10, ReservationStatus::Pending)).await.unwrap();
        store.insert(booking(id, 9, 10, ReservationStatus::Rejected)).await.unwrap();
        let stats = store.count_by_status().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.count(ReservationStatus::Rejected), 1);
    }

    #[tokio::test]
    async fn test_directory_round_trip() {
        let directory = InMemoryUserDirectory::new();
        let contact = UserContact {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
        };
        directory.record(contact.clone()).await.unwrap();
        assert_eq!(directory.find(contact.id).await.unwrap(), Some(contact));
    }
}
