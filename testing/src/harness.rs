//! A fully wired in-memory admission controller.

use crate::fixtures::{self, EquipmentBuilder};
use crate::mocks::{RecordingNotifier, test_clock};
use equipment_booking_core::admission::{AdmissionController, AdmissionPolicy, ReservationRequest};
use equipment_booking_core::catalog::{CatalogService, EquipmentCatalog};
use equipment_booking_core::clock::Clock;
use equipment_booking_core::memory::{
    InMemoryEquipmentCatalog, InMemoryReservationStore, InMemoryUserDirectory,
};
use equipment_booking_core::types::Equipment;
use std::sync::Arc;

/// In-memory stores, a recording notifier and the services over them.
///
/// The store handles share state with the controller, so tests can seed
/// and inspect records directly.
pub struct BookingHarness {
    /// Equipment records
    pub catalog: InMemoryEquipmentCatalog,
    /// Reservation records
    pub reservations: InMemoryReservationStore,
    /// Requester contacts
    pub directory: InMemoryUserDirectory,
    /// Captured emails
    pub notifier: RecordingNotifier,
    /// Controller under test
    pub controller: Arc<AdmissionController>,
    /// Catalog management service
    pub catalog_service: CatalogService,
    clock: Arc<dyn Clock>,
}

impl Default for BookingHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingHarness {
    /// Harness with the default policy (auto-decide, pending counts).
    #[must_use]
    pub fn new() -> Self {
        Self::with(AdmissionPolicy::default(), RecordingNotifier::new())
    }

    /// Harness with a custom policy.
    #[must_use]
    pub fn with_policy(policy: AdmissionPolicy) -> Self {
        Self::with(policy, RecordingNotifier::new())
    }

    /// Harness with a custom policy and notifier.
    #[must_use]
    pub fn with(policy: AdmissionPolicy, notifier: RecordingNotifier) -> Self {
        let catalog = InMemoryEquipmentCatalog::new();
        let reservations = InMemoryReservationStore::new();
        let directory = InMemoryUserDirectory::new();
        let clock: Arc<dyn Clock> = Arc::new(test_clock());
        let controller = AdmissionController::new(
            Arc::new(catalog.clone()),
            Arc::new(reservations.clone()),
            Arc::new(directory.clone()),
            Arc::new(notifier.clone()),
            Arc::clone(&clock),
            policy,
        );
        let catalog_service = CatalogService::new(Arc::new(catalog.clone()), Arc::clone(&clock));
        Self {
            catalog,
            reservations,
            directory,
            notifier,
            controller: Arc::new(controller),
            catalog_service,
            clock,
        }
    }

    /// Builds and stores an equipment record.
    ///
    /// # Panics
    ///
    /// Never with the in-memory catalog.
    #[allow(clippy::expect_used)]
    pub async fn add_equipment(&self, builder: EquipmentBuilder) -> Equipment {
        let equipment = builder.build(self.clock.now());
        self.catalog
            .insert(equipment.clone())
            .await
            .expect("in-memory insert cannot fail");
        equipment
    }

    /// A request for `quantity` of `equipment` between two hours of the
    /// fixture day.
    #[must_use]
    pub fn request(
        &self,
        equipment: &Equipment,
        from_hour: u32,
        to_hour: u32,
        quantity: i64,
    ) -> ReservationRequest {
        ReservationRequest {
            equipment_id: equipment.id,
            start_date: fixtures::at(from_hour),
            end_date: fixtures::at(to_hour),
            quantity,
            description: None,
        }
    }
}
