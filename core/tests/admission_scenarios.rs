//! End-to-end admission scenarios over the in-memory stores.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use async_trait::async_trait;
use equipment_booking_core::admission::{
    AdmissionController, AdmissionPolicy, Decision, ReservationChanges, ReservationQuery,
    ReservationRequest,
};
use equipment_booking_core::availability::ActiveSet;
use equipment_booking_core::catalog::EquipmentCatalog;
use equipment_booking_core::error::BookingError;
use equipment_booking_core::memory::{
    InMemoryEquipmentCatalog, InMemoryReservationStore, InMemoryUserDirectory,
};
use equipment_booking_core::reservations::{ReservationFilter, ReservationStore};
use equipment_booking_core::types::{
    EquipmentId, EquipmentStatus, Reservation, ReservationId, ReservationStatus, TimeRange,
};
use equipment_booking_testing::{BookingHarness, RecordingNotifier, fixtures, test_clock};
use fixtures::users::{admin, member};
use std::sync::Arc;
use std::time::Duration;

fn legacy_policy() -> AdmissionPolicy {
    AdmissionPolicy {
        mark_occupied_on_approval: true,
        ..AdmissionPolicy::default()
    }
}

#[tokio::test]
async fn test_projector_second_overlapping_request_is_rejected() {
    let harness = BookingHarness::with_policy(legacy_policy());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let alice = member("alice");
    let bob = member("bob");

    let first = harness
        .controller
        .create_reservation(&alice, harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    assert_eq!(first.status, ReservationStatus::Approved);

    let stored = harness.catalog.get(projector.id).await.unwrap().unwrap();
    assert_eq!(stored.status, EquipmentStatus::Occupied);

    let mut overlapping = harness.request(&projector, 9, 10, 1);
    overlapping.start_date = fixtures::at(9) + chrono::Duration::minutes(30);
    overlapping.end_date = fixtures::at(10) + chrono::Duration::minutes(30);
    let second = harness
        .controller
        .create_reservation(&bob, overlapping)
        .await
        .unwrap();
    assert_eq!(second.status, ReservationStatus::Rejected);
    assert!(second.rejection_reason.is_some());

    assert_eq!(
        harness.notifier.subjects(),
        vec![
            "Réservation approuvée - Projector".to_string(),
            "Réservation refusée - Projector".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_projector_default_policy_keeps_equipment_available() {
    let harness = BookingHarness::new();
    let projector = harness.add_equipment(fixtures::projector()).await;

    let first = harness
        .controller
        .create_reservation(&member("alice"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    assert_eq!(first.status, ReservationStatus::Approved);

    let stored = harness.catalog.get(projector.id).await.unwrap().unwrap();
    assert_eq!(stored.status, EquipmentStatus::Available);

    let overlapping = harness
        .controller
        .create_reservation(&member("bob"), harness.request(&projector, 9, 11, 1))
        .await
        .unwrap();
    assert_eq!(overlapping.status, ReservationStatus::Rejected);
    assert_eq!(
        overlapping.rejection_reason.as_deref(),
        Some("insufficient capacity: requested 1, available 0")
    );

    let later = harness
        .controller
        .create_reservation(&member("carol"), harness.request(&projector, 10, 11, 1))
        .await
        .unwrap();
    assert_eq!(later.status, ReservationStatus::Approved);
}

#[tokio::test]
async fn test_manual_policy_creates_pending_and_admin_approves() {
    let harness = BookingHarness::with_policy(AdmissionPolicy::manual());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let alice = member("alice");
    let root = admin("root");

    let created = harness
        .controller
        .create_reservation(&alice, harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    assert_eq!(created.status, ReservationStatus::Pending);
    assert_eq!(
        harness.notifier.subjects(),
        vec!["Réservation en attente - Projector".to_string()]
    );

    let approved = harness
        .controller
        .decide(&root, created.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(approved.status, ReservationStatus::Approved);
    assert_eq!(approved.validated_by, Some(root.id));
    assert!(approved.validated_at.is_some());

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].to, "alice@example.com");
}

#[tokio::test]
async fn test_capacity_invariant_fill_then_overflow() {
    let harness = BookingHarness::new();
    let chamber = harness.add_equipment(fixtures::climate_chamber(5)).await;

    let three = harness
        .controller
        .create_reservation(&member("alice"), harness.request(&chamber, 9, 12, 3))
        .await
        .unwrap();
    assert_eq!(three.status, ReservationStatus::Approved);

    let two = harness
        .controller
        .create_reservation(&member("bob"), harness.request(&chamber, 10, 11, 2))
        .await
        .unwrap();
    assert_eq!(two.status, ReservationStatus::Approved);

    let report = harness
        .controller
        .check_availability(Some(chamber.id), fixtures::at(10), fixtures::at(11))
        .await
        .unwrap();
    assert_eq!(report[0].capacity_available, 0);
    assert!(!report[0].available);

    let overflow = harness
        .controller
        .create_reservation(&member("carol"), harness.request(&chamber, 10, 11, 1))
        .await
        .unwrap();
    assert_eq!(overflow.status, ReservationStatus::Rejected);
}

#[tokio::test]
async fn test_capacity_overflow_of_three_on_remaining_two_is_rejected() {
    let harness = BookingHarness::new();
    let chamber = harness.add_equipment(fixtures::climate_chamber(5)).await;
    harness
        .controller
        .create_reservation(&member("alice"), harness.request(&chamber, 9, 12, 3))
        .await
        .unwrap();

    let three = harness
        .controller
        .create_reservation(&member("bob"), harness.request(&chamber, 9, 12, 3))
        .await
        .unwrap();
    assert_eq!(three.status, ReservationStatus::Rejected);
}

#[tokio::test]
async fn test_inverted_range_fails_before_anything_else() {
    let harness = BookingHarness::new();
    let projector = harness.add_equipment(fixtures::projector()).await;

    let mut request = harness.request(&projector, 10, 9, 0);
    request.equipment_id = equipment_booking_core::types::EquipmentId::new();
    let err = harness
        .controller
        .create_reservation(&member("alice"), request)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidRange { .. }));
    assert!(harness.reservations.is_empty().await);
    assert!(harness.notifier.is_empty());
}

#[tokio::test]
async fn test_quantity_and_equipment_validation() {
    let harness = BookingHarness::new();
    let chamber = harness.add_equipment(fixtures::climate_chamber(5)).await;
    let alice = member("alice");

    let zero = harness
        .controller
        .create_reservation(&alice, harness.request(&chamber, 9, 10, 0))
        .await
        .unwrap_err();
    assert!(matches!(zero, BookingError::InvalidQuantity { requested: 0, .. }));

    let too_many = harness
        .controller
        .create_reservation(&alice, harness.request(&chamber, 9, 10, 6))
        .await
        .unwrap_err();
    assert!(matches!(
        too_many,
        BookingError::InvalidQuantity {
            requested: 6,
            capacity: Some(_)
        }
    ));

    let mut unknown = harness.request(&chamber, 9, 10, 1);
    unknown.equipment_id = equipment_booking_core::types::EquipmentId::new();
    let missing = harness
        .controller
        .create_reservation(&alice, unknown)
        .await
        .unwrap_err();
    assert!(matches!(missing, BookingError::NotFound { entity: "Equipment", .. }));
}

#[tokio::test]
async fn test_maintenance_equipment_is_auto_rejected() {
    let harness = BookingHarness::new();
    let projector = harness
        .add_equipment(fixtures::projector().status(EquipmentStatus::Maintenance))
        .await;

    let reservation = harness
        .controller
        .create_reservation(&member("alice"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Rejected);
    assert_eq!(
        reservation.rejection_reason.as_deref(),
        Some("equipment is Maintenance")
    );

    let report = harness
        .controller
        .check_availability(Some(projector.id), fixtures::at(9), fixtures::at(10))
        .await
        .unwrap();
    assert_eq!(report[0].capacity_available, 0);
    assert_eq!(report[0].reason.as_deref(), Some("Maintenance"));
}

#[tokio::test]
async fn test_decided_reservations_are_immutable_under_manual_policy() {
    let harness = BookingHarness::with_policy(AdmissionPolicy::manual());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let alice = member("alice");
    let root = admin("root");

    let created = harness
        .controller
        .create_reservation(&alice, harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    harness
        .controller
        .decide(&root, created.id, Decision::Reject { reason: Some("Audit".to_string()) })
        .await
        .unwrap();

    let err = harness
        .controller
        .update_reservation(
            &alice,
            created.id,
            ReservationChanges {
                quantity: Some(1),
                ..ReservationChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::InvalidState {
            status: ReservationStatus::Rejected,
            ..
        }
    ));

    let again = harness
        .controller
        .decide(&root, created.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(again, BookingError::InvalidState { .. }));
}

#[tokio::test]
async fn test_update_excludes_own_quantity_from_conflict_check() {
    let harness = BookingHarness::new();
    let chamber = harness.add_equipment(fixtures::climate_chamber(5)).await;
    let alice = member("alice");

    let created = harness
        .controller
        .create_reservation(&alice, harness.request(&chamber, 9, 10, 4))
        .await
        .unwrap();
    assert_eq!(created.status, ReservationStatus::Approved);

    let grown = harness
        .controller
        .update_reservation(
            &alice,
            created.id,
            ReservationChanges {
                quantity: Some(5),
                description: Some("Full load".to_string()),
                ..ReservationChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(grown.status, ReservationStatus::Approved);
    assert_eq!(grown.quantity, 5);
    assert_eq!(grown.description.as_deref(), Some("Full load"));
    assert_eq!(grown.created_at, created.created_at);
}

#[tokio::test]
async fn test_update_requires_owner_or_admin() {
    let harness = BookingHarness::new();
    let projector = harness.add_equipment(fixtures::projector()).await;
    let created = harness
        .controller
        .create_reservation(&member("alice"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();

    let err = harness
        .controller
        .update_reservation(&member("mallory"), created.id, ReservationChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    let by_admin = harness
        .controller
        .update_reservation(&admin("root"), created.id, ReservationChanges::default())
        .await;
    assert!(by_admin.is_ok());
}

#[tokio::test]
async fn test_approval_ignores_pending_but_conflicts_with_approved() {
    let harness = BookingHarness::with_policy(AdmissionPolicy::manual());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let root = admin("root");

    let first = harness
        .controller
        .create_reservation(&member("alice"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    let second = harness
        .controller
        .create_reservation(&member("bob"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    assert_eq!(second.status, ReservationStatus::Pending);

    harness
        .controller
        .decide(&root, second.id, Decision::Approve)
        .await
        .unwrap();

    let err = harness
        .controller
        .decide(&root, first.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::Conflict {
            requested: 1,
            available: 0,
            ..
        }
    ));
    let still = harness.controller.get_reservation(first.id).await.unwrap();
    assert_eq!(still.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn test_decide_requires_manage_reservations() {
    let harness = BookingHarness::with_policy(AdmissionPolicy::manual());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let alice = member("alice");
    let created = harness
        .controller
        .create_reservation(&alice, harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();

    let err = harness
        .controller
        .decide(&alice, created.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
}

#[tokio::test]
async fn test_process_reservation_derives_decision() {
    let harness = BookingHarness::with_policy(AdmissionPolicy::manual());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let root = admin("root");

    let first = harness
        .controller
        .create_reservation(&member("alice"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    let second = harness
        .controller
        .create_reservation(&member("bob"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();

    let processed = harness
        .controller
        .process_reservation(&root, first.id)
        .await
        .unwrap();
    assert_eq!(processed.status, ReservationStatus::Rejected);
    assert!(processed
        .rejection_reason
        .as_deref()
        .unwrap()
        .starts_with("insufficient capacity"));

    let processed = harness
        .controller
        .process_reservation(&root, second.id)
        .await
        .unwrap();
    assert_eq!(processed.status, ReservationStatus::Approved);
}

#[tokio::test]
async fn test_availability_read_is_idempotent() {
    let harness = BookingHarness::new();
    let chamber = harness.add_equipment(fixtures::climate_chamber(10)).await;
    harness
        .controller
        .create_reservation(&member("alice"), harness.request(&chamber, 9, 11, 4))
        .await
        .unwrap();

    let first = harness
        .controller
        .check_availability(None, fixtures::at(10), fixtures::at(12))
        .await
        .unwrap();
    let second = harness
        .controller
        .check_availability(None, fixtures::at(10), fixtures::at(12))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].capacity_used, 4);
    assert_eq!(first[0].capacity_available, 6);
}

#[tokio::test]
async fn test_deleting_approved_reservation_leaves_equipment_status() {
    let harness = BookingHarness::with_policy(legacy_policy());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let alice = member("alice");

    let created = harness
        .controller
        .create_reservation(&alice, harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    harness
        .controller
        .delete_reservation(&alice, created.id)
        .await
        .unwrap();

    let stored = harness.catalog.get(projector.id).await.unwrap().unwrap();
    assert_eq!(stored.status, EquipmentStatus::Occupied);
    let missing = harness.controller.get_reservation(created.id).await;
    assert!(matches!(missing, Err(BookingError::NotFound { .. })));
}

#[tokio::test]
async fn test_notification_failure_does_not_affect_outcome() {
    let harness = BookingHarness::with(AdmissionPolicy::default(), RecordingNotifier::failing());
    let projector = harness.add_equipment(fixtures::projector()).await;

    let created = harness
        .controller
        .create_reservation(&member("alice"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();
    assert_eq!(created.status, ReservationStatus::Approved);
    assert_eq!(harness.reservations.len().await, 1);
    assert_eq!(harness.notifier.len(), 1);
}

#[tokio::test]
async fn test_available_only_drops_overbooked_reservations() {
    let harness = BookingHarness::with_policy(AdmissionPolicy::manual());
    let projector = harness.add_equipment(fixtures::projector()).await;
    let drill = harness
        .add_equipment(fixtures::EquipmentBuilder::new("Drill"))
        .await;

    for name in ["alice", "bob"] {
        harness
            .controller
            .create_reservation(&member(name), harness.request(&projector, 9, 10, 1))
            .await
            .unwrap();
    }
    harness
        .controller
        .create_reservation(&member("carol"), harness.request(&drill, 9, 10, 1))
        .await
        .unwrap();

    let everything = harness
        .controller
        .list_reservations(&ReservationQuery::default())
        .await
        .unwrap();
    assert_eq!(everything.len(), 3);

    let available = harness
        .controller
        .list_reservations(&ReservationQuery {
            filter: ReservationFilter::default(),
            available_only: true,
        })
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].equipment_id, drill.id);

    let in_window = harness
        .controller
        .list_reservations(&ReservationQuery {
            filter: ReservationFilter {
                equipment_id: Some(projector.id),
                window: Some(TimeRange::new(fixtures::at(9), fixtures::at(10)).unwrap()),
                ..ReservationFilter::default()
            },
            available_only: false,
        })
        .await
        .unwrap();
    assert_eq!(in_window.len(), 2);
}

#[tokio::test]
async fn test_status_lists_and_stats() {
    let harness = BookingHarness::new();
    let projector = harness.add_equipment(fixtures::projector()).await;
    let alice = member("alice");
    for hour in [9, 9, 11] {
        harness
            .controller
            .create_reservation(&alice, harness.request(&projector, hour, hour + 1, 1))
            .await
            .unwrap();
    }

    let approved = harness
        .controller
        .list_by_status(ReservationStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.len(), 2);
    let mine = harness.controller.list_for_user(alice.id).await.unwrap();
    assert_eq!(mine.len(), 3);

    let stats = harness.controller.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.count(ReservationStatus::Rejected), 1);
    assert_eq!(stats.count(ReservationStatus::Pending), 0);
}

#[tokio::test]
async fn test_approved_only_creation_policy_ignores_pending() {
    let harness = BookingHarness::with_policy(AdmissionPolicy {
        creation_active: ActiveSet::ApprovedOnly,
        ..AdmissionPolicy::manual()
    });
    let projector = harness.add_equipment(fixtures::projector()).await;
    harness
        .controller
        .create_reservation(&member("alice"), harness.request(&projector, 9, 10, 1))
        .await
        .unwrap();

    let report = harness
        .controller
        .check_availability(Some(projector.id), fixtures::at(9), fixtures::at(10))
        .await
        .unwrap();
    assert_eq!(report[0].capacity_available, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_exceed_capacity() {
    let harness = BookingHarness::new();
    let chamber = harness.add_equipment(fixtures::climate_chamber(3)).await;

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let controller = Arc::clone(&harness.controller);
            let request = harness.request(&chamber, 9, 10, 1);
            let user = member(&format!("user{i}"));
            tokio::spawn(async move { controller.create_reservation(&user, request).await })
        })
        .collect();

    let outcomes = futures::future::join_all(tasks).await;
    let approved = outcomes
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("create failed"))
        .filter(|r| r.status == ReservationStatus::Approved)
        .count();
    assert_eq!(approved, 3);

    let report = harness
        .controller
        .check_availability(Some(chamber.id), fixtures::at(9), fixtures::at(10))
        .await
        .unwrap();
    assert_eq!(report[0].capacity_used, 3);
}

/// Delays overlap reads on one equipment so a concurrent decision can
/// reach the controller while a move is in flight.
struct SlowOverlapStore {
    inner: InMemoryReservationStore,
    slow_on: EquipmentId,
}

#[async_trait]
impl ReservationStore for SlowOverlapStore {
    async fn insert(&self, reservation: Reservation) -> Result<(), BookingError> {
        self.inner.insert(reservation).await
    }

    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, BookingError> {
        self.inner.get(id).await
    }

    async fn update(&self, reservation: Reservation) -> Result<bool, BookingError> {
        self.inner.update(reservation).await
    }

    async fn delete(&self, id: ReservationId) -> Result<bool, BookingError> {
        self.inner.delete(id).await
    }

    async fn find_overlapping(
        &self,
        equipment_id: EquipmentId,
        window: &TimeRange,
        active: &[ReservationStatus],
        exclude: Option<ReservationId>,
    ) -> Result<Vec<Reservation>, BookingError> {
        if equipment_id == self.slow_on {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        self.inner
            .find_overlapping(equipment_id, window, active, exclude)
            .await
    }

    async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, BookingError> {
        self.inner.list(filter).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_moving_reservation_serializes_with_concurrent_decision() {
    let now = fixtures::at(0);
    let first = fixtures::projector().build(now);
    let spare = fixtures::EquipmentBuilder::new("Spare projector").build(now);
    let catalog = InMemoryEquipmentCatalog::new();
    catalog.insert(first.clone()).await.unwrap();
    catalog.insert(spare.clone()).await.unwrap();

    let reservations = InMemoryReservationStore::new();
    let notifier = RecordingNotifier::new();
    let controller = Arc::new(AdmissionController::new(
        Arc::new(catalog),
        Arc::new(SlowOverlapStore {
            inner: reservations.clone(),
            slow_on: spare.id,
        }),
        Arc::new(InMemoryUserDirectory::new()),
        Arc::new(notifier.clone()),
        Arc::new(test_clock()),
        AdmissionPolicy::manual(),
    ));

    let alice = member("alice");
    let manager = admin("manager");
    let reservation = controller
        .create_reservation(
            &alice,
            ReservationRequest {
                equipment_id: first.id,
                start_date: fixtures::at(9),
                end_date: fixtures::at(10),
                quantity: 1,
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);
    let id = reservation.id;

    let mover = {
        let controller = Arc::clone(&controller);
        let changes = ReservationChanges {
            equipment_id: Some(spare.id),
            ..ReservationChanges::default()
        };
        tokio::spawn(async move {
            controller
                .update_reservation(&alice, id, changes)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let decider = {
        let controller = Arc::clone(&controller);
        let manager = manager.clone();
        tokio::spawn(async move {
            controller
                .decide(&manager, id, Decision::Approve)
                .await
        })
    };

    let moved = mover.await.expect("task panicked");
    let decided = decider.await.expect("task panicked").unwrap();
    assert_eq!(decided.status, ReservationStatus::Approved);

    // The approval the owner was told about is the one that is stored
    let stored = reservations.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReservationStatus::Approved);
    assert_eq!(stored.validated_by, Some(manager.id));
    match moved {
        Ok(moved) => {
            assert_eq!(moved.equipment_id, spare.id);
            assert_eq!(stored.equipment_id, spare.id);
        },
        Err(err) => assert!(matches!(err, BookingError::InvalidState { .. })),
    }
    let approvals = notifier
        .subjects()
        .into_iter()
        .filter(|subject| subject.starts_with("Réservation approuvée"))
        .count();
    assert_eq!(approvals, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_processing_rejects_instead_of_failing() {
    let harness = BookingHarness::with_policy(AdmissionPolicy {
        creation_active: ActiveSet::ApprovedOnly,
        ..AdmissionPolicy::manual()
    });
    let projector = harness.add_equipment(fixtures::projector()).await;
    let root = admin("root");

    let mut ids = Vec::new();
    for i in 0..6 {
        let created = harness
            .controller
            .create_reservation(&member(&format!("user{i}")), harness.request(&projector, 9, 10, 1))
            .await
            .unwrap();
        ids.push(created.id);
    }

    let tasks: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let controller = Arc::clone(&harness.controller);
            let root = root.clone();
            tokio::spawn(async move { controller.process_reservation(&root, id).await })
        })
        .collect();

    let statuses: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("process failed").status)
        .collect();
    let approved = statuses
        .iter()
        .filter(|s| **s == ReservationStatus::Approved)
        .count();
    assert_eq!(approved, 1);
    assert_eq!(statuses.len() - approved, 5);
    assert!(statuses
        .iter()
        .all(|s| *s == ReservationStatus::Approved || *s == ReservationStatus::Rejected));
}
