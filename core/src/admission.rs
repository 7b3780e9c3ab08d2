//! Admission Controller.
//!
//! Orchestrates the reservation lifecycle `pending → {approved, rejected}`:
//! input validation, the capacity-aware conflict check, the decision policy,
//! the optional equipment status side effect, and notifications.
//!
//! The shape follows a functional core and an imperative shell:
//!
//! - [`evaluate_request`] and [`apply_decision`] are pure. They return the
//!   outcome plus a list of [`AdmissionEffect`] descriptions.
//! - [`AdmissionController`] loads inputs, runs the pure functions while
//!   holding the equipment's lock, persists, executes the effects, and
//!   dispatches notifications after the lock is released.
//!
//! # Concurrency
//!
//! Every operation that reads availability and then writes a reservation
//! holds a per-equipment async mutex across both steps, so two concurrent
//! requests for the same equipment cannot both observe the same free
//! capacity. Moving a reservation holds the locks of both its old and new
//! equipment, taken in id order. Slots are dropped once no task holds or
//! awaits them.
//!
//! Persisting the reservation and updating the equipment status are two
//! separate writes. A crash between them is not reconciled.

use crate::availability::{ActiveSet, Availability, AvailabilityEngine};
use crate::catalog::EquipmentCatalog;
use crate::clock::Clock;
use crate::directory::UserDirectory;
use crate::error::BookingError;
use crate::identity::{CurrentUser, Permission, UserContact};
use crate::metrics;
use crate::notifier::{NotificationKind, Notifier, ReservationDetails};
use crate::reservations::{ReservationFilter, ReservationStats, ReservationStore};
use crate::types::{
    Equipment, EquipmentId, EquipmentStatus, Reservation, ReservationId, ReservationStatus,
    TimeRange, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

// ============================================================================
// Policy and inputs
// ============================================================================

/// Configurable admission behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionPolicy {
    /// Decide synchronously at creation instead of waiting for an admin.
    pub auto_decide: bool,
    /// Statuses that hold capacity for create/update conflict checks.
    pub creation_active: ActiveSet,
    /// Set equipment to `Occupied` whenever a reservation is approved.
    ///
    /// Off by default: bookability is then derived from the status flag and
    /// the capacity check alone.
    pub mark_occupied_on_approval: bool,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            auto_decide: true,
            creation_active: ActiveSet::PendingAndApproved,
            mark_occupied_on_approval: false,
        }
    }
}

impl AdmissionPolicy {
    /// Every request waits for an administrator.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            auto_decide: false,
            ..Self::default()
        }
    }
}

/// Administrator decision on a pending reservation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Accept, subject to the approved-only capacity re-check.
    Approve,
    /// Decline.
    Reject {
        /// Shown to the requester
        reason: Option<String>,
    },
}

/// A new reservation request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    /// Equipment to book
    pub equipment_id: EquipmentId,
    /// Window start
    pub start_date: DateTime<Utc>,
    /// Window end (exclusive)
    pub end_date: DateTime<Utc>,
    /// Capacity to consume
    pub quantity: i64,
    /// Free-text purpose
    #[serde(default)]
    pub description: Option<String>,
}

/// Changes to an existing reservation. Absent fields keep their value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ReservationChanges {
    pub equipment_id: Option<EquipmentId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub quantity: Option<i64>,
    pub description: Option<String>,
}

/// List query: a store filter plus the read-side availability re-check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservationQuery {
    /// Store-level filter
    pub filter: ReservationFilter,
    /// Drop reservations whose equipment can no longer hold them
    pub available_only: bool,
}

// ============================================================================
// Functional core
// ============================================================================

/// Side effects requested by a decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdmissionEffect {
    /// Set the equipment's status to `Occupied`
    MarkEquipmentOccupied(EquipmentId),
    /// Send a status email to the requester
    Notify(NotificationKind),
}

/// Effects produced by one decision; rarely more than two.
pub type Effects = SmallVec<[AdmissionEffect; 2]>;

/// Outcome of evaluating a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    /// Initial status
    pub status: ReservationStatus,
    /// Set when `status` is `Rejected`
    pub rejection_reason: Option<String>,
    /// Requested side effects
    pub effects: Effects,
}

/// Why `quantity` cannot be admitted, if it cannot.
#[must_use]
pub fn refusal_reason(
    equipment: &Equipment,
    availability: &Availability,
    quantity: u32,
) -> Option<String> {
    if !equipment.status.is_bookable() {
        Some(format!("equipment is {}", equipment.status))
    } else if !availability.can_fit(quantity) {
        Some(format!(
            "insufficient capacity: requested {quantity}, available {}",
            availability.capacity_available
        ))
    } else {
        None
    }
}

/// Creation-time (and update-time) decision.
///
/// Under manual approval the request always stays pending. Otherwise it is
/// approved when the equipment is `Available` and the remaining capacity in
/// the window covers `quantity`, and rejected with a reason when not.
#[must_use]
pub fn evaluate_request(
    policy: &AdmissionPolicy,
    equipment: &Equipment,
    availability: &Availability,
    quantity: u32,
) -> Verdict {
    if !policy.auto_decide {
        return Verdict {
            status: ReservationStatus::Pending,
            rejection_reason: None,
            effects: smallvec![AdmissionEffect::Notify(NotificationKind::Pending)],
        };
    }

    match refusal_reason(equipment, availability, quantity) {
        Some(reason) => Verdict {
            status: ReservationStatus::Rejected,
            rejection_reason: Some(reason.clone()),
            effects: smallvec![AdmissionEffect::Notify(NotificationKind::Rejected {
                reason: Some(reason),
            })],
        },
        None => {
            let mut effects = Effects::new();
            if policy.mark_occupied_on_approval {
                effects.push(AdmissionEffect::MarkEquipmentOccupied(equipment.id));
            }
            effects.push(AdmissionEffect::Notify(NotificationKind::Approved));
            Verdict {
                status: ReservationStatus::Approved,
                rejection_reason: None,
                effects,
            }
        },
    }
}

/// Applies an administrator decision to a pending reservation.
///
/// `availability` must be computed against *approved* reservations only,
/// excluding the reservation itself. It is only consulted for
/// [`Decision::Approve`].
///
/// # Errors
///
/// - `InvalidState` if the reservation is not pending.
/// - `Conflict` if approving would exceed capacity; the reservation is left
///   untouched.
pub fn apply_decision(
    policy: &AdmissionPolicy,
    reservation: &mut Reservation,
    decision: &Decision,
    availability: Option<&Availability>,
    admin: UserId,
    now: DateTime<Utc>,
) -> Result<Effects, BookingError> {
    if !reservation.status.is_pending() {
        return Err(BookingError::InvalidState {
            id: reservation.id.to_string(),
            status: reservation.status,
        });
    }

    let effects = match decision {
        Decision::Approve => {
            let available = availability.map_or(0, |a| a.capacity_available);
            if available < reservation.quantity {
                let reason = availability
                    .and_then(|a| a.reason.clone())
                    .map_or_else(
                        || "overlapping approved reservations exhaust capacity".to_string(),
                        |status| format!("equipment is {status}"),
                    );
                return Err(BookingError::Conflict {
                    requested: reservation.quantity,
                    available,
                    reason,
                });
            }
            reservation.status = ReservationStatus::Approved;
            reservation.rejection_reason = None;
            let mut effects = Effects::new();
            if policy.mark_occupied_on_approval {
                effects.push(AdmissionEffect::MarkEquipmentOccupied(reservation.equipment_id));
            }
            effects.push(AdmissionEffect::Notify(NotificationKind::Approved));
            effects
        },
        Decision::Reject { reason } => {
            let reason = reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            reservation.status = ReservationStatus::Rejected;
            reservation.rejection_reason.clone_from(&reason);
            smallvec![AdmissionEffect::Notify(NotificationKind::Rejected { reason })]
        },
    };

    reservation.validated_by = Some(admin);
    reservation.validated_at = Some(now);
    reservation.updated_at = now;
    Ok(effects)
}

fn positive_quantity(requested: i64) -> Result<u32, BookingError> {
    u32::try_from(requested)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(BookingError::InvalidQuantity {
            requested,
            capacity: None,
        })
}

fn within_capacity(equipment: &Equipment, quantity: u32) -> Result<(), BookingError> {
    if quantity > equipment.capacity.value {
        Err(BookingError::InvalidQuantity {
            requested: i64::from(quantity),
            capacity: Some(equipment.capacity),
        })
    } else {
        Ok(())
    }
}

fn ensure_pending(reservation: &Reservation) -> Result<(), BookingError> {
    if reservation.status.is_pending() {
        Ok(())
    } else {
        Err(BookingError::InvalidState {
            id: reservation.id.to_string(),
            status: reservation.status,
        })
    }
}

/// Window, quantity and equipment after applying `changes` to `current`.
fn resolve_changes(
    current: &Reservation,
    changes: &ReservationChanges,
) -> Result<(TimeRange, u32, EquipmentId), BookingError> {
    let window = TimeRange::new(
        changes.start_date.unwrap_or_else(|| current.window.start()),
        changes.end_date.unwrap_or_else(|| current.window.end()),
    )?;
    let quantity = changes
        .quantity
        .map_or(Ok(current.quantity), positive_quantity)?;
    Ok((window, quantity, changes.equipment_id.unwrap_or(current.equipment_id)))
}

// ============================================================================
// Per-equipment serialization
// ============================================================================

/// One async mutex per equipment id, created on first use and dropped once
/// nobody holds or waits on it.
#[derive(Debug, Default)]
struct EquipmentLocks {
    slots: Mutex<HashMap<EquipmentId, Arc<tokio::sync::Mutex<()>>>>,
}

impl EquipmentLocks {
    async fn acquire(&self, id: EquipmentId) -> EquipmentGuard<'_> {
        self.acquire_all(&[id]).await
    }

    /// Locks every id in ascending order, so that two callers asking for
    /// overlapping sets cannot deadlock.
    async fn acquire_all(&self, ids: &[EquipmentId]) -> EquipmentGuard<'_> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guard = EquipmentGuard {
            locks: self,
            held: Vec::with_capacity(ids.len()),
            waiting: None,
        };
        for id in ids {
            let slot = {
                let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                Arc::clone(slots.entry(id).or_default())
            };
            // Cancelled while waiting: the slot is dropped before the guard
            guard.waiting = Some(id);
            let locked = slot.lock_owned().await;
            guard.waiting = None;
            guard.held.push((id, locked));
        }
        guard
    }

    fn release(&self, id: EquipmentId) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the slot under this map lock, so a count of one
        // means only the map still refers to it.
        if slots.get(&id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(&id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held equipment locks; releasing prunes idle slots.
struct EquipmentGuard<'a> {
    locks: &'a EquipmentLocks,
    held: Vec<(EquipmentId, OwnedMutexGuard<()>)>,
    waiting: Option<EquipmentId>,
}

impl Drop for EquipmentGuard<'_> {
    fn drop(&mut self) {
        for (id, guard) in self.held.drain(..) {
            drop(guard);
            self.locks.release(id);
        }
        if let Some(id) = self.waiting.take() {
            self.locks.release(id);
        }
    }
}

// ============================================================================
// Imperative shell
// ============================================================================

/// Reservation lifecycle orchestrator.
pub struct AdmissionController {
    catalog: Arc<dyn EquipmentCatalog>,
    reservations: Arc<dyn ReservationStore>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    engine: AvailabilityEngine,
    policy: AdmissionPolicy,
    locks: EquipmentLocks,
}

impl AdmissionController {
    /// Wires the controller to its collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn EquipmentCatalog>,
        reservations: Arc<dyn ReservationStore>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: AdmissionPolicy,
    ) -> Self {
        let engine = AvailabilityEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&reservations),
            policy.creation_active,
        );
        Self {
            catalog,
            reservations,
            directory,
            notifier,
            clock,
            engine,
            policy,
            locks: EquipmentLocks::default(),
        }
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// The availability engine, configured with the creation-time active set.
    #[must_use]
    pub const fn availability(&self) -> &AvailabilityEngine {
        &self.engine
    }

    /// Submits a new reservation on behalf of `requester`.
    ///
    /// Capacity conflicts do not fail the call. Under auto-decide they
    /// produce a `rejected` reservation carrying the reason.
    ///
    /// # Errors
    ///
    /// - `InvalidRange` unless `start < end` (checked first).
    /// - `InvalidQuantity` if the quantity is not positive or exceeds the
    ///   equipment's total capacity.
    /// - `NotFound` for an unknown equipment.
    /// - `Storage` on backend failure.
    pub async fn create_reservation(
        &self,
        requester: &CurrentUser,
        request: ReservationRequest,
    ) -> Result<Reservation, BookingError> {
        let window = TimeRange::new(request.start_date, request.end_date)?;
        let quantity = positive_quantity(request.quantity)?;

        // Unknown ids never reach the lock map
        within_capacity(&self.load_equipment(request.equipment_id).await?, quantity)?;
        let guard = self.locks.acquire(request.equipment_id).await;
        let equipment = self.load_equipment(request.equipment_id).await?;
        within_capacity(&equipment, quantity)?;

        let availability = self
            .engine
            .check_with(&equipment, window, self.policy.creation_active.statuses(), None)
            .await?;
        let verdict = evaluate_request(&self.policy, &equipment, &availability, quantity);

        let now = self.clock.now();
        let reservation = Reservation {
            id: ReservationId::new(),
            equipment_id: equipment.id,
            user_id: requester.id,
            window,
            quantity,
            description: request.description.filter(|d| !d.trim().is_empty()),
            status: verdict.status,
            validated_by: None,
            validated_at: None,
            rejection_reason: verdict.rejection_reason.clone(),
            created_at: now,
            updated_at: now,
        };

        self.directory.record(requester.contact()).await?;
        self.reservations.insert(reservation.clone()).await?;
        self.apply_catalog_effects(&verdict.effects, now).await;
        drop(guard);

        info!(
            reservation_id = %reservation.id,
            equipment_id = %equipment.id,
            user_id = %requester.id,
            status = %reservation.status,
            quantity,
            capacity_available = availability.capacity_available,
            "Reservation created"
        );
        metrics::record_reservation_created(reservation.status, quantity);

        self.dispatch(&verdict.effects, &requester.contact(), &equipment, &reservation)
            .await;
        Ok(reservation)
    }

    /// Modifies a reservation and re-runs the creation-time decision,
    /// ignoring the reservation's own capacity.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown reservation or equipment.
    /// - `Forbidden` unless the caller owns it or manages reservations.
    /// - `InvalidState` under manual approval once it has been decided.
    /// - `InvalidRange` / `InvalidQuantity` on bad values.
    /// - `Storage` on backend failure.
    pub async fn update_reservation(
        &self,
        actor: &CurrentUser,
        id: ReservationId,
        changes: ReservationChanges,
    ) -> Result<Reservation, BookingError> {
        let existing = self.load_reservation(id).await?;
        actor.require_owner_or_manager(existing.user_id)?;
        self.ensure_mutable(&existing)?;
        resolve_changes(&existing, &changes)?;
        if let Some(target) = changes.equipment_id {
            self.load_equipment(target).await?;
        }

        // A move locks both the old and the new equipment
        let (guard, current) = self.lock_reservation(id, changes.equipment_id).await?;
        self.ensure_mutable(&current)?;
        let (window, quantity, equipment_id) = resolve_changes(&current, &changes)?;
        let equipment = self.load_equipment(equipment_id).await?;
        within_capacity(&equipment, quantity)?;

        let availability = self
            .engine
            .check_with(
                &equipment,
                window,
                self.policy.creation_active.statuses(),
                Some(id),
            )
            .await?;
        let verdict = evaluate_request(&self.policy, &equipment, &availability, quantity);

        let now = self.clock.now();
        let updated = Reservation {
            equipment_id,
            window,
            quantity,
            description: changes.description.or_else(|| current.description.clone()),
            status: verdict.status,
            rejection_reason: verdict.rejection_reason.clone(),
            validated_by: None,
            validated_at: None,
            updated_at: now,
            ..current.clone()
        };

        if !self.reservations.update(updated.clone()).await? {
            return Err(BookingError::reservation_not_found(id));
        }
        self.apply_catalog_effects(&verdict.effects, now).await;
        drop(guard);

        info!(
            reservation_id = %id,
            equipment_id = %equipment_id,
            previous_status = %current.status,
            status = %updated.status,
            quantity,
            "Reservation updated"
        );

        if self.policy.auto_decide && updated.status != current.status {
            if let Some(owner) = self.owner_contact(&updated).await {
                self.dispatch(&verdict.effects, &owner, &equipment, &updated)
                    .await;
            }
        }
        Ok(updated)
    }

    /// Approves or rejects a pending reservation.
    ///
    /// Approval re-checks capacity against other *approved* reservations
    /// only; pending ones do not block it.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `manage_reservations`.
    /// - `NotFound` for an unknown reservation or equipment.
    /// - `InvalidState` if the reservation is not pending.
    /// - `Conflict` if approving would exceed capacity; the reservation stays pending.
    /// - `Storage` on backend failure.
    pub async fn decide(
        &self,
        admin: &CurrentUser,
        id: ReservationId,
        decision: Decision,
    ) -> Result<Reservation, BookingError> {
        admin.require(Permission::ManageReservations)?;
        let (guard, reservation) = self.lock_reservation(id, None).await?;
        ensure_pending(&reservation)?;
        let equipment = self.load_equipment(reservation.equipment_id).await?;
        self.settle(admin, guard, reservation, &equipment, decision)
            .await
    }

    /// Re-evaluates a pending reservation with the creation-time rules and
    /// applies the resulting decision as [`decide`](Self::decide) would,
    /// without releasing the equipment lock in between.
    ///
    /// The creation-time active set contains the approved one, so a derived
    /// approval always passes the approval re-check.
    ///
    /// Prefer [`decide`](Self::decide) for explicit administrator decisions.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `manage_reservations`.
    /// - `NotFound` for an unknown reservation or equipment.
    /// - `InvalidState` if the reservation is not pending.
    /// - `Storage` on backend failure.
    pub async fn process_reservation(
        &self,
        admin: &CurrentUser,
        id: ReservationId,
    ) -> Result<Reservation, BookingError> {
        admin.require(Permission::ManageReservations)?;
        let (guard, reservation) = self.lock_reservation(id, None).await?;
        ensure_pending(&reservation)?;
        let equipment = self.load_equipment(reservation.equipment_id).await?;
        let availability = self
            .engine
            .check_with(
                &equipment,
                reservation.window,
                self.policy.creation_active.statuses(),
                Some(id),
            )
            .await?;
        let decision = match refusal_reason(&equipment, &availability, reservation.quantity) {
            Some(reason) => Decision::Reject {
                reason: Some(reason),
            },
            None => Decision::Approve,
        };
        debug!(reservation_id = %id, ?decision, "Derived decision");
        self.settle(admin, guard, reservation, &equipment, decision)
            .await
    }

    /// Hard-deletes a reservation. Equipment status is left unchanged.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` unless owner or manager, or `Storage`.
    pub async fn delete_reservation(
        &self,
        actor: &CurrentUser,
        id: ReservationId,
    ) -> Result<(), BookingError> {
        let reservation = self.load_reservation(id).await?;
        actor.require_owner_or_manager(reservation.user_id)?;
        if !self.reservations.delete(id).await? {
            return Err(BookingError::reservation_not_found(id));
        }
        info!(
            reservation_id = %id,
            equipment_id = %reservation.equipment_id,
            status = %reservation.status,
            "Reservation deleted"
        );
        Ok(())
    }

    /// Reads one reservation.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Storage`.
    pub async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, BookingError> {
        self.load_reservation(id).await
    }

    /// Lists reservations.
    ///
    /// With `available_only`, a reservation is kept only while its equipment
    /// is bookable and the capacity left by *other* active reservations in
    /// its window still covers its quantity.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn list_reservations(
        &self,
        query: &ReservationQuery,
    ) -> Result<Vec<Reservation>, BookingError> {
        let all = self.reservations.list(&query.filter).await?;
        if !query.available_only {
            return Ok(all);
        }

        let mut equipment_cache: HashMap<EquipmentId, Option<Equipment>> = HashMap::new();
        let mut kept = Vec::with_capacity(all.len());
        for reservation in all {
            if !equipment_cache.contains_key(&reservation.equipment_id) {
                let loaded = self.catalog.get(reservation.equipment_id).await?;
                equipment_cache.insert(reservation.equipment_id, loaded);
            }
            let Some(Some(equipment)) = equipment_cache.get(&reservation.equipment_id) else {
                continue;
            };
            let availability = self
                .engine
                .check_with(
                    equipment,
                    reservation.window,
                    self.policy.creation_active.statuses(),
                    Some(reservation.id),
                )
                .await?;
            if refusal_reason(equipment, &availability, reservation.quantity).is_none() {
                kept.push(reservation);
            }
        }
        Ok(kept)
    }

    /// Lists reservations in one status.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn list_by_status(
        &self,
        status: ReservationStatus,
    ) -> Result<Vec<Reservation>, BookingError> {
        self.reservations
            .list(&ReservationFilter::with_status(status))
            .await
    }

    /// Lists the reservations of one user.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Reservation>, BookingError> {
        self.reservations
            .list(&ReservationFilter {
                user_id: Some(user_id),
                ..ReservationFilter::default()
            })
            .await
    }

    /// Counts reservations by status.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn stats(&self) -> Result<ReservationStats, BookingError> {
        self.reservations.count_by_status().await
    }

    /// Availability of one equipment, or of all when `equipment_id` is `None`.
    ///
    /// # Errors
    ///
    /// `InvalidRange` unless `start < end`, `NotFound` for an unknown
    /// equipment, `Storage` on backend failure.
    pub async fn check_availability(
        &self,
        equipment_id: Option<EquipmentId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Availability>, BookingError> {
        let window = TimeRange::new(start, end)?;
        match equipment_id {
            Some(id) => Ok(vec![self.engine.check(id, window).await?]),
            None => self.engine.check_all(window).await,
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Applies `decision` to a pending reservation whose equipment lock is
    /// held by `guard`, then notifies the owner once the lock is released.
    async fn settle(
        &self,
        admin: &CurrentUser,
        guard: EquipmentGuard<'_>,
        mut reservation: Reservation,
        equipment: &Equipment,
        decision: Decision,
    ) -> Result<Reservation, BookingError> {
        let id = reservation.id;
        let availability = match decision {
            Decision::Approve => Some(
                self.engine
                    .check_with(
                        equipment,
                        reservation.window,
                        ActiveSet::ApprovedOnly.statuses(),
                        Some(id),
                    )
                    .await?,
            ),
            Decision::Reject { .. } => None,
        };

        let now = self.clock.now();
        let effects = match apply_decision(
            &self.policy,
            &mut reservation,
            &decision,
            availability.as_ref(),
            admin.id,
            now,
        ) {
            Ok(effects) => effects,
            Err(err) => {
                if matches!(err, BookingError::Conflict { .. }) {
                    metrics::record_conflict();
                    warn!(reservation_id = %id, error = %err, "Approval refused");
                }
                return Err(err);
            },
        };

        if !self.reservations.update(reservation.clone()).await? {
            return Err(BookingError::reservation_not_found(id));
        }
        self.apply_catalog_effects(&effects, now).await;
        drop(guard);

        info!(
            reservation_id = %id,
            equipment_id = %equipment.id,
            admin_id = %admin.id,
            status = %reservation.status,
            "Reservation decided"
        );
        metrics::record_decision(reservation.status);

        if let Some(owner) = self.owner_contact(&reservation).await {
            self.dispatch(&effects, &owner, equipment, &reservation).await;
        }
        Ok(reservation)
    }

    async fn load_equipment(&self, id: EquipmentId) -> Result<Equipment, BookingError> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| BookingError::equipment_not_found(id))
    }

    async fn load_reservation(&self, id: ReservationId) -> Result<Reservation, BookingError> {
        self.reservations
            .get(id)
            .await?
            .ok_or_else(|| BookingError::reservation_not_found(id))
    }

    /// Locks the reservation's current equipment, plus `moving_to` when
    /// given, and re-reads it under the locks. Retries if an update moved
    /// it to another equipment meanwhile.
    async fn lock_reservation(
        &self,
        id: ReservationId,
        moving_to: Option<EquipmentId>,
    ) -> Result<(EquipmentGuard<'_>, Reservation), BookingError> {
        let mut equipment_id = self.load_reservation(id).await?.equipment_id;
        loop {
            let ids = [equipment_id, moving_to.unwrap_or(equipment_id)];
            let guard = self.locks.acquire_all(&ids).await;
            let reservation = self.load_reservation(id).await?;
            if reservation.equipment_id == equipment_id {
                return Ok((guard, reservation));
            }
            equipment_id = reservation.equipment_id;
        }
    }

    fn ensure_mutable(&self, reservation: &Reservation) -> Result<(), BookingError> {
        if !self.policy.auto_decide && !reservation.status.is_pending() {
            return Err(BookingError::InvalidState {
                id: reservation.id.to_string(),
                status: reservation.status,
            });
        }
        Ok(())
    }

    async fn owner_contact(&self, reservation: &Reservation) -> Option<UserContact> {
        match self.directory.find(reservation.user_id).await {
            Ok(Some(contact)) => Some(contact),
            Ok(None) => {
                warn!(
                    reservation_id = %reservation.id,
                    user_id = %reservation.user_id,
                    "No contact on file; skipping notification"
                );
                metrics::record_notification(
                    NotificationKind::for_reservation(reservation).label(),
                    "skipped",
                );
                None
            },
            Err(err) => {
                warn!(
                    reservation_id = %reservation.id,
                    error = %err,
                    "Contact lookup failed; skipping notification"
                );
                metrics::record_notification(
                    NotificationKind::for_reservation(reservation).label(),
                    "failed",
                );
                None
            },
        }
    }

    async fn apply_catalog_effects(&self, effects: &Effects, now: DateTime<Utc>) {
        for effect in effects {
            if let AdmissionEffect::MarkEquipmentOccupied(equipment_id) = effect {
                match self
                    .catalog
                    .set_status(*equipment_id, EquipmentStatus::Occupied, now)
                    .await
                {
                    Ok(true) => debug!(%equipment_id, "Equipment marked occupied"),
                    Ok(false) => warn!(%equipment_id, "Equipment vanished before status update"),
                    Err(err) => error!(
                        %equipment_id,
                        error = %err,
                        "Failed to mark equipment occupied; reservation already stored"
                    ),
                }
            }
        }
    }

    async fn dispatch(
        &self,
        effects: &Effects,
        to: &UserContact,
        equipment: &Equipment,
        reservation: &Reservation,
    ) {
        let details = ReservationDetails::new(equipment, reservation);
        for effect in effects {
            if let AdmissionEffect::Notify(kind) = effect {
                match self.notifier.notify(kind, to, &details).await {
                    Ok(()) => {
                        metrics::record_notification(kind.label(), "sent");
                        debug!(reservation_id = %reservation.id, kind = kind.label(), "Notification sent");
                    },
                    Err(err) => {
                        metrics::record_notification(kind.label(), "failed");
                        warn!(
                            reservation_id = %reservation.id,
                            kind = kind.label(),
                            error = %err,
                            "Notification failed; reservation unaffected"
                        );
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::availability::compute;
    use crate::types::{Capacity, CapacityUnit, EquipmentType, Location, WeeklySchedule};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn equipment(capacity: u32, status: EquipmentStatus) -> Equipment {
        Equipment {
            id: EquipmentId::new(),
            name: "Projector".to_string(),
            photo: None,
            description: "HD projector".to_string(),
            capacity: Capacity::new(capacity, CapacityUnit::Units),
            equipment_type: EquipmentType::Computing,
            location: Location::Room1,
            schedule: WeeklySchedule::default(),
            access_conditions: "Staff".to_string(),
            status,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn pending(equipment: &Equipment, quantity: u32) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            equipment_id: equipment.id,
            user_id: UserId::new(),
            window: TimeRange::new(at(9), at(10)).unwrap(),
            quantity,
            description: None,
            status: ReservationStatus::Pending,
            validated_by: None,
            validated_at: None,
            rejection_reason: None,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn free(equipment: &Equipment) -> Availability {
        compute(
            equipment,
            TimeRange::new(at(9), at(10)).unwrap(),
            &[],
            ActiveSet::PendingAndApproved.statuses(),
            None,
        )
    }

    #[test]
    fn test_manual_policy_always_pending() {
        let projector = equipment(1, EquipmentStatus::Maintenance);
        let verdict = evaluate_request(&AdmissionPolicy::manual(), &projector, &free(&projector), 1);
        assert_eq!(verdict.status, ReservationStatus::Pending);
        assert_eq!(
            verdict.effects.as_slice(),
            &[AdmissionEffect::Notify(NotificationKind::Pending)]
        );
    }

    #[test]
    fn test_auto_approves_when_capacity_fits() {
        let projector = equipment(5, EquipmentStatus::Available);
        let verdict = evaluate_request(&AdmissionPolicy::default(), &projector, &free(&projector), 5);
        assert_eq!(verdict.status, ReservationStatus::Approved);
        assert_eq!(
            verdict.effects.as_slice(),
            &[AdmissionEffect::Notify(NotificationKind::Approved)]
        );
    }

    #[test]
    fn test_legacy_policy_marks_equipment_occupied() {
        let projector = equipment(1, EquipmentStatus::Available);
        let policy = AdmissionPolicy {
            mark_occupied_on_approval: true,
            ..AdmissionPolicy::default()
        };
        let verdict = evaluate_request(&policy, &projector, &free(&projector), 1);
        assert_eq!(
            verdict.effects[0],
            AdmissionEffect::MarkEquipmentOccupied(projector.id)
        );
    }

    #[test]
    fn test_auto_rejects_non_bookable_status() {
        let projector = equipment(5, EquipmentStatus::Occupied);
        let verdict = evaluate_request(&AdmissionPolicy::default(), &projector, &free(&projector), 1);
        assert_eq!(verdict.status, ReservationStatus::Rejected);
        assert_eq!(verdict.rejection_reason.as_deref(), Some("equipment is Occupied"));
    }

    #[test]
    fn test_auto_rejects_insufficient_capacity() {
        let projector = equipment(5, EquipmentStatus::Available);
        let mut availability = free(&projector);
        availability.capacity_used = 3;
        availability.capacity_available = 2;
        let verdict = evaluate_request(&AdmissionPolicy::default(), &projector, &availability, 3);
        assert_eq!(verdict.status, ReservationStatus::Rejected);
        assert_eq!(
            verdict.rejection_reason.as_deref(),
            Some("insufficient capacity: requested 3, available 2")
        );
    }

    #[test]
    fn test_reject_decision_stamps_validator_and_reason() {
        let projector = equipment(1, EquipmentStatus::Available);
        let mut reservation = pending(&projector, 1);
        let admin = UserId::new();
        let effects = apply_decision(
            &AdmissionPolicy::default(),
            &mut reservation,
            &Decision::Reject {
                reason: Some(" Scheduled maintenance ".to_string()),
            },
            None,
            admin,
            at(8),
        )
        .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Rejected);
        assert_eq!(reservation.validated_by, Some(admin));
        assert_eq!(reservation.validated_at, Some(at(8)));
        assert_eq!(reservation.rejection_reason.as_deref(), Some("Scheduled maintenance"));
        assert_eq!(
            effects.as_slice(),
            &[AdmissionEffect::Notify(NotificationKind::Rejected {
                reason: Some("Scheduled maintenance".to_string())
            })]
        );
    }

    #[test]
    fn test_approve_conflict_leaves_reservation_pending() {
        let projector = equipment(2, EquipmentStatus::Available);
        let mut reservation = pending(&projector, 2);
        let mut availability = free(&projector);
        availability.capacity_available = 1;
        let before = reservation.clone();
        let err = apply_decision(
            &AdmissionPolicy::default(),
            &mut reservation,
            &Decision::Approve,
            Some(&availability),
            UserId::new(),
            at(8),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BookingError::Conflict {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(reservation, before);
    }

    #[test]
    fn test_decisions_require_pending() {
        let projector = equipment(1, EquipmentStatus::Available);
        let mut reservation = pending(&projector, 1);
        reservation.status = ReservationStatus::Approved;
        let err = apply_decision(
            &AdmissionPolicy::default(),
            &mut reservation,
            &Decision::Reject { reason: None },
            None,
            UserId::new(),
            at(8),
        )
        .unwrap_err();
        assert!(matches!(err, BookingError::InvalidState { .. }));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(positive_quantity(0).is_err());
        assert!(positive_quantity(-3).is_err());
        assert_eq!(positive_quantity(4).unwrap(), 4);
        let projector = equipment(3, EquipmentStatus::Available);
        assert!(within_capacity(&projector, 3).is_ok());
        assert!(matches!(
            within_capacity(&projector, 4),
            Err(BookingError::InvalidQuantity { requested: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_locks_serialize_same_equipment() {
        let locks = Arc::new(EquipmentLocks::default());
        let id = EquipmentId::new();
        let first = locks.acquire(id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        let _other = locks.acquire(EquipmentId::new()).await;
        drop(first);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_lock_slots_pruned_once_idle() {
        let locks = Arc::new(EquipmentLocks::default());
        let id = EquipmentId::new();
        let first = locks.acquire(id).await;
        assert_eq!(locks.len(), 1);

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(first);
        // The waiting task still refers to the slot
        contender.await.unwrap();
        assert_eq!(locks.len(), 0);

        let held = locks.acquire(id).await;
        let gave_up =
            tokio::time::timeout(std::time::Duration::from_millis(10), locks.acquire(id)).await;
        assert!(gave_up.is_err());
        drop(held);
        assert_eq!(locks.len(), 0);

        let (a, b) = (EquipmentId::new(), EquipmentId::new());
        let both = locks.acquire_all(&[b, a, b]).await;
        assert_eq!(both.held.len(), 2);
        assert!(both.held[0].0 < both.held[1].0);
        drop(both);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_equipment_leaves_no_lock_slot() {
        let catalog = crate::memory::InMemoryEquipmentCatalog::new();
        let controller = AdmissionController::new(
            Arc::new(catalog.clone()),
            Arc::new(crate::memory::InMemoryReservationStore::new()),
            Arc::new(crate::memory::InMemoryUserDirectory::new()),
            Arc::new(crate::notifier::ConsoleNotifier),
            Arc::new(crate::clock::SystemClock),
            AdmissionPolicy::default(),
        );
        let requester = CurrentUser {
            id: UserId::new(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            role: crate::identity::Role::user(),
        };
        let request = |equipment_id| ReservationRequest {
            equipment_id,
            start_date: at(9),
            end_date: at(10),
            quantity: 1,
            description: None,
        };

        for _ in 0..100 {
            let err = controller
                .create_reservation(&requester, request(EquipmentId::new()))
                .await
                .unwrap_err();
            assert!(matches!(err, BookingError::NotFound { entity: "Equipment", .. }));
        }
        assert_eq!(controller.locks.len(), 0);

        let projector = equipment(1, EquipmentStatus::Available);
        catalog.insert(projector.clone()).await.unwrap();
        let created = controller
            .create_reservation(&requester, request(projector.id))
            .await
            .unwrap();
        assert_eq!(created.status, ReservationStatus::Approved);
        assert_eq!(controller.locks.len(), 0);
    }
}
