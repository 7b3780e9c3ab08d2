//! # Equipment Booking Core
//!
//! Domain model and business rules for booking shared physical equipment.
//!
//! ## Components
//!
//! - **Resource Catalog** ([`catalog`]): equipment records with a status
//!   flag and a quantitative capacity
//! - **Reservation Store** ([`reservations`]): reservation records and the
//!   overlap query the engine relies on
//! - **Availability Engine** ([`availability`]): remaining capacity of an
//!   equipment over a time window
//! - **Admission Controller** ([`admission`]): the `pending → {approved,
//!   rejected}` lifecycle, conflict checks and notifications
//! - **Notifier** ([`notifier`]): status emails to requesters
//!
//! ## Architecture
//!
//! Decisions are pure functions over loaded state that return effect
//! descriptions ([`admission::evaluate_request`],
//! [`admission::apply_decision`]). The controller is the imperative shell
//! that loads, persists and executes those effects. Storage, time and
//! delivery are injected through traits so the same rules run against the
//! in-memory stores in [`memory`] or a database backend.
//!
//! ## Example
//!
//! ```ignore
//! let controller = AdmissionController::new(
//!     catalog, reservations, directory, notifier,
//!     Arc::new(SystemClock),
//!     AdmissionPolicy::default(),
//! );
//! let reservation = controller.create_reservation(&user, request).await?;
//! ```

#[macro_use]
mod macros;

pub mod admission;
pub mod availability;
pub mod catalog;
pub mod clock;
pub mod directory;
pub mod error;
pub mod identity;
pub mod memory;
pub mod metrics;
pub mod notifier;
pub mod reservations;
pub mod types;

pub use admission::{
    AdmissionController, AdmissionPolicy, Decision, ReservationChanges, ReservationQuery,
    ReservationRequest,
};
pub use availability::{ActiveSet, Availability, AvailabilityEngine};
pub use catalog::{CatalogService, EquipmentCatalog, EquipmentFilter, EquipmentInput};
pub use clock::{Clock, SystemClock};
pub use directory::UserDirectory;
pub use error::{BookingError, ErrorCategory};
pub use identity::{CurrentUser, Permission, Role, UserContact};
pub use notifier::{ConsoleNotifier, EmailMessage, NotificationKind, Notifier, NotifyError};
pub use reservations::{ReservationFilter, ReservationStats, ReservationStore};
pub use types::{
    Capacity, CapacityUnit, Equipment, EquipmentId, EquipmentStatus, EquipmentType, Location,
    Reservation, ReservationId, ReservationStatus, TimeRange, UserId, WeeklySchedule,
};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
