//! Business metrics for equipment booking.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_reservations_created_total{status}` - Reservations created, by initial status
//! - `booking_reservation_decisions_total{decision}` - Admin decisions (approved, rejected)
//! - `booking_admission_conflicts_total` - Approvals refused for lack of capacity
//! - `booking_notifications_total{kind,outcome}` - Notification attempts
//! - `booking_availability_queries_total{scope}` - Availability reads (single, all)
//!
//! ## Histograms
//! - `booking_reservation_quantity` - Quantity requested per reservation

use crate::types::ReservationStatus;
use metrics::{describe_counter, describe_histogram};

/// Register all metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn describe_metrics() {
    describe_counter!(
        "booking_reservations_created_total",
        "Total number of reservations created, by initial status (pending, approved, rejected)"
    );
    describe_counter!(
        "booking_reservation_decisions_total",
        "Total number of administrator decisions by outcome"
    );
    describe_counter!(
        "booking_admission_conflicts_total",
        "Approvals refused because capacity was exhausted"
    );
    describe_counter!(
        "booking_notifications_total",
        "Notification attempts by kind and outcome (sent, failed, skipped)"
    );
    describe_counter!(
        "booking_availability_queries_total",
        "Availability queries by scope (single, all)"
    );
    describe_histogram!(
        "booking_reservation_quantity",
        "Quantity requested per reservation"
    );

    tracing::info!("Booking metrics registered");
}

/// Record a reservation created with its initial status.
pub fn record_reservation_created(status: ReservationStatus, quantity: u32) {
    metrics::counter!("booking_reservations_created_total", "status" => status.as_str()).increment(1);
    metrics::histogram!("booking_reservation_quantity").record(f64::from(quantity));
}

/// Record an administrator decision.
pub fn record_decision(status: ReservationStatus) {
    metrics::counter!("booking_reservation_decisions_total", "decision" => status.as_str())
        .increment(1);
}

/// Record an approval refused for lack of capacity.
pub fn record_conflict() {
    metrics::counter!("booking_admission_conflicts_total").increment(1);
}

/// Record a notification attempt.
pub fn record_notification(kind: &'static str, outcome: &'static str) {
    metrics::counter!("booking_notifications_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

/// Record an availability query.
pub fn record_availability_query(scope: &'static str) {
    metrics::counter!("booking_availability_queries_total", "scope" => scope).increment(1);
}
