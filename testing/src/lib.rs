//! # Equipment Booking Testing
//!
//! Testing utilities for the equipment booking service.
//!
//! This crate provides:
//! - Deterministic doubles for the injected collaborators ([`mocks`])
//! - Builders for catalog records and authenticated users ([`fixtures`])
//! - A fully wired in-memory controller ([`BookingHarness`])
//!
//! ## Example
//!
//! ```ignore
//! use equipment_booking_testing::{BookingHarness, fixtures};
//!
//! #[tokio::test]
//! async fn test_single_unit_projector() {
//!     let harness = BookingHarness::new();
//!     let projector = harness.add_equipment(fixtures::projector()).await;
//!     let alice = fixtures::users::member("alice");
//!
//!     let first = harness.controller.create_reservation(&alice, harness.request(&projector, 9, 10, 1)).await?;
//!     assert_eq!(first.status, ReservationStatus::Approved);
//! }
//! ```

pub mod fixtures;
mod harness;

pub use harness::BookingHarness;

use chrono::{DateTime, Utc};
use equipment_booking_core::clock::Clock;

/// Mock implementations of injected collaborators.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use async_trait::async_trait;
    use equipment_booking_core::notifier::{EmailMessage, Notifier, NotifyError};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use equipment_booking_testing::mocks::FixedClock;
    /// use equipment_booking_core::clock::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Notifier that captures every message instead of delivering it.
    ///
    /// Clones share the same outbox, so a test can keep one handle and give
    /// another to the controller.
    #[derive(Clone, Debug, Default)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<EmailMessage>>>,
        failing: bool,
    }

    impl RecordingNotifier {
        /// Create a notifier that accepts every message
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a notifier whose transport always fails.
        ///
        /// Attempts are still recorded.
        #[must_use]
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        /// All messages handed to the notifier, in order
        #[must_use]
        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Subjects of all messages, in order
        #[must_use]
        pub fn subjects(&self) -> Vec<String> {
            self.sent().into_iter().map(|m| m.subject).collect()
        }

        /// Number of recorded messages
        #[must_use]
        pub fn len(&self) -> usize {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Whether nothing was recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Clear the outbox (for test isolation)
        pub fn clear(&self) {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message);
            if self.failing {
                return Err(NotifyError::Transport("connection refused".to_string()));
            }
            Ok(())
        }
    }
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; output is captured by the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, RecordingNotifier, test_clock};
