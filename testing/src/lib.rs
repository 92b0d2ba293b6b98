//! # Ausflug Testing
//!
//! Testing utilities for the AusflugÄgypten backend.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits (clock, code generator)
//! - [`InMemoryStore`], implementing every repository port with the same unique constraints
//!   as the Postgres schema
//! - A recording payment provider and notifier
//! - Fixtures and a fully wired [`TestContext`]
//! - Reducer test harness and property-based strategies
//!
//! ## Example
//!
//! ```ignore
//! use ausflug_testing::{TestContext, fixtures};
//!
//! #[tokio::test]
//! async fn inquiry_is_stored_pending() {
//!     let ctx = TestContext::new();
//!     let tour = ctx.store.seed_item(fixtures::tour());
//!
//!     let booking = ctx.inquiries.submit(&fixtures::inquiry_form(tour.id)).await.unwrap();
//!
//!     assert_eq!(booking.status, BookingStatus::Pending);
//!     assert_eq!(ctx.store.bookings().len(), 1);
//! }
//! ```

use ausflug_core::confirmation::ConfirmationCode;
use ausflug_core::environment::{Clock, CodeGenerator};
use chrono::{DateTime, Utc};

pub mod fixtures;
pub mod memory;
pub mod notifier;
pub mod properties;
pub mod provider;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, CodeGenerator, ConfirmationCode, DateTime, Utc};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time until moved with [`FixedClock::set`]. Clones share
    /// the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use ausflug_testing::mocks::FixedClock;
    /// use ausflug_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Moves the clock.
        ///
        /// # Panics
        ///
        /// Panics if the lock is poisoned.
        #[allow(clippy::unwrap_used)]
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
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

    /// Hands out queued codes first, random ones afterwards.
    #[derive(Debug, Clone, Default)]
    pub struct SequenceCodeGenerator {
        queue: Arc<Mutex<VecDeque<ConfirmationCode>>>,
    }

    impl SequenceCodeGenerator {
        /// A generator that returns `codes` in order.
        #[must_use]
        pub fn new(codes: impl IntoIterator<Item = ConfirmationCode>) -> Self {
            Self {
                queue: Arc::new(Mutex::new(codes.into_iter().collect())),
            }
        }

        /// Queues more codes.
        ///
        /// # Panics
        ///
        /// Panics if the lock is poisoned.
        #[allow(clippy::unwrap_used)]
        pub fn push(&self, code: ConfirmationCode) {
            self.queue.lock().unwrap().push_back(code);
        }
    }

    impl CodeGenerator for SequenceCodeGenerator {
        #[allow(clippy::unwrap_used)]
        fn next_code(&self) -> ConfirmationCode {
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(ConfirmationCode::random)
        }
    }
}

/// Installs a test-writer tracing subscriber once per process.
///
/// Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

// Re-export commonly used items
pub use fixtures::TestContext;
pub use memory::InMemoryStore;
pub use mocks::{FixedClock, SequenceCodeGenerator, test_clock};
pub use notifier::RecordingNotifier;
pub use provider::MockPaymentProvider;
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn fixed_clock_clones_move_together() {
        let clock = test_clock();
        let shared = clock.clone();
        let later = clock.now() + Duration::days(2);
        clock.set(later);
        assert_eq!(shared.now(), later);
    }

    #[test]
    fn sequence_generator_falls_back_to_random() {
        let first = ConfirmationCode::parse("AE-00000001").unwrap();
        let codes = SequenceCodeGenerator::new([first.clone()]);
        assert_eq!(codes.next_code(), first);
        assert_ne!(codes.next_code(), first);
    }
}
