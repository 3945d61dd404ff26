//! Wall-clock abstraction.
//!
//! Wake-ups are armed at absolute wall-clock instants, so the clock deals
//! in `DateTime<Utc>` rather than monotonic instants. Production code uses
//! [`SystemClock`]; tests drive time by hand with [`FakeClock`].

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use parking_lot::Mutex;

    use super::Clock;

    /// Manually driven clock for deterministic tests.
    ///
    /// Clones share the same underlying instant, so a test can keep one
    /// handle while the code under test holds another.
    #[derive(Debug, Clone)]
    pub struct FakeClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FakeClock {
        /// Starts at a fixed, arbitrary instant.
        pub fn new() -> Self {
            Self::at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
        }

        /// Starts at the given instant.
        pub fn at(now: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        /// Moves the clock forward.
        pub fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }

        /// Jumps the clock to an exact instant.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.now.lock() = to;
        }
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeClock;
