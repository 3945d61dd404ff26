//! Alarm scheduling: selection of the next wake-up and the wake-service
//! boundary it is issued through.

mod scheduler;
mod wake;

pub use scheduler::{next_wake, AlarmDecision, AlarmScheduler};
pub use wake::{ArmedWake, DbWakeService, NoopWakeService, WakeService};

#[cfg(any(test, feature = "test-support"))]
pub use wake::{FakeWakeService, WakeCall};
