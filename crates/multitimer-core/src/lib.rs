//! # MultiTimer Core Library
//!
//! Core business logic for MultiTimer, a multi-countdown timer
//! application. CLI-first: every operation is available through the
//! standalone CLI binary, and a GUI layer would sit on top of the same
//! library.
//!
//! ## Architecture
//!
//! - **Timer store**: SQLite-backed records, the single source of truth
//! - **Alarm scheduler**: keeps at most one wake-up armed, always for the
//!   soonest running, notification-enabled timer
//! - **Wake-service**: injected capability owning the single wake-up slot
//! - **Timer service**: composes each user action out of store writes and
//!   finishes it with the snapshot-read + recompute pair
//!
//! ## Key Components
//!
//! - [`TimerService`]: high-level operations (create, start, pause, ...)
//! - [`TimerStore`]: persistence for [`TimerRecord`]s
//! - [`AlarmScheduler`] / [`next_wake`]: next-alarm selection
//! - [`WakeService`]: the wake-up boundary, with database-backed and
//!   no-op implementations
//! - [`Config`]: TOML configuration with dot-path access

pub mod alarm;
pub mod clock;
pub mod error;
pub mod events;
pub mod storage;
pub mod time_fmt;
pub mod timer;

pub use alarm::{
    next_wake, AlarmDecision, AlarmScheduler, ArmedWake, DbWakeService, NoopWakeService,
    WakeService,
};
pub use clock::{Clock, SystemClock};
pub use error::{
    AlarmError, ConfigError, CoreError, InvalidRecord, Result, StoreError, WakeError,
};
pub use events::Event;
pub use storage::{data_dir, Config, TimerStore};
pub use timer::{TimerRecord, TimerService, MAX_DURATION_MS};

#[cfg(any(test, feature = "test-support"))]
pub use alarm::{FakeWakeService, WakeCall};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
