//! Timer records and the lifecycle service built on top of them.

mod record;
mod service;

pub use record::{TimerRecord, MAX_DURATION_MS};
pub use service::TimerService;
