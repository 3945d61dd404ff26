pub mod config;
pub mod timer;
pub mod watch;

use std::error::Error;

use multitimer_core::storage::Config;
use multitimer_core::{
    DbWakeService, NoopWakeService, SystemClock, TimerService, TimerStore, WakeService,
};

/// Opens the timer service the way every command needs it: store from the
/// data directory, wake-service picked by configuration.
pub fn open_service(
    config: &Config,
) -> Result<TimerService<Box<dyn WakeService>, SystemClock>, Box<dyn Error>> {
    let store = TimerStore::open()?;
    let wake: Box<dyn WakeService> = if config.notifications.enabled {
        Box::new(DbWakeService::open()?)
    } else {
        // A wake-up armed before notifications were disabled must not
        // outlive the switch.
        let mut slot = DbWakeService::open()?;
        slot.cancel()?;
        Box::new(NoopWakeService::new())
    };
    Ok(TimerService::new(store, wake, SystemClock))
}
