//! Foreground countdown runner.
//!
//! Each pass delivers the armed wake-up as a desktop notification once
//! its deadline passes, then ticks the timer service and prints emitted
//! events as JSON. Errors inside the loop are logged and retried on the
//! next tick; they never take the loop down.

use std::error::Error;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use multitimer_core::storage::Config;
use multitimer_core::DbWakeService;
use tracing::{debug, info, warn};

use super::open_service;

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::load_or_default();
    let mut service = open_service(&config)?;

    // Delivery polls the same slot through its own connection.
    let mut delivery = if config.notifications.enabled {
        Some(DbWakeService::open()?)
    } else {
        None
    };

    info!(tick_ms = config.watch.tick_ms, "watch loop started");
    loop {
        // Poll before ticking: the tick's rearm supersedes a due slot.
        if let Some(delivery) = delivery.as_mut() {
            match delivery.take_due(Utc::now()) {
                Ok(Some(wake)) => deliver(&wake.label),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "cannot poll wake slot"),
            }
        }

        match service.tick() {
            Ok(events) => {
                for event in events {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!(error = %e, "cannot serialize event"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "tick failed, retrying next interval"),
        }

        thread::sleep(Duration::from_millis(config.watch.tick_ms.max(100)));
    }
}

/// Shows the expiry notification. Failures are logged, never fatal.
fn deliver(label: &str) {
    debug!(label, "delivering wake-up notification");
    match notify_rust::Notification::new()
        .summary("Time's up")
        .body(label)
        .show()
    {
        Ok(_) => info!(label, "notification delivered"),
        Err(e) => warn!(label, error = %e, "desktop notification failed"),
    }
}
