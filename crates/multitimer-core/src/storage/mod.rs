//! Persistence layer: data directory, SQLite timer store, configuration.

mod config;
pub mod migrations;
mod timers;

pub use config::{Config, NotificationsConfig, TimersConfig, WatchConfig};
pub use timers::TimerStore;

pub(crate) use timers::open_connection;

use std::path::PathBuf;

/// Database file name inside the data directory.
pub(crate) const DB_FILE: &str = "multitimer.db";

/// Returns the data directory, creating it if needed.
///
/// `MULTITIMER_DATA_DIR` overrides the location entirely (the CLI tests
/// rely on this for isolation). Otherwise the directory is
/// `~/.config/multitimer`, or `~/.config/multitimer-dev` when
/// `MULTITIMER_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    if let Ok(dir) = std::env::var("MULTITIMER_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");
    let env = std::env::var("MULTITIMER_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base_dir.join("multitimer-dev")
    } else {
        base_dir.join("multitimer")
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
