//! Event types emitted by the timer service.
//!
//! Every store mutation and expiry produces an [`Event`]. The CLI prints
//! them as JSON; a GUI layer would subscribe to the same stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A state change in the timer collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerCreated {
        id: i64,
        name: String,
        duration_ms: i64,
        at: DateTime<Utc>,
    },
    TimerStarted {
        id: i64,
        name: String,
        remaining_ms: i64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        id: i64,
        name: String,
        remaining_ms: i64,
        at: DateTime<Utc>,
    },
    TimerReset {
        id: i64,
        name: String,
        at: DateTime<Utc>,
    },
    /// A running countdown reached zero.
    TimerExpired {
        id: i64,
        name: String,
        at: DateTime<Utc>,
    },
    TimerDeleted {
        id: i64,
        at: DateTime<Utc>,
    },
    NotifyChanged {
        id: i64,
        enabled: bool,
        at: DateTime<Utc>,
    },
    DefinitionUpdated {
        id: i64,
        name: String,
        duration_ms: i64,
        at: DateTime<Utc>,
    },
}
