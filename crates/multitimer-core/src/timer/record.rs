//! Timer record model.
//!
//! A [`TimerRecord`] is one user-defined countdown as persisted by the
//! store. Remaining time is tracked as a checkpoint plus an optional
//! wall-clock anchor: while a timer runs, the live remaining time derives
//! from `started_at`, so a suspended process resumes without drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvalidRecord;

/// Upper bound for a timer duration: one hundred years in milliseconds.
///
/// Caps the deadlines derived from `remaining_ms` so the wall-clock
/// arithmetic on them stays inside chrono's representable range.
pub const MAX_DURATION_MS: i64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// One user-defined countdown timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Store-assigned identifier, stable for the record's lifetime.
    pub id: i64,
    pub name: String,
    /// Full duration in milliseconds; the value a reset restores.
    pub duration_ms: i64,
    /// Remaining milliseconds at the last persisted checkpoint.
    pub remaining_ms: i64,
    pub is_running: bool,
    /// Whether expiry of this timer may trigger a wake-up notification.
    pub notify_enabled: bool,
    /// Anchor instant for elapsed-time arithmetic; `None` unless running.
    ///
    /// On resume the anchor is back-dated by the already-consumed portion,
    /// so `duration_ms` minus the elapsed time since the anchor is always
    /// the live remaining time.
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerRecord {
    /// True when expiry of this timer should arm a wake-up: it is running
    /// and notifications are enabled for it.
    pub fn qualifies(&self) -> bool {
        self.is_running && self.notify_enabled
    }

    /// Live remaining milliseconds at `now`.
    ///
    /// Running timers derive this from the anchor, clamped into
    /// `[0, duration_ms]`; stopped timers report the checkpoint unchanged.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> i64 {
        match (self.is_running, self.started_at) {
            (true, Some(anchor)) => {
                let elapsed = (now - anchor).num_milliseconds();
                (self.duration_ms - elapsed).clamp(0, self.duration_ms.max(0))
            }
            _ => self.remaining_ms,
        }
    }

    /// Checks the record against the store invariants.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if self.name.trim().is_empty() {
            return Err(InvalidRecord::EmptyName);
        }
        if self.duration_ms <= 0 {
            return Err(InvalidRecord::NonPositiveDuration {
                duration_ms: self.duration_ms,
            });
        }
        if self.duration_ms > MAX_DURATION_MS {
            return Err(InvalidRecord::DurationTooLong {
                duration_ms: self.duration_ms,
            });
        }
        if self.remaining_ms < 0 {
            return Err(InvalidRecord::NegativeRemaining {
                remaining_ms: self.remaining_ms,
            });
        }
        if self.remaining_ms > self.duration_ms {
            return Err(InvalidRecord::RemainingExceedsDuration {
                remaining_ms: self.remaining_ms,
                duration_ms: self.duration_ms,
            });
        }
        if self.is_running && self.started_at.is_none() {
            return Err(InvalidRecord::RunningWithoutAnchor);
        }
        Ok(())
    }
}
