//! Wake-service boundary.
//!
//! The alarm scheduler never talks to a platform alarm API directly; it
//! is handed a [`WakeService`] capability owning the single pending
//! wake-up slot. Arming replaces whatever was pending, so at most one
//! wake-up is outstanding at any time.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, WakeError};
use crate::storage::{data_dir, open_connection, DB_FILE};

/// A pending one-shot wake-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmedWake {
    pub deadline: DateTime<Utc>,
    /// Display name of the timer the wake-up fires for.
    pub label: String,
}

/// One-shot wake-up capability consumed by the alarm scheduler.
///
/// Implementations own a single pending slot: `arm` atomically replaces
/// any previously pending wake-up, and `cancel` clears the slot, doing
/// nothing when the slot is already empty.
pub trait WakeService {
    fn arm(&mut self, deadline: DateTime<Utc>, label: &str) -> Result<(), WakeError>;
    fn cancel(&mut self) -> Result<(), WakeError>;
}

impl WakeService for Box<dyn WakeService> {
    fn arm(&mut self, deadline: DateTime<Utc>, label: &str) -> Result<(), WakeError> {
        (**self).arm(deadline, label)
    }

    fn cancel(&mut self) -> Result<(), WakeError> {
        (**self).cancel()
    }
}

/// Wake-service that persists the armed slot in the database.
///
/// The slot is a single keyed row, so `INSERT OR REPLACE` both arms and
/// supersedes in one statement. Delivery is not handled here: the watch
/// loop polls [`take_due`](Self::take_due) and fires the user-visible
/// notification itself.
pub struct DbWakeService {
    conn: Connection,
}

impl DbWakeService {
    /// Opens the slot in the shared database under the data directory.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join(DB_FILE);
        Self::open_at(&path)
    }

    /// Opens the slot in the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = open_connection(path)?;
        Ok(Self { conn })
    }

    /// In-memory slot, for tests.
    #[cfg(any(test, feature = "test-support"))]
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        crate::storage::migrations::migrate(&conn)
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Currently armed wake-up, if any.
    pub fn armed(&self) -> Result<Option<ArmedWake>, StoreError> {
        let row = self
            .conn
            .query_row("SELECT deadline, label FROM wake_slot", [], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .optional()?;

        let Some((raw_deadline, label)) = row else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw_deadline) {
            Ok(deadline) => Ok(Some(ArmedWake {
                deadline: deadline.with_timezone(&Utc),
                label,
            })),
            Err(e) => {
                warn!(deadline = %raw_deadline, error = %e, "dropping unreadable wake slot");
                self.conn.execute("DELETE FROM wake_slot", [])?;
                Ok(None)
            }
        }
    }

    /// Removes and returns the armed wake-up once its deadline has passed.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Result<Option<ArmedWake>, StoreError> {
        let Some(armed) = self.armed()? else {
            return Ok(None);
        };
        if armed.deadline > now {
            return Ok(None);
        }
        self.conn.execute("DELETE FROM wake_slot", [])?;
        Ok(Some(armed))
    }
}

impl WakeService for DbWakeService {
    fn arm(&mut self, deadline: DateTime<Utc>, label: &str) -> Result<(), WakeError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO wake_slot (slot, deadline, label) VALUES (0, ?1, ?2)",
                params![deadline.to_rfc3339(), label],
            )
            .map_err(|e| WakeError::Denied(e.to_string()))?;
        debug!(%deadline, label, "armed wake-up");
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), WakeError> {
        self.conn
            .execute("DELETE FROM wake_slot", [])
            .map_err(|e| WakeError::Denied(e.to_string()))?;
        debug!("cleared wake-up slot");
        Ok(())
    }
}

/// Wake-service that discards every request.
///
/// Used when notifications are disabled in the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWakeService;

impl NoopWakeService {
    pub fn new() -> Self {
        Self
    }
}

impl WakeService for NoopWakeService {
    fn arm(&mut self, _deadline: DateTime<Utc>, _label: &str) -> Result<(), WakeError> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), WakeError> {
        Ok(())
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;

    use crate::error::WakeError;

    use super::{ArmedWake, WakeService};

    /// One recorded wake-service request.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum WakeCall {
        Arm {
            deadline: DateTime<Utc>,
            label: String,
        },
        Cancel,
    }

    #[derive(Default)]
    struct FakeWakeState {
        calls: Vec<WakeCall>,
        armed: Option<ArmedWake>,
        deny: Option<String>,
    }

    /// In-memory wake-service that records every request.
    ///
    /// Clones share state, so a test can keep a handle for assertions
    /// while the scheduler owns another.
    #[derive(Clone, Default)]
    pub struct FakeWakeService {
        state: Arc<Mutex<FakeWakeState>>,
    }

    impl FakeWakeService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every request seen so far, in order.
        pub fn calls(&self) -> Vec<WakeCall> {
            self.state.lock().calls.clone()
        }

        /// The wake-up the slot currently holds.
        pub fn armed(&self) -> Option<ArmedWake> {
            self.state.lock().armed.clone()
        }

        pub fn arm_count(&self) -> usize {
            self.state
                .lock()
                .calls
                .iter()
                .filter(|c| matches!(c, WakeCall::Arm { .. }))
                .count()
        }

        pub fn cancel_count(&self) -> usize {
            self.state
                .lock()
                .calls
                .iter()
                .filter(|c| matches!(c, WakeCall::Cancel))
                .count()
        }

        /// Makes every subsequent request fail with the given reason.
        pub fn deny_with(&self, reason: &str) {
            self.state.lock().deny = Some(reason.to_string());
        }
    }

    impl WakeService for FakeWakeService {
        fn arm(&mut self, deadline: DateTime<Utc>, label: &str) -> Result<(), WakeError> {
            let mut state = self.state.lock();
            if let Some(reason) = &state.deny {
                return Err(WakeError::Denied(reason.clone()));
            }
            state.calls.push(WakeCall::Arm {
                deadline,
                label: label.to_string(),
            });
            state.armed = Some(ArmedWake {
                deadline,
                label: label.to_string(),
            });
            Ok(())
        }

        fn cancel(&mut self) -> Result<(), WakeError> {
            let mut state = self.state.lock();
            if let Some(reason) = &state.deny {
                return Err(WakeError::Denied(reason.clone()));
            }
            state.calls.push(WakeCall::Cancel);
            state.armed = None;
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWakeService, WakeCall};
