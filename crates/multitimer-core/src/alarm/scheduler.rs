//! Next-alarm selection and scheduling.
//!
//! At most one system wake-up is armed at any time, and it always belongs
//! to the soonest timer that is both running and notification-enabled.
//! Every timer mutation is followed by a fresh snapshot read and a
//! [`AlarmScheduler::rearm`] call, which either arms the single wake-up
//! slot or clears it.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::error::AlarmError;
use crate::storage::TimerStore;
use crate::timer::TimerRecord;

use super::wake::WakeService;

/// Outcome of a recompute: what the wake-service was told to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmDecision {
    /// One qualifying timer was selected and a wake-up armed for it.
    Armed {
        timer_id: i64,
        label: String,
        deadline: DateTime<Utc>,
    },
    /// No qualifying timer; any pending wake-up was cancelled.
    Cleared,
}

/// Selects the timer the next wake-up should fire for.
///
/// A linear scan keeping the strictly smallest remaining time, so equal
/// candidates resolve to the earliest one in snapshot order. Malformed
/// records are skipped with a warning rather than failing the whole
/// recompute over one bad row.
pub fn next_wake(timers: &[TimerRecord]) -> Option<&TimerRecord> {
    let mut best: Option<&TimerRecord> = None;
    for timer in timers {
        if let Err(reason) = timer.validate() {
            warn!(id = timer.id, %reason, "skipping malformed timer record");
            continue;
        }
        if !timer.qualifies() {
            continue;
        }
        if best.map_or(true, |b| timer.remaining_ms < b.remaining_ms) {
            best = Some(timer);
        }
    }
    best
}

/// Owns the injected wake-service and keeps it holding the right wake-up.
pub struct AlarmScheduler<W: WakeService> {
    wake: W,
}

impl<W: WakeService> AlarmScheduler<W> {
    pub fn new(wake: W) -> Self {
        Self { wake }
    }

    /// Recomputes the wake-up for `timers` and issues the single arm or
    /// cancel call.
    ///
    /// Safe to repeat with an unchanged snapshot: an identical arm request
    /// replaces itself, and cancelling an empty slot is a no-op. A deadline
    /// that would land outside the representable time range clears the slot
    /// instead of arming.
    ///
    /// # Errors
    /// [`AlarmError::SchedulingDenied`] when the wake-service refuses.
    pub fn rearm(
        &mut self,
        timers: &[TimerRecord],
        now: DateTime<Utc>,
    ) -> Result<AlarmDecision, AlarmError> {
        match next_wake(timers) {
            Some(timer) => {
                let deadline =
                    match now.checked_add_signed(Duration::milliseconds(timer.remaining_ms)) {
                        Some(deadline) => deadline,
                        None => {
                            warn!(
                                id = timer.id,
                                remaining_ms = timer.remaining_ms,
                                "wake-up deadline out of range, clearing instead"
                            );
                            self.wake.cancel()?;
                            return Ok(AlarmDecision::Cleared);
                        }
                    };
                self.wake.arm(deadline, &timer.name)?;
                debug!(id = timer.id, name = %timer.name, %deadline, "armed next wake-up");
                Ok(AlarmDecision::Armed {
                    timer_id: timer.id,
                    label: timer.name.clone(),
                    deadline,
                })
            }
            None => {
                self.wake.cancel()?;
                debug!("no qualifying timer, wake-up cleared");
                Ok(AlarmDecision::Cleared)
            }
        }
    }

    /// Reads a fresh snapshot from the store, then [`rearm`](Self::rearm).
    ///
    /// # Errors
    /// [`AlarmError::StoreUnavailable`] when the snapshot read fails. The
    /// wake-service is not touched in that case, so whatever was armed
    /// before is still armed.
    pub fn rearm_from_store(
        &mut self,
        store: &TimerStore,
        now: DateTime<Utc>,
    ) -> Result<AlarmDecision, AlarmError> {
        let timers = store.list()?;
        self.rearm(&timers, now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use crate::alarm::wake::{FakeWakeService, WakeCall};

    use super::*;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn running(id: i64, name: &str, remaining_ms: i64) -> TimerRecord {
        TimerRecord {
            id,
            name: name.to_string(),
            duration_ms: 600_000,
            remaining_ms,
            is_running: true,
            notify_enabled: true,
            started_at: Some(noon()),
        }
    }

    fn stopped(id: i64, name: &str, remaining_ms: i64) -> TimerRecord {
        TimerRecord {
            id,
            name: name.to_string(),
            duration_ms: 600_000,
            remaining_ms,
            is_running: false,
            notify_enabled: true,
            started_at: None,
        }
    }

    fn scheduler() -> (AlarmScheduler<FakeWakeService>, FakeWakeService) {
        let fake = FakeWakeService::new();
        (AlarmScheduler::new(fake.clone()), fake)
    }

    #[test]
    fn arms_the_minimum_remaining_timer() {
        let (mut scheduler, fake) = scheduler();
        let timers = vec![running(1, "pasta", 5000), running(2, "tea", 3000)];

        let decision = scheduler.rearm(&timers, noon()).unwrap();

        assert_eq!(
            decision,
            AlarmDecision::Armed {
                timer_id: 2,
                label: "tea".to_string(),
                deadline: noon() + Duration::milliseconds(3000),
            }
        );
        assert_eq!(fake.arm_count(), 1);
        assert_eq!(fake.cancel_count(), 0);
        assert_eq!(fake.armed().unwrap().label, "tea");
    }

    #[test]
    fn skips_notification_disabled_timers() {
        let (mut scheduler, fake) = scheduler();
        let mut muted = running(2, "tea", 3000);
        muted.notify_enabled = false;
        let timers = vec![running(1, "pasta", 5000), muted];

        let decision = scheduler.rearm(&timers, noon()).unwrap();

        assert_eq!(
            decision,
            AlarmDecision::Armed {
                timer_id: 1,
                label: "pasta".to_string(),
                deadline: noon() + Duration::milliseconds(5000),
            }
        );
        assert_eq!(fake.armed().unwrap().label, "pasta");
    }

    #[test]
    fn clears_when_nothing_qualifies() {
        let (mut scheduler, fake) = scheduler();
        let timers = vec![stopped(1, "pasta", 5000), stopped(2, "tea", 3000)];

        let decision = scheduler.rearm(&timers, noon()).unwrap();

        assert_eq!(decision, AlarmDecision::Cleared);
        assert_eq!(fake.calls(), vec![WakeCall::Cancel]);
    }

    #[test]
    fn clears_on_an_empty_snapshot() {
        let (mut scheduler, fake) = scheduler();
        assert_eq!(scheduler.rearm(&[], noon()).unwrap(), AlarmDecision::Cleared);
        assert_eq!(fake.cancel_count(), 1);
    }

    #[test]
    fn tie_goes_to_the_earliest_in_snapshot_order() {
        let (mut scheduler, _fake) = scheduler();
        let timers = vec![running(1, "first", 3000), running(2, "second", 3000)];

        match scheduler.rearm(&timers, noon()).unwrap() {
            AlarmDecision::Armed { timer_id, label, .. } => {
                assert_eq!(timer_id, 1);
                assert_eq!(label, "first");
            }
            other => panic!("expected Armed, got {other:?}"),
        }
    }

    #[test]
    fn zero_remaining_arms_at_now() {
        let (mut scheduler, fake) = scheduler();
        let timers = vec![running(1, "done", 0)];

        scheduler.rearm(&timers, noon()).unwrap();
        assert_eq!(fake.armed().unwrap().deadline, noon());
    }

    #[test]
    fn rearm_is_idempotent_for_an_unchanged_snapshot() {
        let (mut scheduler, fake) = scheduler();
        let timers = vec![running(1, "tea", 3000)];

        let first = scheduler.rearm(&timers, noon()).unwrap();
        let second = scheduler.rearm(&timers, noon()).unwrap();

        assert_eq!(first, second);
        assert_eq!(fake.arm_count(), 2);
        assert_eq!(fake.armed().unwrap().deadline, noon() + Duration::milliseconds(3000));
    }

    #[test]
    fn a_new_minimum_supersedes_the_armed_wakeup() {
        let (mut scheduler, fake) = scheduler();

        scheduler.rearm(&[running(1, "pasta", 5000)], noon()).unwrap();
        scheduler
            .rearm(
                &[running(1, "pasta", 5000), running(2, "tea", 2000)],
                noon(),
            )
            .unwrap();

        let armed = fake.armed().unwrap();
        assert_eq!(armed.label, "tea");
        assert_eq!(armed.deadline, noon() + Duration::milliseconds(2000));
        assert_eq!(fake.arm_count(), 2);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let (mut scheduler, fake) = scheduler();
        let mut broken = running(1, "broken", 1000);
        broken.remaining_ms = -1;
        let timers = vec![broken, running(2, "tea", 3000)];

        let decision = scheduler.rearm(&timers, noon()).unwrap();

        match decision {
            AlarmDecision::Armed { timer_id, .. } => assert_eq!(timer_id, 2),
            other => panic!("expected Armed, got {other:?}"),
        }
        assert_eq!(fake.arm_count(), 1);
    }

    #[test]
    fn all_malformed_means_cleared() {
        let (mut scheduler, fake) = scheduler();
        let mut anchorless = running(1, "anchorless", 1000);
        anchorless.started_at = None;

        let decision = scheduler.rearm(&[anchorless], noon()).unwrap();

        assert_eq!(decision, AlarmDecision::Cleared);
        assert_eq!(fake.cancel_count(), 1);
    }

    #[test]
    fn oversized_records_are_skipped_like_malformed_ones() {
        let (mut scheduler, fake) = scheduler();
        let mut huge = running(1, "huge", 9_000_000_000_000_000_000);
        huge.duration_ms = 9_000_000_000_000_000_000;

        let decision = scheduler.rearm(&[huge], noon()).unwrap();

        assert_eq!(decision, AlarmDecision::Cleared);
        assert_eq!(fake.calls(), vec![WakeCall::Cancel]);
    }

    #[test]
    fn deadline_past_the_representable_range_clears() {
        let (mut scheduler, fake) = scheduler();
        let timers = vec![running(1, "tea", 3000)];

        let decision = scheduler.rearm(&timers, DateTime::<Utc>::MAX_UTC).unwrap();

        assert_eq!(decision, AlarmDecision::Cleared);
        assert_eq!(fake.calls(), vec![WakeCall::Cancel]);
    }

    #[test]
    fn denied_arm_surfaces_as_scheduling_denied() {
        let (mut scheduler, fake) = scheduler();
        fake.deny_with("no permission");

        let err = scheduler.rearm(&[running(1, "tea", 3000)], noon()).unwrap_err();
        assert!(matches!(err, AlarmError::SchedulingDenied(_)));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn store_failure_reports_unavailable_without_touching_the_wake_service() {
        let (mut scheduler, fake) = scheduler();
        let store = TimerStore::open_memory_unmigrated().unwrap();

        let err = scheduler.rearm_from_store(&store, noon()).unwrap_err();

        assert!(matches!(err, AlarmError::StoreUnavailable(_)));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn rearm_from_store_reads_a_fresh_snapshot() {
        let (mut scheduler, fake) = scheduler();
        let store = TimerStore::open_memory().unwrap();
        let id = store.create("tea", 300_000).unwrap().id;
        store.set_remaining(id, 3000).unwrap();
        store.set_running(id, true).unwrap();
        store.set_started_at(id, Some(noon())).unwrap();

        let decision = scheduler.rearm_from_store(&store, noon()).unwrap();

        assert_eq!(
            decision,
            AlarmDecision::Armed {
                timer_id: id,
                label: "tea".to_string(),
                deadline: noon() + Duration::milliseconds(3000),
            }
        );
        assert_eq!(fake.armed().unwrap().label, "tea");
    }

    proptest! {
        // The scan must agree with a straightforward reference selection:
        // first index among the valid, qualifying records with minimal
        // remaining time.
        #[test]
        fn selection_matches_reference(
            specs in proptest::collection::vec(
                (0i64..10_000, any::<bool>(), any::<bool>()),
                0..12,
            )
        ) {
            let timers: Vec<TimerRecord> = specs
                .iter()
                .enumerate()
                .map(|(i, &(remaining_ms, is_running, notify_enabled))| TimerRecord {
                    id: i as i64 + 1,
                    name: format!("t{}", i + 1),
                    duration_ms: 10_000,
                    remaining_ms,
                    is_running,
                    notify_enabled,
                    started_at: is_running.then(|| noon()),
                })
                .collect();

            let expected = timers
                .iter()
                .filter(|t| t.is_running && t.notify_enabled)
                .min_by_key(|t| t.remaining_ms)
                .map(|t| t.id);

            prop_assert_eq!(next_wake(&timers).map(|t| t.id), expected);
        }

        // Whatever the snapshot, a recompute issues exactly one request.
        #[test]
        fn rearm_issues_exactly_one_wake_call(
            specs in proptest::collection::vec(
                (0i64..10_000, any::<bool>(), any::<bool>()),
                0..12,
            )
        ) {
            let timers: Vec<TimerRecord> = specs
                .iter()
                .enumerate()
                .map(|(i, &(remaining_ms, is_running, notify_enabled))| TimerRecord {
                    id: i as i64 + 1,
                    name: format!("t{}", i + 1),
                    duration_ms: 10_000,
                    remaining_ms,
                    is_running,
                    notify_enabled,
                    started_at: is_running.then(|| noon()),
                })
                .collect();

            let fake = FakeWakeService::new();
            let mut scheduler = AlarmScheduler::new(fake.clone());
            scheduler.rearm(&timers, noon()).unwrap();

            prop_assert_eq!(fake.calls().len(), 1);
        }
    }
}
