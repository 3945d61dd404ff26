//! Timer lifecycle orchestration.
//!
//! [`TimerService`] builds every user action out of the store's small
//! setters and finishes each one with a fresh snapshot read plus alarm
//! recompute, so the armed wake-up can never drift from what is
//! persisted. It also carries the runner pass ([`tick`](Self::tick))
//! that advances running countdowns and handles expiry.

use chrono::Duration;
use tracing::info;

use crate::alarm::{AlarmDecision, AlarmScheduler, WakeService};
use crate::clock::Clock;
use crate::error::{AlarmError, CoreError, StoreError};
use crate::events::Event;
use crate::storage::TimerStore;

use super::TimerRecord;

/// High-level timer operations over a store, a wake-service, and a clock.
pub struct TimerService<W: WakeService, C: Clock> {
    store: TimerStore,
    alarms: AlarmScheduler<W>,
    clock: C,
}

impl<W: WakeService, C: Clock> TimerService<W, C> {
    pub fn new(store: TimerStore, wake: W, clock: C) -> Self {
        Self {
            store,
            alarms: AlarmScheduler::new(wake),
            clock,
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &TimerStore {
        &self.store
    }

    pub fn list(&self) -> Result<Vec<TimerRecord>, StoreError> {
        self.store.list()
    }

    pub fn get(&self, id: i64) -> Result<TimerRecord, StoreError> {
        self.store.get(id)
    }

    /// Creates a timer: stopped, notifications on, full time remaining.
    pub fn create(&mut self, name: &str, duration_ms: i64) -> Result<Event, CoreError> {
        let record = self.store.create(name, duration_ms)?;
        info!(id = record.id, name = %record.name, duration_ms, "timer created");
        self.rearm()?;
        Ok(Event::TimerCreated {
            id: record.id,
            name: record.name,
            duration_ms: record.duration_ms,
            at: self.clock.now(),
        })
    }

    /// Starts a stopped timer, or resumes a paused one.
    ///
    /// The anchor is back-dated by the already-consumed portion, so the
    /// countdown continues from the checkpoint instead of restarting.
    /// Starting an already-running timer just refreshes its checkpoint.
    pub fn start(&mut self, id: i64) -> Result<Event, CoreError> {
        let timer = self.store.get(id)?;
        let now = self.clock.now();
        let remaining = timer.remaining_at(now);
        let consumed = timer.duration_ms - remaining;
        let anchor = now - Duration::milliseconds(consumed);

        self.store.set_remaining(id, remaining)?;
        self.store.set_started_at(id, Some(anchor))?;
        self.store.set_running(id, true)?;
        info!(id, name = %timer.name, remaining_ms = remaining, "timer started");
        self.rearm()?;
        Ok(Event::TimerStarted {
            id,
            name: timer.name,
            remaining_ms: remaining,
            at: now,
        })
    }

    /// Pauses a running timer, checkpointing its live remaining time.
    pub fn pause(&mut self, id: i64) -> Result<Event, CoreError> {
        let timer = self.store.get(id)?;
        let now = self.clock.now();
        let remaining = timer.remaining_at(now);

        self.store.set_remaining(id, remaining)?;
        self.store.set_started_at(id, None)?;
        self.store.set_running(id, false)?;
        info!(id, name = %timer.name, remaining_ms = remaining, "timer paused");
        self.rearm()?;
        Ok(Event::TimerPaused {
            id,
            name: timer.name,
            remaining_ms: remaining,
            at: now,
        })
    }

    /// Stops a timer and winds it back to its full duration.
    pub fn reset(&mut self, id: i64) -> Result<Event, CoreError> {
        let timer = self.store.get(id)?;
        self.store.set_running(id, false)?;
        self.store.set_remaining(id, timer.duration_ms)?;
        self.store.set_started_at(id, None)?;
        info!(id, name = %timer.name, "timer reset");
        self.rearm()?;
        Ok(Event::TimerReset {
            id,
            name: timer.name,
            at: self.clock.now(),
        })
    }

    pub fn delete(&mut self, id: i64) -> Result<Event, CoreError> {
        self.store.delete(id)?;
        info!(id, "timer deleted");
        self.rearm()?;
        Ok(Event::TimerDeleted {
            id,
            at: self.clock.now(),
        })
    }

    /// Enables or disables the expiry notification for one timer.
    pub fn set_notify(&mut self, id: i64, enabled: bool) -> Result<Event, CoreError> {
        self.store.set_notify_enabled(id, enabled)?;
        info!(id, enabled, "notify toggled");
        self.rearm()?;
        Ok(Event::NotifyChanged {
            id,
            enabled,
            at: self.clock.now(),
        })
    }

    /// Renames a timer and replaces its duration (reset semantics).
    pub fn update_definition(
        &mut self,
        id: i64,
        name: &str,
        duration_ms: i64,
    ) -> Result<Event, CoreError> {
        let record = self.store.update_definition(id, name, duration_ms)?;
        info!(id, name = %record.name, duration_ms, "timer definition updated");
        self.rearm()?;
        Ok(Event::DefinitionUpdated {
            id,
            name: record.name,
            duration_ms: record.duration_ms,
            at: self.clock.now(),
        })
    }

    /// One runner pass: checkpoints every running countdown and handles
    /// expiry, then recomputes the alarm.
    ///
    /// A notification-enabled timer that reaches zero stops and winds
    /// back to its full duration, ready for the next run. A muted timer
    /// holds at zero and stays running until the user intervenes; its
    /// expiry event is emitted exactly once, at the crossing.
    pub fn tick(&mut self) -> Result<Vec<Event>, CoreError> {
        let now = self.clock.now();
        let mut events = Vec::new();

        for timer in self.store.list()?.into_iter().filter(|t| t.is_running) {
            let live = timer.remaining_at(now);
            if live == 0 && timer.notify_enabled {
                self.store.set_running(timer.id, false)?;
                self.store.set_remaining(timer.id, timer.duration_ms)?;
                self.store.set_started_at(timer.id, None)?;
                info!(id = timer.id, name = %timer.name, "timer expired");
                events.push(Event::TimerExpired {
                    id: timer.id,
                    name: timer.name,
                    at: now,
                });
            } else {
                if live != timer.remaining_ms {
                    self.store.set_remaining(timer.id, live)?;
                }
                if live == 0 && timer.remaining_ms > 0 {
                    info!(id = timer.id, name = %timer.name, "muted timer expired");
                    events.push(Event::TimerExpired {
                        id: timer.id,
                        name: timer.name,
                        at: now,
                    });
                }
            }
        }

        self.rearm()?;
        Ok(events)
    }

    /// Recomputes the armed wake-up from a fresh store snapshot.
    pub fn rearm(&mut self) -> Result<AlarmDecision, AlarmError> {
        self.alarms.rearm_from_store(&self.store, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::alarm::FakeWakeService;
    use crate::clock::FakeClock;
    use crate::error::InvalidRecord;

    use super::*;

    fn service() -> (TimerService<FakeWakeService, FakeClock>, FakeWakeService, FakeClock) {
        let store = TimerStore::open_memory().unwrap();
        let fake = FakeWakeService::new();
        let clock = FakeClock::new();
        (
            TimerService::new(store, fake.clone(), clock.clone()),
            fake,
            clock,
        )
    }

    fn created_id(event: &Event) -> i64 {
        match event {
            Event::TimerCreated { id, .. } => *id,
            other => panic!("expected TimerCreated, got {other:?}"),
        }
    }

    #[test]
    fn create_leaves_the_slot_clear() {
        let (mut service, fake, _clock) = service();
        service.create("tea", 300_000).unwrap();

        assert_eq!(fake.armed(), None);
        assert_eq!(fake.arm_count(), 0);
    }

    #[test]
    fn start_arms_a_wakeup_at_the_deadline() {
        let (mut service, fake, clock) = service();
        let id = created_id(&service.create("tea", 300_000).unwrap());

        service.start(id).unwrap();

        let armed = fake.armed().unwrap();
        assert_eq!(armed.label, "tea");
        assert_eq!(armed.deadline, clock.now() + Duration::milliseconds(300_000));

        let t = service.get(id).unwrap();
        assert!(t.is_running);
        assert_eq!(t.started_at, Some(clock.now()));
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let (mut service, fake, clock) = service();
        let id = created_id(&service.create("tea", 300_000).unwrap());

        service.start(id).unwrap();
        clock.advance(Duration::seconds(60));
        service.start(id).unwrap();

        // Checkpoint refreshed, deadline unchanged.
        assert_eq!(service.get(id).unwrap().remaining_ms, 240_000);
        assert_eq!(
            fake.armed().unwrap().deadline,
            clock.now() + Duration::milliseconds(240_000),
        );
    }

    #[test]
    fn pause_checkpoints_and_clears_the_slot() {
        let (mut service, fake, clock) = service();
        let id = created_id(&service.create("tea", 300_000).unwrap());

        service.start(id).unwrap();
        clock.advance(Duration::seconds(60));
        let event = service.pause(id).unwrap();

        assert!(matches!(event, Event::TimerPaused { remaining_ms: 240_000, .. }));
        let t = service.get(id).unwrap();
        assert!(!t.is_running);
        assert_eq!(t.remaining_ms, 240_000);
        assert_eq!(t.started_at, None);
        assert_eq!(fake.armed(), None);
    }

    #[test]
    fn resume_continues_from_the_checkpoint() {
        let (mut service, fake, clock) = service();
        let id = created_id(&service.create("tea", 300_000).unwrap());

        service.start(id).unwrap();
        clock.advance(Duration::seconds(60));
        service.pause(id).unwrap();
        clock.advance(Duration::seconds(500));

        service.start(id).unwrap();
        assert_eq!(
            fake.armed().unwrap().deadline,
            clock.now() + Duration::milliseconds(240_000),
        );

        clock.advance(Duration::seconds(40));
        service.pause(id).unwrap();
        assert_eq!(service.get(id).unwrap().remaining_ms, 200_000);
    }

    #[test]
    fn the_soonest_timer_wins_the_slot() {
        let (mut service, fake, clock) = service();
        let slow = created_id(&service.create("pasta", 600_000).unwrap());
        let fast = created_id(&service.create("tea", 180_000).unwrap());

        service.start(slow).unwrap();
        service.start(fast).unwrap();
        assert_eq!(fake.armed().unwrap().label, "tea");
        assert_eq!(
            fake.armed().unwrap().deadline,
            clock.now() + Duration::milliseconds(180_000),
        );

        // Pausing the winner hands the slot to the runner-up.
        service.pause(fast).unwrap();
        assert_eq!(fake.armed().unwrap().label, "pasta");
    }

    #[test]
    fn muting_the_only_candidate_clears_the_slot() {
        let (mut service, fake, _clock) = service();
        let id = created_id(&service.create("tea", 300_000).unwrap());

        service.start(id).unwrap();
        assert!(fake.armed().is_some());

        service.set_notify(id, false).unwrap();
        assert_eq!(fake.armed(), None);
    }

    #[test]
    fn reset_stops_and_restores_full_duration() {
        let (mut service, fake, clock) = service();
        let id = created_id(&service.create("tea", 300_000).unwrap());

        service.start(id).unwrap();
        clock.advance(Duration::seconds(120));
        service.reset(id).unwrap();

        let t = service.get(id).unwrap();
        assert!(!t.is_running);
        assert_eq!(t.remaining_ms, 300_000);
        assert_eq!(t.started_at, None);
        assert_eq!(fake.armed(), None);
    }

    #[test]
    fn delete_rearms_for_the_survivors() {
        let (mut service, fake, _clock) = service();
        let fast = created_id(&service.create("tea", 180_000).unwrap());
        let slow = created_id(&service.create("pasta", 600_000).unwrap());

        service.start(fast).unwrap();
        service.start(slow).unwrap();
        assert_eq!(fake.armed().unwrap().label, "tea");

        service.delete(fast).unwrap();
        assert_eq!(fake.armed().unwrap().label, "pasta");
    }

    #[test]
    fn tick_expires_a_notify_enabled_timer() {
        let (mut service, fake, clock) = service();
        let fast = created_id(&service.create("tea", 3000).unwrap());
        let slow = created_id(&service.create("pasta", 10_000).unwrap());

        service.start(fast).unwrap();
        service.start(slow).unwrap();
        clock.advance(Duration::milliseconds(3000));

        let events = service.tick().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::TimerExpired { id, .. } if *id == fast));

        // Expired timer is stopped and rewound, ready for the next run.
        let t = service.get(fast).unwrap();
        assert!(!t.is_running);
        assert_eq!(t.remaining_ms, 3000);
        assert_eq!(t.started_at, None);

        // The survivor now owns the slot, deadline from its checkpoint.
        let armed = fake.armed().unwrap();
        assert_eq!(armed.label, "pasta");
        assert_eq!(armed.deadline, clock.now() + Duration::milliseconds(7000));
        assert_eq!(service.get(slow).unwrap().remaining_ms, 7000);
    }

    #[test]
    fn tick_lets_a_muted_timer_hold_at_zero() {
        let (mut service, _fake, clock) = service();
        let id = created_id(&service.create("tea", 3000).unwrap());
        service.set_notify(id, false).unwrap();
        service.start(id).unwrap();

        clock.advance(Duration::milliseconds(4000));
        let events = service.tick().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::TimerExpired { .. }));

        let t = service.get(id).unwrap();
        assert!(t.is_running);
        assert_eq!(t.remaining_ms, 0);

        // Already at zero: no second expiry event.
        clock.advance(Duration::milliseconds(1000));
        assert!(service.tick().unwrap().is_empty());
    }

    #[test]
    fn tick_without_running_timers_clears_the_slot() {
        let (mut service, fake, _clock) = service();
        service.create("tea", 300_000).unwrap();

        assert!(service.tick().unwrap().is_empty());
        assert_eq!(fake.armed(), None);
    }

    #[test]
    fn unknown_ids_surface_not_found() {
        let (mut service, _fake, _clock) = service();
        assert!(matches!(
            service.start(99),
            Err(CoreError::Store(StoreError::NotFound(99)))
        ));
    }

    #[test]
    fn create_propagates_validation_failures() {
        let (mut service, _fake, _clock) = service();
        assert!(matches!(
            service.create("", 1000),
            Err(CoreError::Store(StoreError::InvalidTimer(InvalidRecord::EmptyName)))
        ));
    }

    #[test]
    fn update_definition_rearms() {
        let (mut service, fake, _clock) = service();
        let id = created_id(&service.create("tea", 300_000).unwrap());
        service.start(id).unwrap();
        assert!(fake.armed().is_some());

        service.update_definition(id, "green tea", 120_000).unwrap();

        // Reset semantics stop the timer, so the slot clears.
        assert_eq!(fake.armed(), None);
        let t = service.get(id).unwrap();
        assert_eq!(t.name, "green tea");
        assert_eq!(t.duration_ms, 120_000);
    }
}
