//! Turn countdown
//!
//! At most one countdown is active. Every start and every stop bumps an
//! epoch, and scheduled callbacks compare against it before doing anything,
//! so a callback that was already in flight when the turn ended is inert.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;

use super::scheduler::{ScheduledTask, Scheduler};

/// Tick period for remaining-time updates
pub const TICK_MS: u64 = 1_000;

struct ActiveTurn {
    expiry: ScheduledTask,
    ticker: ScheduledTask,
}

#[derive(Default)]
struct TimerState {
    epoch: u64,
    active: Option<ActiveTurn>,
    turn_length: u64,
    remaining_time: u64,
}

impl TimerState {
    /// Clear the countdown, returning the tasks that still need cancelling
    fn reset(&mut self) -> Option<ActiveTurn> {
        self.epoch += 1;
        self.turn_length = 0;
        self.remaining_time = 0;
        self.active.take()
    }
}

/// Restartable countdown with a once-per-second tick
pub struct TurnTimer {
    scheduler: Arc<dyn Scheduler>,
    state: Arc<Mutex<TimerState>>,
}

impl TurnTimer {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            state: Arc::new(Mutex::new(TimerState::default())),
        }
    }

    /// Begin a countdown of `duration_ms`.
    ///
    /// `on_tick` runs every second while the countdown is active. When the
    /// countdown runs out without `end_turn`, the timer deactivates and runs
    /// `on_expire` followed by one final `on_tick`.
    ///
    /// Ignored if a countdown is already running; returns whether it started.
    pub fn start_turn<E, T>(&self, duration_ms: u64, on_expire: E, on_tick: T) -> bool
    where
        E: FnOnce() + Send + 'static,
        T: Fn() + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        if state.active.is_some() {
            debug!(duration_ms, "Countdown already active, start ignored");
            return false;
        }

        state.epoch += 1;
        state.turn_length = duration_ms;
        state.remaining_time = duration_ms;
        let epoch = state.epoch;
        let on_tick = Arc::new(on_tick);

        // Expiry is scheduled first so it wins a tie with the last tick.
        let weak: Weak<Mutex<TimerState>> = Arc::downgrade(&self.state);
        let tick = on_tick.clone();
        let expiry = self.scheduler.schedule_once(
            Duration::from_millis(duration_ms),
            Box::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let finished = {
                    let mut state = shared.lock();
                    if state.epoch != epoch {
                        return;
                    }
                    state.reset()
                };
                if let Some(active) = finished {
                    active.ticker.cancel();
                }
                on_expire();
                tick();
            }),
        );

        let weak: Weak<Mutex<TimerState>> = Arc::downgrade(&self.state);
        let ticker = self.scheduler.schedule_repeating(
            Duration::from_millis(TICK_MS),
            Box::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                {
                    let mut state = shared.lock();
                    if state.epoch != epoch || state.active.is_none() {
                        return;
                    }
                    state.remaining_time = state.remaining_time.saturating_sub(TICK_MS);
                }
                on_tick();
            }),
        );

        state.active = Some(ActiveTurn { expiry, ticker });
        true
    }

    /// Cancel the active countdown without running its expiry. Idempotent.
    pub fn end_turn(&self) {
        let finished = self.state.lock().reset();
        if let Some(active) = finished {
            active.expiry.cancel();
            active.ticker.cancel();
        }
    }

    /// Configured length of the active countdown, 0 when inactive
    pub fn turn_length(&self) -> u64 {
        self.state.lock().turn_length
    }

    /// Milliseconds left, 0 when inactive
    pub fn remaining_time(&self) -> u64 {
        self.state.lock().remaining_time
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active.is_some()
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.end_turn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::scheduler::ManualScheduler;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Fixture {
        clock: ManualScheduler,
        timer: TurnTimer,
        expired: Arc<AtomicU32>,
        ticks: Arc<AtomicU32>,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = ManualScheduler::new();
            let timer = TurnTimer::new(Arc::new(clock.clone()));
            Self {
                clock,
                timer,
                expired: Arc::new(AtomicU32::new(0)),
                ticks: Arc::new(AtomicU32::new(0)),
            }
        }

        fn start(&self, duration_ms: u64) -> bool {
            let expired = self.expired.clone();
            let ticks = self.ticks.clone();
            self.timer.start_turn(
                duration_ms,
                move || {
                    expired.fetch_add(1, Ordering::SeqCst);
                },
                move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                },
            )
        }

        fn advance_ms(&self, ms: u64) {
            self.clock.advance(Duration::from_millis(ms));
        }

        fn expired(&self) -> u32 {
            self.expired.load(Ordering::SeqCst)
        }

        fn ticks(&self) -> u32 {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn expires_after_duration() {
        let f = Fixture::new();
        assert!(f.start(5_000));
        assert_eq!(f.timer.turn_length(), 5_000);

        f.advance_ms(4_999);
        assert_eq!(f.expired(), 0);
        f.advance_ms(1);
        assert_eq!(f.expired(), 1);
        assert!(!f.timer.is_active());
        assert_eq!(f.timer.turn_length(), 0);
        assert_eq!(f.timer.remaining_time(), 0);
    }

    #[test]
    fn ticks_decrement_remaining_time() {
        let f = Fixture::new();
        f.start(5_000);
        f.advance_ms(3_000);
        assert_eq!(f.ticks(), 3);
        assert_eq!(f.timer.remaining_time(), 2_000);
    }

    #[test]
    fn expiry_runs_one_final_tick() {
        let f = Fixture::new();
        f.start(5_000);
        f.advance_ms(5_000);
        // four periodic ticks, then expiry's trailing tick
        assert_eq!(f.ticks(), 5);
        f.advance_ms(10_000);
        assert_eq!(f.ticks(), 5);
        assert_eq!(f.clock.pending(), 0);
    }

    #[test]
    fn end_turn_prevents_expiry() {
        let f = Fixture::new();
        f.start(5_000);
        f.advance_ms(2_000);
        f.timer.end_turn();
        f.advance_ms(10_000);
        assert_eq!(f.expired(), 0);
        assert_eq!(f.ticks(), 2);
        assert_eq!(f.timer.turn_length(), 0);
    }

    #[test]
    fn end_turn_twice_is_harmless() {
        let f = Fixture::new();
        f.start(5_000);
        f.timer.end_turn();
        f.timer.end_turn();
        assert!(!f.timer.is_active());
        assert!(f.start(5_000));
        f.advance_ms(5_000);
        assert_eq!(f.expired(), 1);
    }

    #[test]
    fn end_turn_when_idle_is_noop() {
        let f = Fixture::new();
        f.timer.end_turn();
        assert_eq!(f.timer.remaining_time(), 0);
        assert_eq!(f.clock.pending(), 0);
    }

    #[test]
    fn start_while_active_is_ignored() {
        let f = Fixture::new();
        assert!(f.start(5_000));
        assert!(!f.start(20_000));
        assert_eq!(f.timer.turn_length(), 5_000);
        f.advance_ms(20_000);
        assert_eq!(f.expired(), 1);
    }

    #[test]
    fn restarts_after_expiring() {
        let f = Fixture::new();
        f.start(5_000);
        f.advance_ms(5_000);
        assert!(f.start(5_000));
        f.advance_ms(5_000);
        assert_eq!(f.expired(), 2);
    }

    #[test]
    fn dropping_timer_cancels_callbacks() {
        let f = Fixture::new();
        f.start(5_000);
        let Fixture {
            clock,
            timer,
            expired,
            ..
        } = f;
        drop(timer);
        clock.advance(Duration::from_secs(30));
        assert_eq!(expired.load(Ordering::SeqCst), 0);
        assert_eq!(clock.pending(), 0);
    }
}
