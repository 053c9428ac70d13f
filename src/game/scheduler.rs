//! Deferred callback scheduling
//!
//! The turn timer never touches a clock directly. It asks a `Scheduler` for
//! one-shot and repeating callbacks, which lets the server run on tokio time
//! and tests run on a virtual clock they advance by hand.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Callback run once
pub type Task = Box<dyn FnOnce() + Send + 'static>;
/// Callback run on every period
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Handle to a scheduled callback. Dropping it leaves the callback scheduled.
pub struct ScheduledTask {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl ScheduledTask {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Prevent the callback from running again
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Source of deferred callbacks
pub trait Scheduler: Send + Sync + 'static {
    /// Run `task` once after `delay`
    fn schedule_once(&self, delay: Duration, task: Task) -> ScheduledTask;

    /// Run `task` every `period`, first run one period from now
    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> ScheduledTask;
}

// ============================================================================
// Tokio scheduler
// ============================================================================

/// Scheduler backed by tokio tasks
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Bind to the current runtime. Must be called from inside a tokio runtime.
    pub fn new() -> Self {
        Self {
            handle: Handle::current(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> ScheduledTask {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        ScheduledTask::new(move || join.abort())
    }

    fn schedule_repeating(&self, period: Duration, mut task: RepeatingTask) -> ScheduledTask {
        let start = Instant::now() + period;
        let join = self.handle.spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task();
            }
        });
        ScheduledTask::new(move || join.abort())
    }
}

// ============================================================================
// Manual (virtual time) scheduler
// ============================================================================

enum Job {
    Once(Task),
    Repeating { period: u64, task: RepeatingTask },
}

struct Pending {
    due: u64,
    job: Job,
}

#[derive(Default)]
struct ManualQueue {
    now: u64,
    next_id: u64,
    pending: BTreeMap<u64, Pending>,
    running: Option<u64>,
    running_cancelled: bool,
}

/// Scheduler driven by an explicit virtual clock
///
/// Nothing runs until `advance` is called. Callbacks due at the same instant
/// run in the order they were scheduled.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual milliseconds elapsed since creation
    pub fn now_ms(&self) -> u64 {
        self.queue.lock().now
    }

    /// Number of callbacks still scheduled
    pub fn pending(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// Move the clock forward, running every callback that falls due
    pub fn advance(&self, by: Duration) {
        let target = self.queue.lock().now + by.as_millis() as u64;

        loop {
            let (id, pending) = {
                let mut queue = self.queue.lock();
                let next = queue
                    .pending
                    .iter()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(id, p)| (p.due, **id))
                    .map(|(id, _)| *id);

                let Some(id) = next else {
                    queue.now = target;
                    break;
                };
                let Some(pending) = queue.pending.remove(&id) else {
                    break;
                };
                queue.now = pending.due;
                queue.running = Some(id);
                queue.running_cancelled = false;
                (id, pending)
            };

            // The queue lock is released while callbacks run so they can
            // schedule and cancel freely.
            match pending.job {
                Job::Once(task) => {
                    task();
                    self.queue.lock().running = None;
                }
                Job::Repeating { period, mut task } => {
                    task();
                    let mut queue = self.queue.lock();
                    queue.running = None;
                    if !queue.running_cancelled {
                        queue.pending.insert(
                            id,
                            Pending {
                                due: pending.due + period,
                                job: Job::Repeating { period, task },
                            },
                        );
                    }
                }
            }
        }
    }

    fn insert(&self, delay: u64, job: Job) -> ScheduledTask {
        let id = {
            let mut queue = self.queue.lock();
            let id = queue.next_id;
            queue.next_id += 1;
            let due = queue.now + delay;
            queue.pending.insert(id, Pending { due, job });
            id
        };

        let queue: Weak<Mutex<ManualQueue>> = Arc::downgrade(&self.queue);
        ScheduledTask::new(move || {
            if let Some(queue) = queue.upgrade() {
                let mut queue = queue.lock();
                if queue.pending.remove(&id).is_none() && queue.running == Some(id) {
                    queue.running_cancelled = true;
                }
            }
        })
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> ScheduledTask {
        self.insert(delay.as_millis() as u64, Job::Once(task))
    }

    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> ScheduledTask {
        let period = (period.as_millis() as u64).max(1);
        self.insert(period, Job::Repeating { period, task })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        let c = Arc::new(AtomicU32::new(0));
        (c.clone(), c)
    }

    #[test]
    fn once_fires_only_when_due() {
        let scheduler = ManualScheduler::new();
        let (count, seen) = counter();
        let _task = scheduler.schedule_once(
            Duration::from_millis(500),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        scheduler.advance(Duration::from_millis(499));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        scheduler.advance(Duration::from_secs(10));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn repeating_fires_each_period_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let (count, seen) = counter();
        let task = scheduler.schedule_repeating(
            Duration::from_secs(1),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        scheduler.advance(Duration::from_millis(3_500));
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        task.cancel();
        scheduler.advance(Duration::from_secs(5));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.now_ms(), 8_500);
    }

    #[test]
    fn cancelled_once_never_fires() {
        let scheduler = ManualScheduler::new();
        let (count, seen) = counter();
        let task = scheduler.schedule_once(
            Duration::from_millis(10),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        task.cancel();
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn same_instant_runs_in_schedule_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let order = order.clone();
            let _ = scheduler.schedule_once(
                Duration::from_millis(100),
                Box::new(move || order.lock().push(name)),
            );
        }
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn callbacks_may_schedule_more_work() {
        let scheduler = ManualScheduler::new();
        let (count, seen) = counter();
        let inner = scheduler.clone();
        let _ = scheduler.schedule_once(
            Duration::from_millis(100),
            Box::new(move || {
                let _ = inner.schedule_once(
                    Duration::from_millis(100),
                    Box::new(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );
        scheduler.advance(Duration::from_millis(250));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_respects_abort() {
        let scheduler = TokioScheduler::new();
        let (count, seen) = counter();
        let task = scheduler.schedule_once(
            Duration::from_millis(100),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        task.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_repeats() {
        let scheduler = TokioScheduler::new();
        let (count, seen) = counter();
        let task = scheduler.schedule_repeating(
            Duration::from_secs(1),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        task.cancel();
    }
}
