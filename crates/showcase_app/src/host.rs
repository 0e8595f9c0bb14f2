// SPDX-License-Identifier: MIT OR Apache-2.0
//! Real-time clock backed by tokio local tasks.
//!
//! Every timer is a task spawned on the current `LocalSet`, so callbacks run
//! on the showcase thread and may touch `Rc` state. Clearing a timer aborts
//! its task.

use chrono::NaiveTime;
use showcase_playback::{Clock, IntervalCallback, Millis, TimerCallback, TimerId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

type TaskTable = RefCell<HashMap<TimerId, JoinHandle<()>>>;

/// Clock driving the showcase in real time.
///
/// Must be used from inside a `tokio::task::LocalSet`.
pub struct TokioClock {
    origin: Instant,
    next_id: Cell<u64>,
    tasks: Rc<TaskTable>,
}

impl TokioClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            next_id: Cell::new(0),
            tasks: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Create a shared clock
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Number of timers still scheduled
    pub fn outstanding(&self) -> usize {
        self.tasks.borrow().len()
    }

    fn allocate(&self) -> TimerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        TimerId(id)
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Millis {
        Millis::try_from(self.origin.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }

    fn wall_time(&self) -> NaiveTime {
        chrono::Local::now().time()
    }

    fn set_timeout(&self, delay: Millis, callback: TimerCallback) -> TimerId {
        let id = self.allocate();
        let tasks: Weak<TaskTable> = Rc::downgrade(&self.tasks);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if let Some(tasks) = tasks.upgrade() {
                tasks.borrow_mut().remove(&id);
            }
            callback();
        });
        self.tasks.borrow_mut().insert(id, handle);
        id
    }

    fn set_interval(&self, period: Millis, mut callback: IntervalCallback) -> TimerId {
        let id = self.allocate();
        let period = Duration::from_millis(period.max(1));
        let handle = tokio::task::spawn_local(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        self.tasks.borrow_mut().insert(id, handle);
        id
    }

    fn clear(&self, id: TimerId) {
        let handle = self.tasks.borrow_mut().remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            tracing::trace!(timer = id.0, "Aborted timer task");
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.borrow_mut().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn test_timeout_fires_and_clear_cancels() {
        LocalSet::new()
            .run_until(async {
                let clock = TokioClock::shared();
                let fired = Rc::new(Cell::new(0));

                let f = fired.clone();
                clock.set_timeout(5, Box::new(move || f.set(f.get() + 1)));
                let f = fired.clone();
                let cleared = clock.set_timeout(5, Box::new(move || f.set(f.get() + 10)));
                clock.clear(cleared);

                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(fired.get(), 1);
                assert_eq!(clock.outstanding(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_interval_repeats_until_cleared() {
        LocalSet::new()
            .run_until(async {
                let clock = TokioClock::shared();
                let ticks = Rc::new(Cell::new(0u32));

                let t = ticks.clone();
                let id = clock.set_interval(5, Box::new(move || t.set(t.get() + 1)));
                tokio::time::sleep(Duration::from_millis(60)).await;
                clock.clear(id);
                let seen = ticks.get();
                assert!(seen >= 2, "only {seen} ticks");

                tokio::time::sleep(Duration::from_millis(30)).await;
                assert_eq!(ticks.get(), seen);
                assert_eq!(clock.outstanding(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_drop_aborts_pending_timers() {
        LocalSet::new()
            .run_until(async {
                let clock = TokioClock::shared();
                let fired = Rc::new(Cell::new(0));

                let f = fired.clone();
                clock.set_timeout(10, Box::new(move || f.set(f.get() + 1)));
                let f = fired.clone();
                clock.set_interval(10, Box::new(move || f.set(f.get() + 1)));
                assert_eq!(clock.outstanding(), 2);

                drop(clock);
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(fired.get(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_now_advances() {
        let clock = TokioClock::new();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(clock.now() >= 10);
    }
}
