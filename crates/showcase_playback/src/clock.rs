// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clock capability and the deterministic virtual clock.
//!
//! Every component in this crate schedules its work through a [`Clock`]:
//! one-shot timeouts for reveal items and busy guards, intervals for counter
//! ticks and feed cadence. Hosts provide a real clock; tests drive a
//! [`VirtualClock`] forward with [`VirtualClock::advance`].

use chrono::NaiveTime;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Milliseconds, measured from the clock's origin or used as a delay.
pub type Millis = u64;

/// One-shot timer callback
pub type TimerCallback = Box<dyn FnOnce()>;

/// Repeating timer callback
pub type IntervalCallback = Box<dyn FnMut()>;

/// Shared handle to a clock capability
pub type SharedClock = Rc<dyn Clock>;

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Delayed-callback primitive of a cooperative event loop.
pub trait Clock {
    /// Milliseconds elapsed since the clock's origin
    fn now(&self) -> Millis;

    /// Local wall-clock time of day, used for display stamps
    fn wall_time(&self) -> NaiveTime;

    /// Run `callback` once, `delay` milliseconds from now
    fn set_timeout(&self, delay: Millis, callback: TimerCallback) -> TimerId;

    /// Run `callback` every `period` milliseconds, first after one period
    fn set_interval(&self, period: Millis, callback: IntervalCallback) -> TimerId;

    /// Cancel a timer. Unknown or already-fired ids are ignored.
    fn clear(&self, id: TimerId);
}

enum TimerKind {
    Once(Option<TimerCallback>),
    Every {
        period: Millis,
        callback: Option<IntervalCallback>,
    },
}

struct TimerEntry {
    due: Millis,
    seq: u64,
    kind: TimerKind,
}

struct VirtualInner {
    now: Millis,
    next_id: u64,
    next_seq: u64,
    /// Fire order: due time, then scheduling order
    queue: BTreeMap<(Millis, u64), TimerId>,
    timers: HashMap<TimerId, TimerEntry>,
    wall_origin: NaiveTime,
}

impl VirtualInner {
    fn enqueue(&mut self, id: TimerId, due: Millis, kind: TimerKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((due, seq), id);
        self.timers.insert(id, TimerEntry { due, seq, kind });
    }

    fn allocate(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }
}

enum Fired {
    Once(TimerCallback),
    Every(IntervalCallback),
}

/// Deterministic clock that only moves when told to.
///
/// Time starts at 0. [`advance`](Self::advance) walks forward through every
/// due timer in order, so a test can assert on state at exact instants.
pub struct VirtualClock {
    inner: RefCell<VirtualInner>,
}

impl VirtualClock {
    /// Create a clock at time 0 with a midnight wall-clock origin
    pub fn new() -> Self {
        Self::with_wall_origin(NaiveTime::MIN)
    }

    /// Create a clock whose wall time starts at `origin`
    pub fn with_wall_origin(origin: NaiveTime) -> Self {
        Self {
            inner: RefCell::new(VirtualInner {
                now: 0,
                next_id: 1,
                next_seq: 0,
                queue: BTreeMap::new(),
                timers: HashMap::new(),
                wall_origin: origin,
            }),
        }
    }

    /// Create a shared clock, ready to hand to components
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Number of live timers (one-shot and repeating)
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Move time forward by `ms`, firing every timer due on the way.
    ///
    /// `advance(0)` fires timers that are already due.
    pub fn advance(&self, ms: Millis) {
        let target = self.inner.borrow().now.saturating_add(ms);

        while let Some((id, fired)) = self.pop_due(target) {
            match fired {
                Fired::Once(callback) => callback(),
                Fired::Every(mut callback) => {
                    callback();
                    self.rearm(id, callback);
                }
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.now = inner.now.max(target);
    }

    /// Advance to an absolute time. Moving backwards is ignored.
    pub fn advance_to(&self, at: Millis) {
        let now = self.inner.borrow().now;
        if at >= now {
            self.advance(at - now);
        }
    }

    fn pop_due(&self, target: Millis) -> Option<(TimerId, Fired)> {
        let mut inner = self.inner.borrow_mut();
        loop {
            let (&(due, seq), &id) = inner.queue.iter().next()?;
            if due > target {
                return None;
            }
            inner.queue.remove(&(due, seq));
            inner.now = due;

            let Some(entry) = inner.timers.get_mut(&id) else {
                continue;
            };
            match &mut entry.kind {
                TimerKind::Once(callback) => {
                    let callback = callback.take();
                    inner.timers.remove(&id);
                    if let Some(callback) = callback {
                        return Some((id, Fired::Once(callback)));
                    }
                }
                TimerKind::Every { callback, .. } => {
                    // Entry stays registered while the callback runs so a
                    // self-clear from inside it is observed by `rearm`.
                    if let Some(callback) = callback.take() {
                        return Some((id, Fired::Every(callback)));
                    }
                }
            }
        }
    }

    fn rearm(&self, id: TimerId, callback: IntervalCallback) {
        let mut inner = self.inner.borrow_mut();
        let Some(entry) = inner.timers.remove(&id) else {
            return;
        };
        let TimerKind::Every { period, .. } = entry.kind else {
            return;
        };
        let due = entry.due + period;
        inner.enqueue(
            id,
            due,
            TimerKind::Every {
                period,
                callback: Some(callback),
            },
        );
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Millis {
        self.inner.borrow().now
    }

    fn wall_time(&self) -> NaiveTime {
        let inner = self.inner.borrow();
        let elapsed = chrono::Duration::milliseconds(inner.now as i64);
        inner.wall_origin.overflowing_add_signed(elapsed).0
    }

    fn set_timeout(&self, delay: Millis, callback: TimerCallback) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate();
        let due = inner.now.saturating_add(delay);
        inner.enqueue(id, due, TimerKind::Once(Some(callback)));
        id
    }

    fn set_interval(&self, period: Millis, callback: IntervalCallback) -> TimerId {
        let period = period.max(1);
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate();
        let due = inner.now.saturating_add(period);
        inner.enqueue(
            id,
            due,
            TimerKind::Every {
                period,
                callback: Some(callback),
            },
        );
        id
    }

    fn clear(&self, id: TimerId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(entry) = inner.timers.remove(&id) {
            inner.queue.remove(&(entry.due, entry.seq));
        }
    }
}
