// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timed reveal sequences.

use crate::clock::{Millis, SharedClock, TimerId};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

/// An item revealed `delay_ms` after its sequence starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealItem<T> {
    /// What becomes visible
    pub payload: T,
    /// Delay from sequence start (not from the previous item)
    pub delay_ms: Millis,
}

impl<T> RevealItem<T> {
    /// Create a new reveal item
    pub fn new(payload: T, delay_ms: Millis) -> Self {
        Self { payload, delay_ms }
    }

    /// Items spaced a fixed interval apart, the first at 0
    pub fn staggered(payloads: impl IntoIterator<Item = T>, spacing: Millis) -> Vec<Self> {
        payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| Self::new(payload, i as Millis * spacing))
            .collect()
    }

    /// Shift the delay by `offset`
    pub fn offset_by(mut self, offset: Millis) -> Self {
        self.delay_ms = self.delay_ms.saturating_add(offset);
        self
    }
}

/// Latest delay in a list of items, i.e. when the last one appears
pub fn total_delay<T>(items: &[RevealItem<T>]) -> Millis {
    items.iter().map(|item| item.delay_ms).max().unwrap_or(0)
}

/// Count state shared with scheduled callbacks
#[derive(Debug, Default)]
struct RunState {
    visible: Cell<usize>,
    total: Cell<usize>,
    running: Cell<bool>,
    generation: Cell<u64>,
}

impl RunState {
    fn reveal(&self, generation: u64, index: usize) {
        if self.generation.get() != generation {
            return;
        }
        let count = self.visible.get().max(index + 1);
        self.visible.set(count);
        if count >= self.total.get() {
            self.running.set(false);
        }
    }
}

struct SequencerInner<T> {
    clock: SharedClock,
    label: &'static str,
    items: RefCell<Vec<RevealItem<T>>>,
    run: Rc<RunState>,
    timers: RefCell<Vec<TimerId>>,
}

impl<T> SequencerInner<T> {
    fn clear_timers(&self) {
        for id in self.timers.borrow_mut().drain(..) {
            self.clock.clear(id);
        }
    }
}

impl<T> Drop for SequencerInner<T> {
    fn drop(&mut self) {
        self.clear_timers();
    }
}

/// Exposes a non-decreasing visible count over time for an ordered item list.
///
/// Cloning yields another handle to the same sequence. Dropping the last
/// handle cancels every pending timer.
pub struct RevealSequencer<T> {
    inner: Rc<SequencerInner<T>>,
}

impl<T> Clone for RevealSequencer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> RevealSequencer<T> {
    /// Create an idle sequencer
    pub fn new(clock: SharedClock) -> Self {
        Self::with_label(clock, "sequence")
    }

    /// Create an idle sequencer with a label for log output
    pub fn with_label(clock: SharedClock, label: &'static str) -> Self {
        Self {
            inner: Rc::new(SequencerInner {
                clock,
                label,
                items: RefCell::new(Vec::new()),
                run: Rc::new(RunState::default()),
                timers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Begin revealing `items`.
    ///
    /// Ignored while a run is still in flight; use [`restart`](Self::restart)
    /// to replace it. Returns whether a run began.
    pub fn start(&self, items: Vec<RevealItem<T>>) -> bool {
        if self.is_running() {
            tracing::debug!(sequence = self.inner.label, "start ignored, run in flight");
            return false;
        }
        self.begin(items);
        true
    }

    /// Cancel any run and start a fresh one from a visible count of 0
    pub fn restart(&self, items: Vec<RevealItem<T>>) {
        self.cancel();
        self.begin(items);
    }

    /// Invalidate every pending timer of the current run.
    ///
    /// The visible count is left as it is. Safe to call at any time.
    pub fn cancel(&self) {
        let run = &self.inner.run;
        run.generation.set(run.generation.get() + 1);
        run.running.set(false);
        self.inner.clear_timers();
    }

    fn begin(&self, items: Vec<RevealItem<T>>) {
        self.inner.clear_timers();
        let run = &self.inner.run;
        let generation = run.generation.get() + 1;
        run.generation.set(generation);
        run.visible.set(0);
        run.total.set(items.len());
        run.running.set(!items.is_empty());

        tracing::debug!(
            sequence = self.inner.label,
            items = items.len(),
            last_ms = total_delay(&items),
            "Starting reveal"
        );

        let mut timers = self.inner.timers.borrow_mut();
        for (index, item) in items.iter().enumerate() {
            let weak: Weak<RunState> = Rc::downgrade(run);
            let id = self.inner.clock.set_timeout(
                item.delay_ms,
                Box::new(move || {
                    if let Some(run) = weak.upgrade() {
                        run.reveal(generation, index);
                    }
                }),
            );
            timers.push(id);
        }
        drop(timers);

        *self.inner.items.borrow_mut() = items;
    }

    /// Number of items currently shown
    pub fn visible_count(&self) -> usize {
        self.inner.run.visible.get()
    }

    /// Number of items in the current run
    pub fn len(&self) -> usize {
        self.inner.run.total.get()
    }

    /// Whether the current run has no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the current run still has items to reveal.
    ///
    /// With out-of-order delays this turns false once every item is shown,
    /// even if a timer of the run is still scheduled; the next `start`
    /// clears such timers.
    pub fn is_running(&self) -> bool {
        self.inner.run.running.get()
    }

    /// Whether every item of the current run is shown
    pub fn is_complete(&self) -> bool {
        self.visible_count() == self.len()
    }

    /// The items currently shown, in order
    pub fn visible(&self) -> Ref<'_, [RevealItem<T>]> {
        let count = self.visible_count();
        Ref::map(self.inner.items.borrow(), |items| &items[..count.min(items.len())])
    }
}
