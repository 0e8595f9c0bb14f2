// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot activation when a region scrolls into view.

use crate::viewport::{ObserverId, RegionId, SharedViewport};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Default intersection ratio a region must reach to count as visible
pub const DEFAULT_THRESHOLD: f32 = 0.2;

type StartCallback = Box<dyn FnOnce()>;

struct TriggerInner {
    viewport: SharedViewport,
    threshold: f32,
    fired: Cell<bool>,
    observer: Cell<Option<ObserverId>>,
    on_enter: RefCell<Option<StartCallback>>,
}

impl TriggerInner {
    fn release(&self) {
        if let Some(id) = self.observer.take() {
            self.viewport.unobserve(id);
        }
    }

    fn on_ratio(&self, ratio: f32) {
        if self.fired.get() || ratio <= 0.0 || ratio < self.threshold {
            return;
        }
        self.fired.set(true);
        self.release();
        tracing::debug!(ratio, "Viewport trigger fired");

        let callback = self.on_enter.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Latch that runs a start callback the first time its region is visible.
///
/// Leaving and re-entering the viewport afterwards does nothing. Observation
/// stops once the latch fires or the trigger is torn down (explicitly or by
/// dropping it).
pub struct ViewportTrigger {
    inner: Rc<TriggerInner>,
}

impl ViewportTrigger {
    /// Observe `region` and call `on_enter` once it reaches `threshold`.
    ///
    /// A region that is already visible fires immediately.
    pub fn new(
        viewport: SharedViewport,
        region: RegionId,
        threshold: f32,
        on_enter: impl FnOnce() + 'static,
    ) -> Self {
        let inner = Rc::new(TriggerInner {
            viewport: viewport.clone(),
            threshold: threshold.clamp(0.0, 1.0),
            fired: Cell::new(false),
            observer: Cell::new(None),
            on_enter: RefCell::new(Some(Box::new(on_enter))),
        });

        let weak: Weak<TriggerInner> = Rc::downgrade(&inner);
        let id = viewport.observe(
            region,
            Box::new(move |ratio| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_ratio(ratio);
                }
            }),
        );
        inner.observer.set(Some(id));

        inner.on_ratio(viewport.ratio(region));
        Self { inner }
    }

    /// Whether the latch has fired
    pub fn fired(&self) -> bool {
        self.inner.fired.get()
    }

    /// Whether the region is still being observed
    pub fn is_observing(&self) -> bool {
        self.inner.observer.get().is_some()
    }

    /// Stop observing without firing. The start callback is discarded.
    pub fn teardown(&self) {
        self.inner.release();
        self.inner.on_enter.borrow_mut().take();
    }
}

impl Drop for ViewportTrigger {
    fn drop(&mut self) {
        self.inner.release();
    }
}
