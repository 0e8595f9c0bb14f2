// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scroll-geometry viewport.
//!
//! Regions are vertical extents of the page. The visible window spans
//! `[scroll_top, scroll_top + height)`, and a region's ratio is the share of
//! its height inside that window.

use showcase_playback::viewport::deliver;
use showcase_playback::{ObserverId, ObserverRegistry, RegionId, Viewport, VisibilityCallback};
use std::cell::RefCell;
use std::rc::Rc;

/// Vertical extent of a page region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Offset from the top of the page
    pub top: f32,
    /// Height of the region
    pub height: f32,
}

impl Extent {
    /// Create an extent
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    /// Share of this extent inside `[window_top, window_top + window_height)`
    pub fn intersection_ratio(&self, window_top: f32, window_height: f32) -> f32 {
        if self.height <= 0.0 {
            return 0.0;
        }
        let start = self.top.max(window_top);
        let end = (self.top + self.height).min(window_top + window_height);
        ((end - start).max(0.0) / self.height).clamp(0.0, 1.0)
    }
}

struct ScrollInner {
    next_region: u64,
    scroll_top: f32,
    height: f32,
    regions: Vec<(RegionId, Extent, f32)>,
    observers: ObserverRegistry,
}

impl ScrollInner {
    /// Recompute every ratio, returning the regions whose ratio changed
    fn recompute(&mut self) -> Vec<(RegionId, f32)> {
        let (top, height) = (self.scroll_top, self.height);
        let mut changed = Vec::new();
        for (id, extent, ratio) in &mut self.regions {
            let next = extent.intersection_ratio(top, height);
            if (next - *ratio).abs() >= f32::EPSILON {
                *ratio = next;
                changed.push((*id, next));
            }
        }
        changed
    }
}

/// Viewport computed from a scroll position over page regions.
pub struct ScrollViewport {
    inner: RefCell<ScrollInner>,
}

impl ScrollViewport {
    /// Create a viewport at the top of the page
    pub fn new(height: f32) -> Self {
        Self {
            inner: RefCell::new(ScrollInner {
                next_region: 0,
                scroll_top: 0.0,
                height,
                regions: Vec::new(),
                observers: ObserverRegistry::new(),
            }),
        }
    }

    /// Create a shared viewport
    pub fn shared(height: f32) -> Rc<Self> {
        Rc::new(Self::new(height))
    }

    /// Add a page region
    pub fn add_region(&self, extent: Extent) -> RegionId {
        let mut inner = self.inner.borrow_mut();
        inner.next_region += 1;
        let id = RegionId(inner.next_region);
        let ratio = extent.intersection_ratio(inner.scroll_top, inner.height);
        inner.regions.push((id, extent, ratio));
        id
    }

    /// Remove a region and its observers
    pub fn remove_region(&self, region: RegionId) {
        let mut inner = self.inner.borrow_mut();
        inner.regions.retain(|(id, _, _)| *id != region);
        inner.observers.remove_region(region);
    }

    /// Move the window's top edge
    pub fn scroll_to(&self, scroll_top: f32) {
        self.update(|inner| inner.scroll_top = scroll_top.max(0.0));
    }

    /// Change the window height
    pub fn resize(&self, height: f32) {
        self.update(|inner| inner.height = height.max(0.0));
    }

    /// Current scroll offset
    pub fn scroll_top(&self) -> f32 {
        self.inner.borrow().scroll_top
    }

    /// Number of live observers
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    fn update(&self, change: impl FnOnce(&mut ScrollInner)) {
        let notifications = {
            let mut inner = self.inner.borrow_mut();
            change(&mut inner);
            let changed = inner.recompute();
            if changed.is_empty() {
                return;
            }
            tracing::trace!(regions = changed.len(), "Visibility changed");
            inner.observers.targets(&changed)
        };
        deliver(notifications, |id| self.inner.borrow().observers.contains(id));
    }
}

impl Viewport for ScrollViewport {
    fn ratio(&self, region: RegionId) -> f32 {
        self.inner
            .borrow()
            .regions
            .iter()
            .find(|(id, _, _)| *id == region)
            .map_or(0.0, |(_, _, ratio)| *ratio)
    }

    fn observe(&self, region: RegionId, callback: VisibilityCallback) -> ObserverId {
        self.inner.borrow_mut().observers.insert(region, callback)
    }

    fn unobserve(&self, id: ObserverId) {
        self.inner.borrow_mut().observers.remove(id);
    }
}
