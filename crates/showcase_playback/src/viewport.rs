// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visibility capability.
//!
//! A [`Viewport`] reports how much of each registered region is on screen as
//! an intersection ratio in `[0, 1]`, and notifies observers when that ratio
//! changes. [`ObserverRegistry`] holds the bookkeeping shared by every
//! implementation; [`ManualViewport`] lets callers set ratios directly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Callback receiving a region's new intersection ratio
pub type VisibilityCallback = Box<dyn FnMut(f32)>;

/// Shared handle to a visibility capability
pub type SharedViewport = Rc<dyn Viewport>;

/// Identifier of an observable region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u64);

/// Handle to a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Visibility-observation primitive.
///
/// `observe` never invokes the callback synchronously; callers that care
/// about the initial state read [`Viewport::ratio`] after registering.
pub trait Viewport {
    /// Current intersection ratio of `region` (0 for unknown regions)
    fn ratio(&self, region: RegionId) -> f32;

    /// Start receiving ratio changes for `region`
    fn observe(&self, region: RegionId, callback: VisibilityCallback) -> ObserverId;

    /// Stop an observer. Safe to call from inside its own callback.
    fn unobserve(&self, id: ObserverId);
}

struct Observer {
    region: RegionId,
    callback: Rc<RefCell<VisibilityCallback>>,
}

/// Observer bookkeeping shared by viewport implementations.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: HashMap<ObserverId, Observer>,
}

impl ObserverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `region`
    pub fn insert(&mut self, region: RegionId, callback: VisibilityCallback) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.insert(
            id,
            Observer {
                region,
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        id
    }

    /// Remove an observer
    pub fn remove(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Remove every observer of `region`
    pub fn remove_region(&mut self, region: RegionId) {
        self.observers.retain(|_, o| o.region != region);
    }

    /// Whether an observer is still registered
    pub fn contains(&self, id: ObserverId) -> bool {
        self.observers.contains_key(&id)
    }

    /// Number of live observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Observers of `regions`, ready to be notified outside any borrow.
    pub fn targets(&self, regions: &[(RegionId, f32)]) -> Vec<Notification> {
        let mut out: Vec<Notification> = self
            .observers
            .iter()
            .filter_map(|(id, o)| {
                regions
                    .iter()
                    .find(|(r, _)| *r == o.region)
                    .map(|(_, ratio)| Notification {
                        id: *id,
                        ratio: *ratio,
                        callback: o.callback.clone(),
                    })
            })
            .collect();
        out.sort_by_key(|n| n.id);
        out
    }
}

/// A pending observer notification
pub struct Notification {
    id: ObserverId,
    ratio: f32,
    callback: Rc<RefCell<VisibilityCallback>>,
}

/// Deliver notifications, skipping observers removed by earlier callbacks.
///
/// `still_registered` is consulted before each delivery so an observer that
/// unsubscribes mid-batch is never called again.
pub fn deliver(notifications: Vec<Notification>, still_registered: impl Fn(ObserverId) -> bool) {
    for n in notifications {
        if !still_registered(n.id) {
            continue;
        }
        // A callback already on the stack is not re-entered.
        if let Ok(mut callback) = n.callback.try_borrow_mut() {
            (*callback)(n.ratio);
        }
    }
}

struct ManualInner {
    next_region: u64,
    ratios: HashMap<RegionId, f32>,
    observers: ObserverRegistry,
}

/// Viewport whose ratios are set by hand.
pub struct ManualViewport {
    inner: RefCell<ManualInner>,
}

impl ManualViewport {
    /// Create a viewport with no regions
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(ManualInner {
                next_region: 0,
                ratios: HashMap::new(),
                observers: ObserverRegistry::new(),
            }),
        }
    }

    /// Create a shared viewport
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Register a region, initially off screen
    pub fn add_region(&self) -> RegionId {
        let mut inner = self.inner.borrow_mut();
        inner.next_region += 1;
        let id = RegionId(inner.next_region);
        inner.ratios.insert(id, 0.0);
        id
    }

    /// Tear a region down, dropping its observers
    pub fn remove_region(&self, region: RegionId) {
        let mut inner = self.inner.borrow_mut();
        inner.ratios.remove(&region);
        inner.observers.remove_region(region);
    }

    /// Set a region's intersection ratio, notifying observers on change
    pub fn set_ratio(&self, region: RegionId, ratio: f32) {
        let ratio = ratio.clamp(0.0, 1.0);
        let notifications = {
            let mut inner = self.inner.borrow_mut();
            let Some(current) = inner.ratios.get_mut(&region) else {
                return;
            };
            if (*current - ratio).abs() < f32::EPSILON {
                return;
            }
            *current = ratio;
            inner.observers.targets(&[(region, ratio)])
        };
        deliver(notifications, |id| self.inner.borrow().observers.contains(id));
    }

    /// Number of live observers across all regions
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }
}

impl Default for ManualViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport for ManualViewport {
    fn ratio(&self, region: RegionId) -> f32 {
        self.inner.borrow().ratios.get(&region).copied().unwrap_or(0.0)
    }

    fn observe(&self, region: RegionId, callback: VisibilityCallback) -> ObserverId {
        self.inner.borrow_mut().observers.insert(region, callback)
    }

    fn unobserve(&self, id: ObserverId) {
        self.inner.borrow_mut().observers.remove(id);
    }
}
