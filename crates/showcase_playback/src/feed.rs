// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rolling feed of synthetic service events.
//!
//! [`FeedLog`] is the bounded, newest-first log. [`RollingFeed`] fills one on
//! a fixed cadence with events drawn from an injected [`FeedCatalog`].

use crate::clock::{Millis, SharedClock, TimerId};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 8;

/// Largest capacity settings may ask for
pub const MAX_CAPACITY: usize = 1024;

/// Default time between entries
pub const DEFAULT_CADENCE_MS: Millis = 3500;

/// Kind of synthetic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Full decompilation of a binary
    Decompile,
    /// Binary analysis pass
    Analyze,
    /// Cross-reference scan
    Xref,
    /// Control flow graph recovery
    Cfg,
    /// Binary patching
    Patch,
}

impl EventCategory {
    /// All categories, in display order
    pub fn all() -> &'static [EventCategory] {
        &[
            Self::Decompile,
            Self::Analyze,
            Self::Xref,
            Self::Cfg,
            Self::Patch,
        ]
    }
}

/// Display metadata for a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStyle {
    /// Label shown in the feed
    pub label: String,
    /// RGB color
    pub color: [u8; 3],
}

impl CategoryStyle {
    /// Create a style
    pub fn new(label: impl Into<String>, color: [u8; 3]) -> Self {
        Self {
            label: label.into(),
            color,
        }
    }
}

/// Lookup table from category to display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPalette {
    styles: IndexMap<EventCategory, CategoryStyle>,
    fallback: CategoryStyle,
}

impl CategoryPalette {
    /// Palette with no entries; every lookup yields `fallback`
    pub fn empty(fallback: CategoryStyle) -> Self {
        Self {
            styles: IndexMap::new(),
            fallback,
        }
    }

    /// Add or replace a category's style
    pub fn with(mut self, category: EventCategory, style: CategoryStyle) -> Self {
        self.styles.insert(category, style);
        self
    }

    /// Style for `category`, or the fallback
    pub fn style(&self, category: EventCategory) -> &CategoryStyle {
        self.styles.get(&category).unwrap_or(&self.fallback)
    }
}

impl Default for CategoryPalette {
    fn default() -> Self {
        Self::empty(CategoryStyle::new("EVENT", [161, 161, 170]))
            .with(EventCategory::Decompile, CategoryStyle::new("DECOMPILE", [251, 191, 36]))
            .with(EventCategory::Analyze, CategoryStyle::new("ANALYZE", [96, 165, 250]))
            .with(EventCategory::Xref, CategoryStyle::new("XREF", [52, 211, 153]))
            .with(EventCategory::Cfg, CategoryStyle::new("CFG", [192, 132, 252]))
            .with(EventCategory::Patch, CategoryStyle::new("PATCH", [161, 161, 170]))
    }
}

/// A catalog event before it is stamped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEvent {
    /// Event kind
    pub category: EventCategory,
    /// Human-readable detail
    pub detail: String,
}

impl CatalogEvent {
    /// Create a catalog event
    pub fn new(category: EventCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }
}

/// Fixed set of events the feed draws from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCatalog {
    /// Candidate events, drawn uniformly
    pub events: Vec<CatalogEvent>,
}

impl FeedCatalog {
    /// Create a catalog
    pub fn new(events: Vec<CatalogEvent>) -> Self {
        Self { events }
    }

    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Draw one event uniformly at random
    pub fn draw(&self, rng: &mut impl Rng) -> Option<&CatalogEvent> {
        if self.events.is_empty() {
            return None;
        }
        self.events.get(rng.gen_range(0..self.events.len()))
    }
}

/// A stamped feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// 24-hour local time, `HH:MM:SS`
    pub timestamp: String,
    /// Event kind
    pub category: EventCategory,
    /// Human-readable detail
    pub detail: String,
}

/// Newest-first log holding at most `capacity` entries
#[derive(Debug, Clone)]
pub struct FeedLog {
    capacity: usize,
    entries: VecDeque<FeedEntry>,
}

impl FeedLog {
    /// Create an empty log
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    /// Insert at the front, dropping the oldest entries past capacity
    pub fn push(&mut self, entry: FeedEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest entry
    pub fn latest(&self) -> Option<&FeedEntry> {
        self.entries.front()
    }
}

/// Feed sizing, timing and seeding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Entries kept
    pub capacity: usize,
    /// Time between entries
    pub cadence_ms: Millis,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            cadence_ms: DEFAULT_CADENCE_MS,
            seed: None,
        }
    }
}

struct FeedInner {
    clock: SharedClock,
    catalog: Rc<FeedCatalog>,
    cadence_ms: Millis,
    log: RefCell<FeedLog>,
    rng: RefCell<ChaCha8Rng>,
    active: Cell<bool>,
    interval: Cell<Option<TimerId>>,
}

impl FeedInner {
    fn produce(&self) {
        let entry = {
            let mut rng = self.rng.borrow_mut();
            let Some(event) = self.catalog.draw(&mut *rng) else {
                return;
            };
            FeedEntry {
                timestamp: self.clock.wall_time().format("%H:%M:%S").to_string(),
                category: event.category,
                detail: event.detail.clone(),
            }
        };
        tracing::trace!(category = ?entry.category, "Feed entry");
        self.log.borrow_mut().push(entry);
    }

    fn stop(&self) {
        if let Some(id) = self.interval.take() {
            self.clock.clear(id);
        }
    }
}

impl Drop for FeedInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Bounded log that gains one random catalog event per cadence tick.
#[derive(Clone)]
pub struct RollingFeed {
    inner: Rc<FeedInner>,
}

impl RollingFeed {
    /// Create an inactive feed
    pub fn new(clock: SharedClock, catalog: Rc<FeedCatalog>, settings: &FeedSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        if catalog.is_empty() {
            tracing::warn!("Feed catalog is empty, feed will stay empty");
        }
        Self {
            inner: Rc::new(FeedInner {
                clock,
                catalog,
                cadence_ms: settings.cadence_ms,
                log: RefCell::new(FeedLog::new(settings.capacity)),
                rng: RefCell::new(rng),
                active: Cell::new(false),
                interval: Cell::new(None),
            }),
        }
    }

    /// Produce one entry now, then one per cadence tick. Idempotent.
    pub fn activate(&self) {
        let inner = &self.inner;
        if inner.active.replace(true) {
            return;
        }
        inner.produce();

        let weak: Weak<FeedInner> = Rc::downgrade(inner);
        let id = inner.clock.set_interval(
            inner.cadence_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.produce();
                }
            }),
        );
        inner.interval.set(Some(id));
        tracing::debug!(cadence_ms = inner.cadence_ms, "Feed activated");
    }

    /// Stop producing entries. Existing entries stay.
    pub fn teardown(&self) {
        self.inner.stop();
    }

    /// Whether the cadence timer is live
    pub fn is_active(&self) -> bool {
        self.inner.interval.get().is_some()
    }

    /// Read access to the log
    pub fn log(&self) -> Ref<'_, FeedLog> {
        self.inner.log.borrow()
    }

    /// Copy of the entries, newest first
    pub fn entries(&self) -> Vec<FeedEntry> {
        self.inner.log.borrow().iter().cloned().collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.inner.log.borrow().len()
    }

    /// Whether the feed has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use chrono::NaiveTime;

    fn entry(n: usize) -> FeedEntry {
        FeedEntry {
            timestamp: format!("00:00:{n:02}"),
            category: EventCategory::Decompile,
            detail: format!("event {n}"),
        }
    }

    fn catalog() -> Rc<FeedCatalog> {
        Rc::new(FeedCatalog::new(vec![
            CatalogEvent::new(EventCategory::Decompile, "x86_64 ELF"),
            CatalogEvent::new(EventCategory::Xref, "Cross-reference scan"),
            CatalogEvent::new(EventCategory::Patch, "Binary patch applied"),
        ]))
    }

    fn seeded(seed: u64) -> FeedSettings {
        FeedSettings {
            seed: Some(seed),
            ..FeedSettings::default()
        }
    }

    #[test]
    fn test_log_keeps_newest_k() {
        let mut log = FeedLog::new(8);
        for n in 0..13 {
            log.push(entry(n));
        }
        assert_eq!(log.len(), 8);
        let details: Vec<_> = log.iter().map(|e| e.detail.clone()).collect();
        let expected: Vec<_> = (5..13).rev().map(|n| format!("event {n}")).collect();
        assert_eq!(details, expected);
        assert_eq!(log.latest().map(|e| e.detail.as_str()), Some("event 12"));
    }

    #[test]
    fn test_huge_capacity_log_allocates_lazily() {
        let mut log = FeedLog::new(usize::MAX);
        assert_eq!(log.capacity(), usize::MAX);
        log.push(entry(1));
        log.push(entry(2));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_zero_capacity_log_stays_empty() {
        let mut log = FeedLog::new(0);
        log.push(entry(1));
        assert!(log.is_empty());
    }

    #[test]
    fn test_activation_produces_immediately_then_on_cadence() {
        let clock = VirtualClock::shared();
        let feed = RollingFeed::new(clock.clone(), catalog(), &seeded(7));
        assert!(feed.is_empty());

        feed.activate();
        assert_eq!(feed.len(), 1);
        clock.advance(3499);
        assert_eq!(feed.len(), 1);
        clock.advance(1);
        assert_eq!(feed.len(), 2);

        feed.activate();
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_feed_caps_at_capacity_newest_first() {
        let origin = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let clock = Rc::new(VirtualClock::with_wall_origin(origin));
        let feed = RollingFeed::new(clock.clone(), catalog(), &seeded(1));
        feed.activate();
        clock.advance(3500 * 11);

        let stamps: Vec<_> = feed.entries().into_iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps.len(), 8);
        assert_eq!(stamps.first().map(String::as_str), Some("09:00:38"));
        assert_eq!(stamps.last().map(String::as_str), Some("09:00:14"));
        let mut sorted = stamps.clone();
        sorted.sort();
        sorted.reverse();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let run = |seed| {
            let clock = VirtualClock::shared();
            let feed = RollingFeed::new(clock.clone(), catalog(), &seeded(seed));
            feed.activate();
            clock.advance(3500 * 7);
            feed.entries()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_teardown_stops_cadence() {
        let clock = VirtualClock::shared();
        let feed = RollingFeed::new(clock.clone(), catalog(), &seeded(3));
        feed.activate();
        clock.advance(3500);
        feed.teardown();
        assert!(!feed.is_active());
        clock.advance(3500 * 10);
        assert_eq!(feed.len(), 2);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_empty_catalog_produces_nothing() {
        let clock = VirtualClock::shared();
        let feed = RollingFeed::new(clock.clone(), Rc::new(FeedCatalog::default()), &seeded(3));
        feed.activate();
        clock.advance(3500 * 3);
        assert!(feed.is_empty());
    }

    #[test]
    fn test_palette_lookup_with_fallback() {
        let palette = CategoryPalette::default();
        assert_eq!(palette.style(EventCategory::Cfg).label, "CFG");

        let sparse = CategoryPalette::empty(CategoryStyle::new("EVENT", [1, 2, 3]))
            .with(EventCategory::Xref, CategoryStyle::new("XREF", [0, 255, 0]));
        assert_eq!(sparse.style(EventCategory::Xref).color, [0, 255, 0]);
        assert_eq!(sparse.style(EventCategory::Patch).label, "EVENT");
        for category in EventCategory::all() {
            assert!(!palette.style(*category).label.is_empty());
        }
    }
}
