// SPDX-License-Identifier: MIT OR Apache-2.0
//! Staged playback engine for the showcase page.
//!
//! This crate drives the page's time-ordered reveal animations:
//! - Timed reveal sequences (disassembly rows, source lines, graph nodes)
//! - Animated numeric counters
//! - One-shot viewport triggers
//! - A bounded rolling event feed
//! - The decompilation demo orchestrator
//!
//! ## Architecture
//!
//! Everything runs on a single-threaded cooperative model. Work is scheduled
//! through two capabilities supplied by the host:
//! - [`Clock`] for one-shot and repeating timers
//! - [`Viewport`] for region visibility changes
//!
//! Tests use [`VirtualClock`] and [`ManualViewport`] to step time and
//! visibility by hand. Components own their timers and observers and release
//! them on teardown or drop.

pub mod clock;
pub mod counter;
pub mod demo;
pub mod feed;
pub mod sequence;
pub mod trigger;
pub mod viewport;

pub use clock::{Clock, IntervalCallback, Millis, SharedClock, TimerCallback, TimerId, VirtualClock};
pub use counter::{group_thousands, CounterAnimator, CounterFormat, CounterSpec};
pub use demo::{AsmLine, DemoOrchestrator, DemoScript, DemoTiming, SampleBinary, SourceLine};
pub use feed::{
    CatalogEvent, CategoryPalette, CategoryStyle, EventCategory, FeedCatalog, FeedEntry, FeedLog,
    FeedSettings, RollingFeed,
};
pub use sequence::{total_delay, RevealItem, RevealSequencer};
pub use trigger::ViewportTrigger;
pub use viewport::{
    ManualViewport, ObserverId, ObserverRegistry, RegionId, SharedViewport, Viewport,
    VisibilityCallback,
};
