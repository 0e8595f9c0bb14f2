// SPDX-License-Identifier: MIT OR Apache-2.0
//! The showcase page: every animated section wired to one clock and viewport.

use crate::content::{self, StatTile};
use crate::settings::{ShowcaseSettings, TourAction};
use crate::viewport::{Extent, ScrollViewport};
use showcase_graph::{CfgElement, CfgError, ControlFlowGraph};
use showcase_playback::{
    CategoryPalette, CounterAnimator, DemoOrchestrator, RegionId, RevealItem, RevealSequencer,
    RollingFeed, SharedClock, SharedViewport, Viewport, ViewportTrigger,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Vertical placement of the page sections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Decompilation demo
    pub demo: Extent,
    /// Stats grid
    pub stats: Extent,
    /// Control-flow graph
    pub graph: Extent,
    /// Live feed
    pub feed: Extent,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            demo: Extent::new(0.0, 800.0),
            stats: Extent::new(900.0, 200.0),
            graph: Extent::new(1500.0, 500.0),
            feed: Extent::new(2200.0, 400.0),
        }
    }
}

/// Region handles of the mounted sections
#[derive(Debug, Clone, Copy)]
pub struct PageRegions {
    /// Decompilation demo
    pub demo: RegionId,
    /// Stats grid
    pub stats: RegionId,
    /// Control-flow graph
    pub graph: RegionId,
    /// Live feed
    pub feed: RegionId,
}

/// A stat tile with its running counter
pub struct StatCounter {
    /// Caption under the number
    pub label: &'static str,
    /// The counter
    pub counter: CounterAnimator,
}

/// All live sections of the page.
pub struct Page {
    viewport: Rc<ScrollViewport>,
    threshold: f32,
    regions: PageRegions,
    palette: CategoryPalette,
    demo: DemoOrchestrator,
    feed: RollingFeed,
    stats: Vec<StatCounter>,
    graph: ControlFlowGraph,
    graph_plan: Vec<RevealItem<CfgElement>>,
    graph_reveal: RevealSequencer<CfgElement>,
    triggers: RefCell<Vec<ViewportTrigger>>,
    torn_down: Cell<bool>,
}

impl Page {
    /// Build the page. Nothing runs until [`mount`](Self::mount).
    pub fn new(
        clock: SharedClock,
        viewport: Rc<ScrollViewport>,
        layout: PageLayout,
        settings: &ShowcaseSettings,
    ) -> Result<Self, CfgError> {
        let script = Rc::new(content::demo_script());
        let graph = ControlFlowGraph::from_listing("compute_sum", &script.disassembly)?;
        let graph_plan = graph.reveal_plan(settings.graph.node_spacing_ms);

        let regions = PageRegions {
            demo: viewport.add_region(layout.demo),
            stats: viewport.add_region(layout.stats),
            graph: viewport.add_region(layout.graph),
            feed: viewport.add_region(layout.feed),
        };

        let demo = DemoOrchestrator::new(
            clock.clone(),
            script,
            content::sample_binaries().into(),
            settings.demo.clone(),
        );
        let catalog = Rc::new(content::feed_catalog());
        let feed = RollingFeed::new(clock.clone(), catalog, &settings.feed);
        let stats = content::stat_tiles(settings.counters.duration_ms, settings.counters.tick_ms)
            .into_iter()
            .map(|StatTile { label, spec }| StatCounter {
                label,
                counter: CounterAnimator::new(clock.clone(), spec),
            })
            .collect();

        Ok(Self {
            viewport,
            threshold: settings.viewport.threshold,
            regions,
            palette: CategoryPalette::default(),
            demo,
            feed,
            stats,
            graph,
            graph_plan,
            graph_reveal: RevealSequencer::with_label(clock, "cfg"),
            triggers: RefCell::new(Vec::new()),
            torn_down: Cell::new(false),
        })
    }

    /// Start the page: demo autostart, live feed and the viewport-gated
    /// sections
    pub fn mount(&self) {
        self.demo.mount();
        self.feed.activate();

        let viewport: SharedViewport = self.viewport.clone();
        let mut triggers = Vec::with_capacity(self.stats.len() + 1);
        for stat in &self.stats {
            let counter = stat.counter.clone();
            let label = stat.label;
            triggers.push(ViewportTrigger::new(
                viewport.clone(),
                self.regions.stats,
                self.threshold,
                move || {
                    tracing::info!(stat = label, "Stat counter started");
                    counter.animate();
                },
            ));
        }

        let reveal = self.graph_reveal.clone();
        let plan = self.graph_plan.clone();
        triggers.push(ViewportTrigger::new(
            viewport,
            self.regions.graph,
            self.threshold,
            move || {
                tracing::info!(steps = plan.len(), "Graph reveal started");
                reveal.start(plan);
            },
        ));

        *self.triggers.borrow_mut() = triggers;
        tracing::info!("Page mounted");
    }

    /// Apply one reader action
    pub fn apply(&self, action: TourAction) {
        tracing::debug!(?action, "Tour action");
        match action {
            TourAction::ScrollTo(top) => self.viewport.scroll_to(top),
            TourAction::Resize(height) => self.viewport.resize(height),
            TourAction::SelectSample(sample) => self.demo.select_sample(sample),
            TourAction::RunDemo => {
                self.demo.trigger_run();
            }
        }
    }

    /// Stop every section and release its timers and observers.
    ///
    /// Runs once; returns whether this call did the work.
    pub fn teardown(&self) -> bool {
        if self.torn_down.replace(true) {
            return false;
        }
        for trigger in self.triggers.borrow_mut().drain(..) {
            trigger.teardown();
        }
        self.demo.teardown();
        self.feed.teardown();
        for stat in &self.stats {
            stat.counter.detach();
        }
        self.graph_reveal.cancel();

        let PageRegions { demo, stats, graph, feed } = self.regions;
        for region in [demo, stats, graph, feed] {
            self.viewport.remove_region(region);
        }
        tracing::info!("Page torn down");
        true
    }

    /// The decompilation demo
    pub fn demo(&self) -> &DemoOrchestrator {
        &self.demo
    }

    /// The live feed
    pub fn feed(&self) -> &RollingFeed {
        &self.feed
    }

    /// Feed category styles
    pub fn palette(&self) -> &CategoryPalette {
        &self.palette
    }

    /// Stat tiles
    pub fn stats(&self) -> &[StatCounter] {
        &self.stats
    }

    /// The recovered graph
    pub fn graph(&self) -> &ControlFlowGraph {
        &self.graph
    }

    /// The graph reveal sequence
    pub fn graph_reveal(&self) -> &RevealSequencer<CfgElement> {
        &self.graph_reveal
    }

    /// Region handles
    pub fn regions(&self) -> PageRegions {
        self.regions
    }

    /// Current intersection ratio of a section
    pub fn visibility(&self, region: RegionId) -> f32 {
        self.viewport.ratio(region)
    }

    /// Current scroll offset
    pub fn scroll_top(&self) -> f32 {
        self.viewport.scroll_top()
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use showcase_playback::VirtualClock;

    pub(crate) fn mounted_page(clock: &Rc<VirtualClock>) -> (Rc<ScrollViewport>, Page) {
        let mut settings = ShowcaseSettings::default();
        settings.feed.seed = Some(7);
        let viewport = ScrollViewport::shared(settings.viewport.window_height);
        let page =
            Page::new(clock.clone(), viewport.clone(), PageLayout::default(), &settings).unwrap();
        page.mount();
        (viewport, page)
    }

    #[test]
    fn test_mount_starts_demo_and_feed() {
        let clock = VirtualClock::shared();
        let (_viewport, page) = mounted_page(&clock);

        assert_eq!(page.feed().len(), 1);
        assert!(!page.demo().is_busy());

        clock.advance(1000);
        assert!(page.demo().is_busy());
        assert_eq!(page.demo().disassembly().visible_count(), 1);
    }

    #[test]
    fn test_gated_sections_wait_for_scroll() {
        let clock = VirtualClock::shared();
        let (viewport, page) = mounted_page(&clock);

        clock.advance(5000);
        assert!(page.stats().iter().all(|s| !s.counter.is_running()));
        assert_eq!(page.graph_reveal().visible_count(), 0);

        page.apply(TourAction::ScrollTo(700.0));
        assert!(page.stats().iter().all(|s| s.counter.is_running()));
        clock.advance(2000);
        assert_eq!(page.stats()[0].counter.display(), "847,291");
        assert_eq!(page.stats()[1].counter.display(), "12.4M");
        assert_eq!(page.stats()[3].counter.display(), "16");

        viewport.scroll_to(1300.0);
        assert!(page.graph_reveal().is_running());
        clock.advance(10_000);
        assert!(page.graph_reveal().is_complete());
        assert_eq!(
            page.graph_reveal().len(),
            page.graph().block_count() + page.graph().edge_count()
        );
    }

    #[test]
    fn test_tour_actions_drive_demo() {
        let clock = VirtualClock::shared();
        let (_viewport, page) = mounted_page(&clock);
        clock.advance(1000);
        assert_eq!(page.demo().run_count(), 1);

        page.apply(TourAction::SelectSample(2));
        assert_eq!(page.demo().selected_index(), 2);
        assert_eq!(page.demo().run_count(), 2);

        // Busy: the run control is disabled
        page.apply(TourAction::RunDemo);
        assert_eq!(page.demo().run_count(), 2);

        clock.advance(4500);
        assert!(!page.demo().is_busy());
        page.apply(TourAction::RunDemo);
        assert_eq!(page.demo().run_count(), 3);
        assert_eq!(page.demo().selected_index(), 2);
    }

    #[test]
    fn test_resize_reveals_stats() {
        let clock = VirtualClock::shared();
        let (_viewport, page) = mounted_page(&clock);
        assert_eq!(page.visibility(page.regions().stats), 0.0);

        page.apply(TourAction::Resize(1000.0));
        assert_eq!(page.visibility(page.regions().stats), 0.5);
        assert!(page.stats().iter().all(|s| s.counter.is_running()));
    }

    #[test]
    fn test_teardown_releases_everything() {
        let clock = VirtualClock::shared();
        let (viewport, page) = mounted_page(&clock);
        viewport.scroll_to(700.0);
        clock.advance(1200);

        assert!(page.teardown());
        assert_eq!(clock.pending(), 0);
        assert_eq!(viewport.observer_count(), 0);
    }

    #[test]
    fn test_teardown_runs_once() {
        let clock = VirtualClock::shared();
        let (viewport, page) = mounted_page(&clock);
        assert!(page.teardown());
        assert!(!page.teardown());
        drop(page);
        assert_eq!(clock.pending(), 0);
        assert_eq!(viewport.observer_count(), 0);
    }
}
