// SPDX-License-Identifier: MIT OR Apache-2.0
//! Showcase host loop.

use crate::host::TokioClock;
use crate::page::{Page, PageLayout};
use crate::render::FrameRenderer;
use crate::settings::ShowcaseSettings;
use crate::tour::Tour;
use crate::viewport::ScrollViewport;
use showcase_graph::CfgError;
use showcase_playback::Clock;
use std::rc::Rc;
use std::time::Duration;

/// Error that stops the showcase
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The demo listing could not be turned into a graph
    #[error("Failed to build control-flow graph: {0}")]
    Graph(#[from] CfgError),

    /// The async runtime could not start
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// The showcase application
pub struct ShowcaseApp {
    settings: ShowcaseSettings,
}

impl ShowcaseApp {
    /// Create the application
    pub fn new(settings: ShowcaseSettings) -> Self {
        Self { settings }
    }

    /// Run on a current-thread runtime until the configured runtime elapses
    pub fn run(self) -> Result<(), AppError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let local = tokio::task::LocalSet::new();
        local.block_on(&runtime, self.play())
    }

    async fn play(self) -> Result<(), AppError> {
        let settings = &self.settings;
        let clock = TokioClock::shared();
        let viewport = ScrollViewport::shared(settings.viewport.window_height);
        let page = Rc::new(Page::new(
            clock.clone(),
            viewport.clone(),
            PageLayout::default(),
            settings,
        )?);
        page.mount();
        let tour = Tour::schedule(clock.clone(), &page, &settings.tour.steps);

        let renderer = FrameRenderer::new(settings.render.ansi);
        let mut frames =
            tokio::time::interval(Duration::from_millis(settings.render.frame_interval_ms));
        let deadline = tokio::time::sleep(Duration::from_millis(settings.render.runtime_ms));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = frames.tick() => println!("{}\n", renderer.render(&page, clock.now())),
                _ = &mut deadline => break,
            }
        }

        drop(tour);
        page.teardown();
        tracing::info!(
            timers = clock.outstanding(),
            observers = viewport.observer_count(),
            "Showcase finished"
        );
        Ok(())
    }
}
