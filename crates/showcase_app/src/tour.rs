// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted reader tour.

use crate::page::Page;
use crate::settings::TourStep;
use showcase_playback::{SharedClock, TimerId};
use std::rc::{Rc, Weak};

/// Pending tour steps. Dropping the tour cancels the rest.
pub struct Tour {
    clock: SharedClock,
    timers: Vec<TimerId>,
}

impl Tour {
    /// Schedule every step against `page`
    pub fn schedule(clock: SharedClock, page: &Rc<Page>, steps: &[TourStep]) -> Self {
        let timers = steps
            .iter()
            .map(|step| {
                let page: Weak<Page> = Rc::downgrade(page);
                let action = step.action;
                clock.set_timeout(
                    step.at_ms,
                    Box::new(move || {
                        if let Some(page) = page.upgrade() {
                            page.apply(action);
                        }
                    }),
                )
            })
            .collect();
        tracing::debug!(steps = steps.len(), "Tour scheduled");
        Self { clock, timers }
    }

    /// Cancel the remaining steps
    pub fn cancel(&mut self) {
        for id in self.timers.drain(..) {
            self.clock.clear(id);
        }
    }
}

impl Drop for Tour {
    fn drop(&mut self) {
        self.cancel();
    }
}
