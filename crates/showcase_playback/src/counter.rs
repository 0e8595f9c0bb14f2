// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animated numeric counters.

use crate::clock::{Millis, SharedClock, TimerId};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Default animation length
pub const DEFAULT_DURATION_MS: Millis = 2000;

/// Default tick interval (roughly one frame at 60 Hz)
pub const DEFAULT_TICK_MS: Millis = 16;

/// How a counter value is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CounterFormat {
    /// Truncated integer with thousands separators
    #[default]
    Grouped,
    /// Truncated integer
    Integer,
    /// One decimal place, for targets that are not whole numbers
    OneDecimal,
}

impl CounterFormat {
    /// Render `value` for a counter whose target is `target`
    pub fn render(self, value: f64, target: f64) -> String {
        match self {
            Self::Grouped => group_thousands(value.trunc() as i64),
            Self::Integer => (value.trunc() as i64).to_string(),
            Self::OneDecimal if target.fract() != 0.0 => format!("{value:.1}"),
            Self::OneDecimal => (value.trunc() as i64).to_string(),
        }
    }
}

/// Format an integer with `,` between thousands groups
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parameters of one counter animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSpec {
    /// Final value
    pub target: f64,
    /// Total animation time
    pub duration_ms: Millis,
    /// Time between updates
    pub tick_ms: Millis,
    /// Display format
    pub format: CounterFormat,
    /// Text appended to the formatted number (e.g. `"M"`, `"s"`)
    #[serde(default)]
    pub suffix: String,
}

impl CounterSpec {
    /// Counter to `target` with the default timing
    pub fn new(target: f64, format: CounterFormat) -> Self {
        Self {
            target,
            duration_ms: DEFAULT_DURATION_MS,
            tick_ms: DEFAULT_TICK_MS,
            format,
            suffix: String::new(),
        }
    }

    /// Set the timing
    pub fn with_timing(mut self, duration_ms: Millis, tick_ms: Millis) -> Self {
        self.duration_ms = duration_ms;
        self.tick_ms = tick_ms;
        self
    }

    /// Set the display suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Number of ticks needed to reach the target
    pub fn tick_count(&self) -> u64 {
        let tick = self.tick_ms.max(1);
        self.duration_ms.div_ceil(tick).max(1)
    }

    /// Linear per-tick increment
    pub fn increment(&self) -> f64 {
        let steps = self.duration_ms as f64 / self.tick_ms.max(1) as f64;
        if steps <= 0.0 {
            self.target
        } else {
            self.target / steps
        }
    }
}

struct CounterState {
    clock: SharedClock,
    spec: CounterSpec,
    current: Cell<f64>,
    ticks: Cell<u64>,
    activated: Cell<bool>,
    done: Cell<bool>,
    interval: Cell<Option<TimerId>>,
}

impl CounterState {
    fn stop(&self) {
        if let Some(id) = self.interval.take() {
            self.clock.clear(id);
        }
    }

    fn tick(&self) {
        if self.done.get() {
            return;
        }
        let ticks = self.ticks.get() + 1;
        self.ticks.set(ticks);

        let target = self.spec.target;
        let next = self.current.get() + self.spec.increment();
        let reached = if target >= 0.0 { next >= target } else { next <= target };

        if reached || ticks >= self.spec.tick_count() {
            self.current.set(target);
            self.done.set(true);
            self.stop();
            tracing::trace!(value = target, ticks, "Counter finished");
        } else {
            self.current.set(next);
        }
    }
}

impl Drop for CounterState {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Interpolates a displayed number from 0 to a target, once.
///
/// The animation runs at most once per instance: later calls to
/// [`animate`](Self::animate) do nothing. Cloning yields another handle to
/// the same counter, so a viewport trigger can own one.
#[derive(Clone)]
pub struct CounterAnimator {
    state: Rc<CounterState>,
}

impl CounterAnimator {
    /// Create an idle counter showing 0
    pub fn new(clock: SharedClock, spec: CounterSpec) -> Self {
        Self {
            state: Rc::new(CounterState {
                clock,
                spec,
                current: Cell::new(0.0),
                ticks: Cell::new(0),
                activated: Cell::new(false),
                done: Cell::new(false),
                interval: Cell::new(None),
            }),
        }
    }

    /// Start ticking toward the target. Returns whether this call started it.
    pub fn animate(&self) -> bool {
        let state = &self.state;
        if state.activated.replace(true) {
            tracing::debug!(goal = state.spec.target, "Counter already activated");
            return false;
        }

        let weak: Weak<CounterState> = Rc::downgrade(state);
        let id = state.clock.set_interval(
            state.spec.tick_ms,
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    state.tick();
                }
            }),
        );
        state.interval.set(Some(id));
        true
    }

    /// Stop ticking. The counter keeps its current value.
    pub fn detach(&self) {
        self.state.stop();
    }

    /// Current interpolated value
    pub fn current(&self) -> f64 {
        self.state.current.get()
    }

    /// Final value
    pub fn target(&self) -> f64 {
        self.state.spec.target
    }

    /// Whether the target has been reached
    pub fn is_done(&self) -> bool {
        self.state.done.get()
    }

    /// Whether ticks are still scheduled
    pub fn is_running(&self) -> bool {
        self.state.interval.get().is_some()
    }

    /// Formatted value including the suffix
    pub fn display(&self) -> String {
        let spec = &self.state.spec;
        let value = if self.is_done() {
            spec.target
        } else {
            self.current()
        };
        format!("{}{}", spec.format.render(value, spec.target), spec.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(847_291), "847,291");
        assert_eq!(group_thousands(18_432_000), "18,432,000");
        assert_eq!(group_thousands(-2847), "-2,847");
    }

    #[test]
    fn test_render_truncates() {
        assert_eq!(CounterFormat::Grouped.render(1234.99, 5000.0), "1,234");
        assert_eq!(CounterFormat::Integer.render(15.9, 16.0), "15");
        assert_eq!(CounterFormat::OneDecimal.render(12.37, 12.4), "12.4");
        assert_eq!(CounterFormat::OneDecimal.render(7.8, 16.0), "7");
    }

    #[test]
    fn test_scenario_grouped_to_100() {
        let clock = VirtualClock::shared();
        let counter = CounterAnimator::new(
            clock.clone(),
            CounterSpec::new(100.0, CounterFormat::Grouped).with_timing(2000, 16),
        );
        assert_eq!(counter.display(), "0");
        assert!(counter.animate());

        let mut last = 0.0;
        let mut frames = Vec::new();
        while !counter.is_done() {
            clock.advance(16);
            assert!(counter.current() >= last);
            assert!(counter.current() <= 100.0);
            last = counter.current();
            frames.push(counter.display());
        }

        assert_eq!(counter.display(), "100");
        assert_eq!(counter.current(), 100.0);
        assert!(frames.len() <= 125);
        for frame in &frames {
            assert!(!frame.contains('.'));
            let n: i64 = frame.parse().unwrap();
            assert!((0..=100).contains(&n));
        }
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_final_frame_is_exact_target() {
        let clock = VirtualClock::shared();
        let counter = CounterAnimator::new(
            clock.clone(),
            CounterSpec::new(847_291.0, CounterFormat::Grouped).with_timing(2000, 16),
        );
        counter.animate();
        clock.advance(1000);
        assert!(!counter.is_done());
        clock.advance(2000);
        assert!(counter.is_done());
        assert_eq!(counter.display(), "847,291");
    }

    #[test]
    fn test_decimal_target_with_suffix() {
        let clock = VirtualClock::shared();
        let counter = CounterAnimator::new(
            clock.clone(),
            CounterSpec::new(12.4, CounterFormat::OneDecimal).with_suffix("M"),
        );
        counter.animate();
        clock.advance(5000);
        assert_eq!(counter.display(), "12.4M");
    }

    #[test]
    fn test_second_animate_is_noop() {
        let clock = VirtualClock::shared();
        let spec = CounterSpec::new(16.0, CounterFormat::Integer);
        let counter = CounterAnimator::new(clock.clone(), spec);
        assert!(counter.animate());
        assert!(!counter.animate());
        assert_eq!(clock.pending(), 1);

        clock.advance(3000);
        assert!(counter.is_done());
        assert!(!counter.animate());
        assert_eq!(counter.current(), 16.0);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_zero_duration_finishes_on_first_tick() {
        let clock = VirtualClock::shared();
        let counter = CounterAnimator::new(
            clock.clone(),
            CounterSpec::new(42.0, CounterFormat::Integer).with_timing(0, 16),
        );
        counter.animate();
        clock.advance(16);
        assert!(counter.is_done());
        assert_eq!(counter.display(), "42");
    }

    #[test]
    fn test_detach_stops_ticks() {
        let clock = VirtualClock::shared();
        let spec = CounterSpec::new(100.0, CounterFormat::Integer);
        let counter = CounterAnimator::new(clock.clone(), spec);
        counter.animate();
        clock.advance(160);
        let frozen = counter.current();
        counter.detach();
        clock.advance(5000);
        assert_eq!(counter.current(), frozen);
        assert!(!counter.is_done());
        assert!(!counter.animate());
    }

    #[test]
    fn test_drop_releases_interval() {
        let clock = VirtualClock::shared();
        {
            let spec = CounterSpec::new(5.0, CounterFormat::Integer);
            let counter = CounterAnimator::new(clock.clone(), spec);
            counter.animate();
            assert_eq!(clock.pending(), 1);
        }
        assert_eq!(clock.pending(), 0);
    }
}
