// SPDX-License-Identifier: MIT OR Apache-2.0
//! Decompilation demo playback.
//!
//! Two reveal sequences play one after the other: the disassembly listing
//! (fixed spacing) and then the decompiled source (per-line delays, shifted
//! past the end of the listing). A separate fixed-length busy timer guards
//! the run control; it does not track the sequences and may end before or
//! after the last source line appears.

use crate::clock::{Millis, SharedClock, TimerId};
use crate::counter::group_thousands;
use crate::sequence::{RevealItem, RevealSequencer};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// A binary the visitor can pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleBinary {
    /// File name
    pub name: String,
    /// Architecture label
    pub arch: String,
    /// Human-readable size
    pub size: String,
    /// Functions "recovered"
    pub functions: u64,
}

impl SampleBinary {
    /// Create a sample
    pub fn new(
        name: impl Into<String>,
        arch: impl Into<String>,
        size: impl Into<String>,
        functions: u64,
    ) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
            size: size.into(),
            functions,
        }
    }
}

/// One row of the disassembly view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmLine {
    /// Address, hex without prefix
    pub addr: String,
    /// Encoded bytes
    pub bytes: String,
    /// Instruction text; several instructions may be joined with `;`
    pub asm: String,
}

impl AsmLine {
    /// Create a disassembly row
    pub fn new(addr: impl Into<String>, bytes: impl Into<String>, asm: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            bytes: bytes.into(),
            asm: asm.into(),
        }
    }
}

/// One line of decompiled source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    /// Source text without indentation
    pub text: String,
    /// Indent level
    pub indent: u8,
    /// Delay from the start of the source reveal
    pub delay_ms: Millis,
}

impl SourceLine {
    /// Create a source line
    pub fn new(text: impl Into<String>, indent: u8, delay_ms: Millis) -> Self {
        Self {
            text: text.into(),
            indent,
            delay_ms,
        }
    }
}

/// The listing and source the demo plays
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoScript {
    /// Disassembly rows
    pub disassembly: Vec<AsmLine>,
    /// Decompiled source lines
    pub decompiled: Vec<SourceLine>,
}

/// Demo timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoTiming {
    /// Gap between disassembly rows
    pub item_spacing_ms: Millis,
    /// How long the run control stays disabled
    pub busy_ms: Millis,
    /// Delay before the first run after mounting
    pub autostart_delay_ms: Millis,
}

impl Default for DemoTiming {
    fn default() -> Self {
        Self {
            item_spacing_ms: 150,
            busy_ms: 4500,
            autostart_delay_ms: 1000,
        }
    }
}

impl DemoTiming {
    /// When the source reveal begins, relative to the run start
    pub fn source_offset(&self, script: &DemoScript) -> Millis {
        script.disassembly.len() as Millis * self.item_spacing_ms
    }

    /// Disassembly reveal items
    pub fn disassembly_items(&self, script: &DemoScript) -> Vec<RevealItem<AsmLine>> {
        RevealItem::staggered(script.disassembly.iter().cloned(), self.item_spacing_ms)
    }

    /// Source reveal items, shifted past the disassembly
    pub fn source_items(&self, script: &DemoScript) -> Vec<RevealItem<SourceLine>> {
        let offset = self.source_offset(script);
        script
            .decompiled
            .iter()
            .map(|line| RevealItem::new(line.clone(), line.delay_ms).offset_by(offset))
            .collect()
    }
}

struct BusyGuard {
    clock: SharedClock,
    busy: Cell<bool>,
    timer: Cell<Option<TimerId>>,
    autostart: Cell<Option<TimerId>>,
}

impl BusyGuard {
    fn clear_busy_timer(&self) {
        if let Some(id) = self.timer.take() {
            self.clock.clear(id);
        }
    }

    fn clear_autostart(&self) {
        if let Some(id) = self.autostart.take() {
            self.clock.clear(id);
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.clear_busy_timer();
        self.clear_autostart();
    }
}

struct DemoInner {
    clock: SharedClock,
    script: Rc<DemoScript>,
    samples: Rc<[SampleBinary]>,
    timing: DemoTiming,
    selected: Cell<usize>,
    runs: Cell<u64>,
    guard: Rc<BusyGuard>,
    disassembly: RevealSequencer<AsmLine>,
    source: RevealSequencer<SourceLine>,
}

impl DemoInner {
    fn run(&self, sample: usize) {
        let Some(binary) = self.samples.get(sample) else {
            tracing::warn!(sample, available = self.samples.len(), "Unknown sample, run ignored");
            return;
        };
        self.selected.set(sample);
        self.runs.set(self.runs.get() + 1);
        tracing::info!(
            sample = %binary.name,
            arch = %binary.arch,
            run = self.runs.get(),
            "Running demo"
        );

        self.disassembly.restart(self.timing.disassembly_items(&self.script));
        self.source.restart(self.timing.source_items(&self.script));

        let guard = &self.guard;
        guard.clear_busy_timer();
        guard.busy.set(true);
        let weak: Weak<BusyGuard> = Rc::downgrade(guard);
        let id = self.clock.set_timeout(
            self.timing.busy_ms,
            Box::new(move || {
                if let Some(guard) = weak.upgrade() {
                    guard.timer.set(None);
                    guard.busy.set(false);
                }
            }),
        );
        guard.timer.set(Some(id));
    }
}

/// Drives the disassembly and source reveals under one restart contract.
///
/// Each instance owns its timers; dropping it releases all of them.
pub struct DemoOrchestrator {
    inner: Rc<DemoInner>,
}

impl DemoOrchestrator {
    /// Create an idle demo. Nothing is scheduled until
    /// [`mount`](Self::mount) or [`run`](Self::run).
    pub fn new(
        clock: SharedClock,
        script: Rc<DemoScript>,
        samples: Rc<[SampleBinary]>,
        timing: DemoTiming,
    ) -> Self {
        Self {
            inner: Rc::new(DemoInner {
                disassembly: RevealSequencer::with_label(clock.clone(), "disassembly"),
                source: RevealSequencer::with_label(clock.clone(), "decompiled"),
                guard: Rc::new(BusyGuard {
                    clock: clock.clone(),
                    busy: Cell::new(false),
                    timer: Cell::new(None),
                    autostart: Cell::new(None),
                }),
                clock,
                script,
                samples,
                timing,
                selected: Cell::new(0),
                runs: Cell::new(0),
            }),
        }
    }

    /// Schedule the first run of the selected sample after the autostart delay
    pub fn mount(&self) {
        let inner = &self.inner;
        inner.guard.clear_autostart();
        let weak: Weak<DemoInner> = Rc::downgrade(inner);
        let id = inner.clock.set_timeout(
            inner.timing.autostart_delay_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.guard.autostart.set(None);
                    inner.run(inner.selected.get());
                }
            }),
        );
        inner.guard.autostart.set(Some(id));
    }

    /// Cancel any in-flight run and play `sample` from the beginning
    pub fn run(&self, sample: usize) {
        self.inner.run(sample);
    }

    /// Select a sample. Always restarts playback, even while busy.
    pub fn select_sample(&self, sample: usize) {
        self.inner.run(sample);
    }

    /// The run control: replays the selected sample unless busy.
    /// Returns whether a run started.
    pub fn trigger_run(&self) -> bool {
        if self.is_busy() {
            tracing::debug!("Run control pressed while busy");
            return false;
        }
        self.inner.run(self.inner.selected.get());
        true
    }

    /// Cancel everything: both sequences, the busy guard and the autostart
    pub fn teardown(&self) {
        let inner = &self.inner;
        inner.disassembly.cancel();
        inner.source.cancel();
        inner.guard.clear_busy_timer();
        inner.guard.clear_autostart();
        inner.guard.busy.set(false);
    }

    /// Whether the run control is disabled
    pub fn is_busy(&self) -> bool {
        self.inner.guard.busy.get()
    }

    /// Label of the run control
    pub fn run_label(&self) -> &'static str {
        if self.is_busy() {
            "Analyzing..."
        } else {
            "Run Decompilation"
        }
    }

    /// Index of the selected sample
    pub fn selected_index(&self) -> usize {
        self.inner.selected.get()
    }

    /// The selected sample
    pub fn selected_sample(&self) -> Option<&SampleBinary> {
        self.inner.samples.get(self.inner.selected.get())
    }

    /// All samples
    pub fn samples(&self) -> &[SampleBinary] {
        &self.inner.samples
    }

    /// The script being played
    pub fn script(&self) -> &DemoScript {
        &self.inner.script
    }

    /// Disassembly reveal sequence
    pub fn disassembly(&self) -> &RevealSequencer<AsmLine> {
        &self.inner.disassembly
    }

    /// Decompiled source reveal sequence
    pub fn source(&self) -> &RevealSequencer<SourceLine> {
        &self.inner.source
    }

    /// Number of runs started so far
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }

    /// Whether every source line of the current run is shown
    pub fn is_complete(&self) -> bool {
        self.inner.runs.get() > 0 && self.inner.source.is_complete()
    }

    /// Banner shown once the source reveal has finished
    pub fn completion_message(&self) -> Option<String> {
        if !self.is_complete() {
            return None;
        }
        let sample = self.selected_sample()?;
        Some(format!(
            "Decompilation complete — {} functions recovered",
            group_thousands(sample.functions as i64)
        ))
    }
}

impl Drop for DemoOrchestrator {
    fn drop(&mut self) {
        self.teardown();
    }
}
