// SPDX-License-Identifier: MIT OR Apache-2.0
//! Showcase settings, loaded from a RON file.

use serde::{Deserialize, Serialize};
use showcase_graph::DEFAULT_NODE_SPACING_MS;
use showcase_playback::{DemoTiming, FeedSettings, Millis};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Counter animation timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterSettings {
    /// Total animation time
    pub duration_ms: Millis,
    /// Time between updates
    pub tick_ms: Millis,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            duration_ms: showcase_playback::counter::DEFAULT_DURATION_MS,
            tick_ms: showcase_playback::counter::DEFAULT_TICK_MS,
        }
    }
}

/// Visibility settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Intersection ratio at which gated sections start
    pub threshold: f32,
    /// Height of the scroll window
    pub window_height: f32,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            threshold: showcase_playback::trigger::DEFAULT_THRESHOLD,
            window_height: 800.0,
        }
    }
}

/// Control-flow graph reveal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Gap between revealed graph elements
    pub node_spacing_ms: Millis,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            node_spacing_ms: DEFAULT_NODE_SPACING_MS,
        }
    }
}

/// Frame output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Time between printed frames
    pub frame_interval_ms: Millis,
    /// How long the showcase runs before exiting
    pub runtime_ms: Millis,
    /// Color output with ANSI escapes
    pub ansi: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 1000,
            runtime_ms: 20_000,
            ansi: false,
        }
    }
}

/// A scripted reader action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TourAction {
    /// Scroll the window's top edge to a page offset
    ScrollTo(f32),
    /// Change the window height
    Resize(f32),
    /// Pick a sample binary in the demo
    SelectSample(usize),
    /// Press the run control
    RunDemo,
}

/// A tour action and when it happens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TourStep {
    /// Time after start
    pub at_ms: Millis,
    /// What the reader does
    pub action: TourAction,
}

impl TourStep {
    /// Create a tour step
    pub fn new(at_ms: Millis, action: TourAction) -> Self {
        Self { at_ms, action }
    }
}

/// The scripted reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourSettings {
    /// Steps in any order; they are scheduled by `at_ms`
    pub steps: Vec<TourStep>,
}

impl Default for TourSettings {
    fn default() -> Self {
        use TourAction::*;
        Self {
            steps: vec![
                TourStep::new(6_000, SelectSample(2)),
                TourStep::new(6_500, RunDemo),
                TourStep::new(9_000, ScrollTo(700.0)),
                TourStep::new(13_000, ScrollTo(1_300.0)),
                TourStep::new(17_000, ScrollTo(1_900.0)),
            ],
        }
    }
}

/// Complete showcase settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseSettings {
    /// Settings format version
    pub version: u32,
    /// Demo timing
    pub demo: DemoTiming,
    /// Live feed
    pub feed: FeedSettings,
    /// Stat counters
    pub counters: CounterSettings,
    /// Visibility
    pub viewport: ViewportSettings,
    /// Graph reveal
    pub graph: GraphSettings,
    /// Frame output
    pub render: RenderSettings,
    /// Scripted reader
    pub tour: TourSettings,
}

impl Default for ShowcaseSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            demo: DemoTiming::default(),
            feed: FeedSettings::default(),
            counters: CounterSettings::default(),
            viewport: ViewportSettings::default(),
            graph: GraphSettings::default(),
            render: RenderSettings::default(),
            tour: TourSettings::default(),
        }
    }
}

impl ShowcaseSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_ron(&content)?;
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load from `path`, or use the defaults when there is none
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate settings text
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        let settings: ShowcaseSettings = ron::from_str(content)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        ron::ser::to_string_pretty(self, config).map_err(|e| SettingsError::Invalid(e.to_string()))
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |what: &str| Err(SettingsError::Invalid(what.to_string()));

        if self.counters.tick_ms == 0 {
            return invalid("counters.tick_ms must be positive");
        }
        if self.feed.capacity > showcase_playback::feed::MAX_CAPACITY {
            return invalid("feed.capacity is too large");
        }
        if self.feed.cadence_ms == 0 {
            return invalid("feed.cadence_ms must be positive");
        }
        if self.render.frame_interval_ms == 0 {
            return invalid("render.frame_interval_ms must be positive");
        }
        if !(0.0..=1.0).contains(&self.viewport.threshold) {
            return invalid("viewport.threshold must be within [0, 1]");
        }
        if self.viewport.window_height.is_nan() || self.viewport.window_height <= 0.0 {
            return invalid("viewport.window_height must be positive");
        }
        Ok(())
    }
}

/// Error when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON for the settings
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// File was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version understood
        supported: u32,
    },

    /// A value is out of range
    #[error("Invalid settings: {0}")]
    Invalid(String),
}
