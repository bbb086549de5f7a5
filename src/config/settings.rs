//! User settings
//!
//! Defines all configurable options for target selection and pointer motion.
//! Every section falls back to its defaults, so a config file only needs the
//! values it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::motion::ComposerConfig;
use crate::stealth::Humanizer;
use crate::vision::{ChannelThreshold, Color, SelectionMethod, SelectionParams};

/// Main settings structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pointer motion
    pub movement: MovementSettings,
    /// Target selection
    pub selection: SelectionSettings,
    /// Trajectory corpus
    pub corpus: CorpusSettings,
}

impl Settings {
    /// Parse settings from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let settings = Self::from_json_str(&text)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write settings to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Reject values the algorithms cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let movement = &self.movement;
        let (lo, hi) = movement.speed_range;
        if invalid_amount(lo) || invalid_amount(hi) || lo > hi {
            return Err(ConfigError::Invalid(format!(
                "speed_range must be ordered, finite and non-negative, got ({}, {})",
                lo, hi
            )));
        }
        if movement.click_pause_ms.0 > movement.click_pause_ms.1 {
            return Err(ConfigError::Invalid(format!(
                "click_pause_ms must be ordered, got {:?}",
                movement.click_pause_ms
            )));
        }
        if movement.k_nearest == 0 {
            return Err(ConfigError::Invalid("k_nearest must be at least 1".into()));
        }
        if movement.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be at least 1".into()));
        }
        if invalid_amount(movement.tolerance) {
            return Err(ConfigError::Invalid(format!(
                "movement tolerance must be non-negative, got {}",
                movement.tolerance
            )));
        }

        let selection = &self.selection;
        if invalid_amount(selection.tolerance) {
            return Err(ConfigError::Invalid(format!(
                "color tolerance must be non-negative, got {}",
                selection.tolerance
            )));
        }
        if selection.downsample_factor == 0 {
            return Err(ConfigError::Invalid("downsample_factor must be at least 1".into()));
        }
        if invalid_amount(selection.center_falloff) {
            return Err(ConfigError::Invalid(format!(
                "center_falloff must be non-negative, got {}",
                selection.center_falloff
            )));
        }

        Ok(())
    }

    /// Settings for small targets: tight tolerance, more relay steps
    pub fn precise() -> Self {
        Self {
            movement: MovementSettings {
                tolerance: 3.0,
                max_iterations: 10,
                k_nearest: 4,
                ..Default::default()
            },
            selection: SelectionSettings {
                downsample_factor: 2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Settings for speed: one lookup per move, quicker playback
    pub fn fast() -> Self {
        Self {
            movement: MovementSettings {
                use_iterative_movement: false,
                speed_range: (0.3, 1.0),
                click_pause_ms: (30, 80),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Timing source for these settings
    pub fn humanizer(&self) -> Humanizer {
        Humanizer::new(self.movement.speed_range, self.movement.click_pause_ms)
    }

    /// Retrieval settings for the path composer
    pub fn composer_config(&self) -> ComposerConfig {
        ComposerConfig {
            k_nearest: self.movement.k_nearest,
            random_selection: self.movement.use_random_selection,
            smoothing_window: self
                .movement
                .smoothing
                .then_some(self.movement.smoothing_window),
        }
    }

    /// Parameters for the smart target selector
    pub fn selection_params(&self) -> SelectionParams {
        SelectionParams {
            target: self.selection.target_color,
            tolerance: self.selection.tolerance,
            downsample_factor: self.selection.downsample_factor,
            min_blob_pixels: self.selection.min_blob_pixels,
            center_falloff: self.selection.center_falloff,
        }
    }
}

/// Negative, NaN or infinite
fn invalid_amount(value: f64) -> bool {
    !value.is_finite() || value < 0.0
}

/// Pointer motion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Use recorded paths (false = jump straight to the target)
    pub enabled: bool,
    /// Per-step speed multiplier range
    pub speed_range: (f64, f64),
    /// Pick among the k nearest paths instead of always the closest
    pub use_random_selection: bool,
    /// Neighbours considered for random selection
    pub k_nearest: usize,
    /// Chain several paths until within tolerance
    pub use_iterative_movement: bool,
    /// Maximum chained paths per move
    pub max_iterations: usize,
    /// Distance in pixels that counts as arrived
    pub tolerance: f64,
    /// Samples per second the corpus was recorded at
    pub sample_rate: u32,
    /// Smooth retrieved paths with a moving average
    pub smoothing: bool,
    /// Moving-average window
    pub smoothing_window: usize,
    /// Pause between arriving and clicking, in ms
    pub click_pause_ms: (u64, u64),
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            speed_range: (0.5, 2.0),
            use_random_selection: true,
            k_nearest: 8,
            use_iterative_movement: true,
            max_iterations: 5,
            tolerance: 10.0,
            sample_rate: 50,
            smoothing: false,
            smoothing_window: 3,
            click_pause_ms: (50, 150),
        }
    }
}

/// Target selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub method: SelectionMethod,
    /// Color to click, as hex
    pub target_color: Color,
    /// Euclidean color tolerance
    pub tolerance: f64,
    /// Shrink factor before segmentation (1 = none)
    pub downsample_factor: u32,
    /// Minimum blob size at full resolution
    pub min_blob_pixels: usize,
    /// Centre preference; 0 samples uniformly
    pub center_falloff: f64,
    /// Marker color that disqualifies neighbouring blobs
    pub exclusion: ChannelThreshold,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            method: SelectionMethod::Smart,
            target_color: Color::new(0x00, 0xFF, 0xFF),
            tolerance: 10.0,
            downsample_factor: 4,
            min_blob_pixels: 1000,
            center_falloff: 4.0,
            exclusion: ChannelThreshold::default(),
        }
    }
}

/// Trajectory corpus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// JSON corpus file
    pub path: PathBuf,
    /// Extra rotated copies to add, in degrees (empty = none)
    pub rotation_angles: Vec<f64>,
    /// Displacement distance below which paths count as duplicates
    pub dedup_tolerance: Option<f64>,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mouse_paths.json"),
            rotation_angles: Vec::new(),
            dedup_tolerance: Some(1e-8),
        }
    }
}
