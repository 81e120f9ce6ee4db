//! Tunable constants of the interaction layer.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Double-tap recognition limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleTapConfig {
    /// Longest press that still counts as a tap.
    pub max_press_ms: u64,
    /// Longest gap between the first tap's release and the second press.
    pub max_interval_ms: u64,
    /// Movement allowed during a tap.
    pub move_threshold: f64,
    /// Distance allowed between the two taps.
    pub position_threshold: f64,
}

impl Default for DoubleTapConfig {
    fn default() -> Self {
        Self {
            max_press_ms: 250,
            max_interval_ms: 450,
            move_threshold: 5.0,
            position_threshold: 50.0,
        }
    }
}

/// Interaction tuning shared by the gesture normalizer and the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Camera zoom per wheel step.
    pub wheel_zoom_step: f64,
    /// Divisor turning pointer deltas into camera zoom/translate amounts.
    pub drag_divisor: f64,
    /// Quiet period after the last wheel event before the burst is over.
    pub wheel_end_ms: u64,
    /// Wheel units per unit of pinch scale.
    pub pinch_wheel_scale: f64,
    /// Minimum scale change before a pinch is recognized.
    pub pinch_threshold: f64,
    /// Cap on reported pointer count.
    pub max_pointers: u8,
    pub double_tap: DoubleTapConfig,
    /// Camera distance when re-centering an empty scene.
    pub empty_scene_distance: f32,
    /// Fraction of the scene diagonal used when re-centering on the scene.
    pub bounds_distance_factor: f32,
    /// Camera distance when re-centering on a picked point.
    pub pick_distance: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            wheel_zoom_step: 0.02,
            drag_divisor: 1000.0,
            wheel_end_ms: 300,
            pinch_wheel_scale: 25.0,
            pinch_threshold: 0.1,
            max_pointers: 2,
            double_tap: DoubleTapConfig::default(),
            empty_scene_distance: 70.0,
            bounds_distance_factor: 0.8,
            pick_distance: 20.0,
        }
    }
}

impl InteractionConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}
