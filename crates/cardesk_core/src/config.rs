//! Tunable constants for the desk engine.
//!
//! Values are in desk units (logical points) and milliseconds.

use crate::geometry::placement::{DeskBounds, PlacementRect};

pub const DEFAULT_HOVER_THRESHOLD: f64 = 120.0;
pub const DEFAULT_FLICK_THRESHOLD: f64 = 260.0;
pub const DEFAULT_EXIT_DURATION_MS: u64 = 200;
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 250;

/// Engine configuration shared by the session and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskConfig {
    /// Minimum axis displacement that lights up a target while dragging.
    pub hover_threshold: f64,
    /// Minimum predicted-vs-actual divergence that counts as a flick.
    pub flick_threshold: f64,
    /// Delay between exit animation start and the structural move.
    pub exit_duration_ms: u64,
    /// Quiet window after the last tree change before a snapshot is written.
    pub save_debounce_ms: u64,
    pub desk: DeskBounds,
    /// Where relocated and newly created cards land.
    pub placement: PlacementRect,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            hover_threshold: DEFAULT_HOVER_THRESHOLD,
            flick_threshold: DEFAULT_FLICK_THRESHOLD,
            exit_duration_ms: DEFAULT_EXIT_DURATION_MS,
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            desk: DeskBounds::default(),
            placement: PlacementRect::default(),
            min_zoom: 0.25,
            max_zoom: 4.0,
        }
    }
}

impl DeskConfig {
    /// Clamps a requested zoom scale into the supported range.
    ///
    /// Non-finite or non-positive input resets to 1.0. Inverted bounds are
    /// read in order.
    pub fn clamp_zoom(&self, scale: f64) -> f64 {
        if !scale.is_finite() || scale <= 0.0 {
            return 1.0;
        }
        let low = self.min_zoom.min(self.max_zoom);
        let high = self.min_zoom.max(self.max_zoom);
        if low.is_nan() || high.is_nan() {
            return scale;
        }
        scale.clamp(low, high)
    }
}
