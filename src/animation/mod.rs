//! Animation system.
//!
//! - [`easing`]: easing curves, presets and per-request timing
//! - [`task`]: keyframe tracks and cancellable tasks
//! - [`visual`]: the scene's visual state and per-frame snapshot
//! - [`manager`]: the task scheduler driven by host frame ticks

pub mod easing;
pub mod manager;
pub mod task;
pub mod visual;

use serde::{Deserialize, Serialize};

pub use easing::{AnimationConfig, AnimationPreset, Easing};
pub use manager::{AnimationManager, AnimationState};
pub use task::{Channel, Target, TaskId};
pub use visual::{LinkSpec, LinkVisual, NodeVisual, SceneFrame, SceneState, link_id};

/// Tunables for the stock animations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Timing used when a caller does not pass one.
    pub preset: AnimationPreset,
    /// Blinks per search-match emphasis.
    pub blink_count: u32,
    /// Peak scale of the selection pulse.
    pub highlight_scale: f32,
    /// Opacity everything dips to halfway through a view-mode change.
    pub view_change_opacity: f32,
}

impl AnimationSettings {
    pub fn default_config(&self) -> AnimationConfig {
        AnimationConfig::preset(self.preset)
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            preset: AnimationPreset::Normal,
            blink_count: 3,
            highlight_scale: 1.2,
            view_change_opacity: 0.3,
        }
    }
}
