//! Chart configuration.
//!
//! Every section and field has a default, so a host only needs to send the
//! values it wants to change:
//!
//! ```json
//! { "extent": { "width": 1280 }, "animation": { "preset": "fast" } }
//! ```

use serde::{Deserialize, Serialize};

use crate::animation::AnimationSettings;
use crate::camera::CameraConfig;
use crate::error::Result;
use crate::layout::{Extent, ForceConfig, TidyTreeConfig};

/// Id of the placeholder node shown when there is no data.
pub const EMPTY_STATE_ID: &str = "empty-state";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// World-space radius within which a point hits a node.
    pub hit_radius: f32,
    /// Label carried by the empty-state placeholder node.
    pub empty_label: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            hit_radius: 30.0,
            empty_label: "No departments yet".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub extent: Extent,
    pub tree: TidyTreeConfig,
    pub radial: TidyTreeConfig,
    pub force: ForceConfig,
    pub camera: CameraConfig,
    pub animation: AnimationSettings,
    pub style: StyleConfig,
}

impl ChartConfig {
    /// Parse a (possibly partial) JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
