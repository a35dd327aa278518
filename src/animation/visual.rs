//! Current visual state of the scene, as last written by the animation manager.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::camera::CameraTransform;
use crate::layout::Position;

/// What the host should draw for one department this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeVisual {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub opacity: f32,
    /// Search-match stroke emphasis, 0 (off) to 1 (on).
    pub stroke: f32,
    /// Selection drop-shadow emphasis, 0 to 1.
    pub shadow: f32,
}

impl NodeVisual {
    /// Fully visible node at `position`.
    pub fn at(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            x: position.x,
            y: position.y,
            scale: 1.0,
            opacity: 1.0,
            stroke: 0.0,
            shadow: 0.0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Geometry of a parent→child connector.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub source_id: String,
    pub target_id: String,
    pub source: Position,
    pub target: Position,
}

impl LinkSpec {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        source: Position,
        target: Position,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            source,
            target,
        }
    }

    /// Scene id of the link: `"{source}->{target}"`.
    pub fn id(&self) -> String {
        link_id(&self.source_id, &self.target_id)
    }
}

pub fn link_id(source_id: &str, target_id: &str) -> String {
    format!("{source_id}->{target_id}")
}

/// What the host should draw for one connector this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkVisual {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub source: Position,
    pub target: Position,
    /// Drawn fraction of the path from source to target.
    pub reveal: f32,
    pub opacity: f32,
}

impl LinkVisual {
    pub fn from_spec(spec: &LinkSpec, reveal: f32) -> Self {
        Self {
            id: spec.id(),
            source_id: spec.source_id.clone(),
            target_id: spec.target_id.clone(),
            source: spec.source,
            target: spec.target,
            reveal,
            opacity: 1.0,
        }
    }
}

/// Visual state of every scene element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneState {
    pub nodes: BTreeMap<String, NodeVisual>,
    pub links: BTreeMap<String, LinkVisual>,
    pub camera: CameraTransform,
}

/// Serializable copy of [`SceneState`] handed to the host once per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFrame {
    pub nodes: Vec<NodeVisual>,
    pub links: Vec<LinkVisual>,
    pub camera: CameraTransform,
    pub animating: bool,
}

impl SceneState {
    pub fn frame(&self, animating: bool) -> SceneFrame {
        SceneFrame {
            nodes: self.nodes.values().cloned().collect(),
            links: self.links.values().cloned().collect(),
            camera: self.camera,
            animating,
        }
    }
}
