//! Drag-to-reparent validation.
//!
//! A drop of `dragged` onto `target` asks for `target` to become the new
//! parent of `dragged`. The controller never mutates the hierarchy: an
//! accepted drop yields a [`MoveIntent`] for the persistence layer, which is
//! expected to refresh the data afterwards.
//!
//! The invariant enforced here is that a department can never become an
//! ancestor of one of its own ancestors, i.e. the target must lie outside
//! the dragged department's subtree.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hierarchy::Hierarchy;

/// Request to move `node_id` under `new_parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub node_id: String,
    pub new_parent_id: String,
}

/// Why a drop was refused. Rejections are routine outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropRejection {
    /// Dropped onto itself.
    SameNode,
    /// The target sits inside the dragged department's subtree.
    TargetIsDescendant,
    /// The synthetic root can be neither moved nor dropped onto.
    VirtualRoot,
    UnknownNode(String),
    /// No drag gesture in progress.
    NotDragging,
}

impl fmt::Display for DropRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropRejection::SameNode => write!(f, "cannot drop a department onto itself"),
            DropRejection::TargetIsDescendant => {
                write!(f, "cannot move a department under its own descendant")
            }
            DropRejection::VirtualRoot => write!(f, "the virtual root cannot be moved or targeted"),
            DropRejection::UnknownNode(id) => write!(f, "unknown department `{id}`"),
            DropRejection::NotDragging => write!(f, "no drag in progress"),
        }
    }
}

/// Check whether `dragged` may be re-parented under `target`.
pub fn validate_drop(hierarchy: &Hierarchy, dragged: &str, target: &str) -> Result<(), DropRejection> {
    if dragged == target {
        return Err(DropRejection::SameNode);
    }
    for id in [dragged, target] {
        match hierarchy.get(id) {
            None => return Err(DropRejection::UnknownNode(id.to_string())),
            Some(node) if node.is_virtual() => return Err(DropRejection::VirtualRoot),
            Some(_) => {}
        }
    }
    if hierarchy.is_descendant(dragged, target) {
        return Err(DropRejection::TargetIsDescendant);
    }
    Ok(())
}

pub fn can_drop(hierarchy: &Hierarchy, dragged: &str, target: &str) -> bool {
    validate_drop(hierarchy, dragged, target).is_ok()
}

/// Validate and, on success, produce the move intent.
pub fn on_drop(hierarchy: &Hierarchy, dragged: &str, target: &str) -> Option<MoveIntent> {
    match validate_drop(hierarchy, dragged, target) {
        Ok(()) => Some(MoveIntent {
            node_id: dragged.to_string(),
            new_parent_id: target.to_string(),
        }),
        Err(rejection) => {
            debug!(dragged, target, %rejection, "drop rejected");
            None
        }
    }
}

/// Current drop-target feedback for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropFeedback {
    pub target_id: String,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        node: String,
        hover: Option<DropFeedback>,
    },
}

/// Tracks one drag gesture from pick-up to drop or cancel.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up `id`. Unknown ids and the virtual root cannot be dragged.
    pub fn begin(&mut self, hierarchy: &Hierarchy, id: &str) -> bool {
        let draggable = hierarchy.get(id).is_some_and(|node| !node.is_virtual());
        self.state = if draggable {
            DragState::Dragging {
                node: id.to_string(),
                hover: None,
            }
        } else {
            DragState::Idle
        };
        draggable
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging { node, .. } => Some(node),
            DragState::Idle => None,
        }
    }

    /// Drop-target feedback while the pointer is over `target`; `None`
    /// clears it. Returns the feedback now in effect.
    pub fn hover(&mut self, hierarchy: &Hierarchy, target: Option<&str>) -> Option<DropFeedback> {
        let DragState::Dragging { node, hover } = &mut self.state else {
            return None;
        };
        *hover = target.map(|target| DropFeedback {
            target_id: target.to_string(),
            valid: can_drop(hierarchy, node, target),
        });
        hover.clone()
    }

    pub fn feedback(&self) -> Option<&DropFeedback> {
        match &self.state {
            DragState::Dragging { hover, .. } => hover.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Release over `target`. The gesture ends whatever the outcome.
    pub fn drop_on(&mut self, hierarchy: &Hierarchy, target: &str) -> Result<MoveIntent, DropRejection> {
        let DragState::Dragging { node, .. } = std::mem::take(&mut self.state) else {
            return Err(DropRejection::NotDragging);
        };
        match validate_drop(hierarchy, &node, target) {
            Ok(()) => Ok(MoveIntent {
                node_id: node,
                new_parent_id: target.to_string(),
            }),
            Err(rejection) => {
                debug!(dragged = %node, target, %rejection, "drop rejected");
                Err(rejection)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
