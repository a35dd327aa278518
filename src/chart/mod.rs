//! Chart orchestration: view modes, host events and the [`Chart`] itself.

pub mod orchestrator;
pub mod scene;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::drag::MoveIntent;
use crate::error::ChartError;
use crate::hierarchy::DepartmentRecord;

pub use orchestrator::Chart;
pub use scene::{ExportFormat, SceneExporter, SceneSnapshot};

/// How the chart arranges departments.
///
/// `Tree` and `Hierarchy` are two names for the same top-down layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Tree,
    Hierarchy,
    Network,
    Radial,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Tree => "tree",
            ViewMode::Hierarchy => "hierarchy",
            ViewMode::Network => "network",
            ViewMode::Radial => "radial",
        }
    }

    /// Whether switching between `self` and `other` leaves positions as they are.
    pub fn shares_layout(self, other: ViewMode) -> bool {
        use ViewMode::*;
        matches!(
            (self, other),
            (Tree | Hierarchy, Tree | Hierarchy) | (Network, Network) | (Radial, Radial)
        )
    }

    /// Positions come from a live simulation rather than a one-shot layout.
    pub fn is_live(self) -> bool {
        self == ViewMode::Network
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree" => Ok(ViewMode::Tree),
            "hierarchy" => Ok(ViewMode::Hierarchy),
            "network" => Ok(ViewMode::Network),
            "radial" => Ok(ViewMode::Radial),
            _ => Err(ChartError::UnknownViewMode(s.to_string())),
        }
    }
}

/// Something the host should act on, queued until [`Chart::drain_events`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChartEvent {
    NodeClicked(DepartmentRecord),
    EditRequested(DepartmentRecord),
    AddChildRequested(DepartmentRecord),
    MoveRequested(MoveIntent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("tree".parse::<ViewMode>().unwrap(), ViewMode::Tree);
        assert_eq!(" Radial ".parse::<ViewMode>().unwrap(), ViewMode::Radial);
        assert_eq!("NETWORK".parse::<ViewMode>().unwrap(), ViewMode::Network);
        let err = "sunburst".parse::<ViewMode>().unwrap_err();
        assert!(matches!(err, ChartError::UnknownViewMode(ref m) if m == "sunburst"));
    }

    #[test]
    fn test_tree_aliases_share_layout() {
        assert!(ViewMode::Tree.shares_layout(ViewMode::Hierarchy));
        assert!(ViewMode::Hierarchy.shares_layout(ViewMode::Tree));
        assert!(!ViewMode::Tree.shares_layout(ViewMode::Radial));
        assert!(!ViewMode::Network.shares_layout(ViewMode::Radial));
    }

    #[test]
    fn test_event_wire_format() {
        let event = ChartEvent::MoveRequested(MoveIntent {
            node_id: "a".into(),
            new_parent_id: "b".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "moveRequested");
        assert_eq!(json["nodeId"], "a");

        let event = ChartEvent::NodeClicked(DepartmentRecord::new("d1", "Sales", "SAL"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "nodeClicked");
        assert_eq!(json["name"], "Sales");
    }
}
