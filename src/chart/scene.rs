//! Scene snapshots and the export seam.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ViewMode;
use crate::animation::SceneFrame;
use crate::error::{ChartError, Result};
use crate::layout::Extent;

/// Serializable picture of the chart at one instant, handed to exporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    pub view_mode: ViewMode,
    pub extent: Extent,
    pub frame: SceneFrame,
    pub selected: Option<String>,
    pub search_matches: Vec<String>,
    pub collapsed: Vec<String>,
    /// Label of the empty-state placeholder, when it is shown.
    pub empty_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Svg,
    Pdf,
    Print,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Print => "print",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            "print" => Ok(ExportFormat::Print),
            _ => Err(ChartError::Export(format!("unsupported format `{s}`"))),
        }
    }
}

/// Rasterizes, serializes or prints a scene. Implemented by the host.
///
/// Implementations report failures as [`ChartError::Export`] with a message
/// fit for showing to the user.
pub trait SceneExporter {
    fn export(&mut self, snapshot: &SceneSnapshot, format: ExportFormat) -> Result<()>;
}
