//! Error types surfaced by the chart engine.
//!
//! Routine states of an interactively edited tree (dangling parents, empty
//! data, rejected drops, superseded animations) are plain values elsewhere in
//! the crate. Only caller mistakes and failures of external collaborators
//! end up here.

use thiserror::Error;

/// Errors returned by the chart engine.
#[derive(Debug, Error)]
pub enum ChartError {
    /// The configuration document could not be parsed.
    #[error("Failed to parse chart configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A view mode name that is not one of `tree`, `hierarchy`, `network`, `radial`.
    #[error("Unknown view mode `{0}`")]
    UnknownViewMode(String),

    /// An operation referenced a node id that is not in the current hierarchy.
    #[error("Unknown node `{0}`")]
    UnknownNode(String),

    /// The export collaborator rejected the scene.
    #[error("Export failed: {0}")]
    Export(String),

    /// A value crossing the JS boundary could not be converted.
    #[error("Invalid value from host: {0}")]
    Binding(String),
}

impl From<serde_wasm_bindgen::Error> for ChartError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        ChartError::Binding(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChartError>;
