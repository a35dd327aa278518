//! Org Chart - WASM Module
//!
//! Layout and interaction engine for a department org chart. The host feeds
//! it a flat list of department records, calls [`OrgChartWasm::tick`] once
//! per animation frame and draws the returned scene frame; gestures come
//! back in through hit testing and the click/drag entry points.
//!
//! # Architecture
//!
//! - `hierarchy`: flat records → rooted tree (arena)
//! - `layout`: tidy tree, radial and force layouts
//! - `animation`: frame-driven tasks with per-channel supersession
//! - `camera`: pan/zoom transform
//! - `search`: weighted multi-field ranking
//! - `drag`: drag-to-reparent validation
//! - `spatial`: R-tree hit testing
//! - `chart`: the orchestrator tying the above together

use js_sys::{Float32Array, Function};
use wasm_bindgen::prelude::*;

pub mod animation;
pub mod camera;
pub mod chart;
pub mod config;
pub mod drag;
pub mod error;
pub mod hierarchy;
pub mod layout;
pub mod search;
pub mod spatial;

pub use chart::{Chart, ChartEvent, ExportFormat, SceneExporter, SceneSnapshot, ViewMode};
pub use config::ChartConfig;
pub use error::ChartError;
pub use hierarchy::{DepartmentRecord, Hierarchy};

use layout::Position;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }
}

/// Exporter that forwards the snapshot to a JS callback
/// `(snapshot, format) => void`. A thrown exception fails the export.
struct JsExporter<'a> {
    callback: &'a Function,
}

impl SceneExporter for JsExporter<'_> {
    fn export(&mut self, snapshot: &SceneSnapshot, format: ExportFormat) -> error::Result<()> {
        let snapshot = serde_wasm_bindgen::to_value(snapshot)?;
        self.callback
            .call2(&JsValue::NULL, &snapshot, &JsValue::from_str(format.as_str()))
            .map_err(|thrown| {
                ChartError::Export(
                    thrown
                        .as_string()
                        .unwrap_or_else(|| "exporter threw an exception".to_string()),
                )
            })?;
        Ok(())
    }
}

/// Main entry point for the org chart.
///
/// Wraps a [`Chart`] and exposes it to JavaScript.
#[wasm_bindgen]
pub struct OrgChartWasm {
    chart: Chart,
}

#[wasm_bindgen]
impl OrgChartWasm {
    /// Create a chart. `config` is an optional (partial) configuration object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<OrgChartWasm, JsError> {
        let config = if config.is_undefined() || config.is_null() {
            ChartConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(ChartError::from)?
        };
        Ok(Self {
            chart: Chart::new(config),
        })
    }

    /// Create a chart from a JSON configuration document.
    #[wasm_bindgen(js_name = fromConfigJson)]
    pub fn from_config_json(json: &str) -> std::result::Result<OrgChartWasm, JsError> {
        Ok(Self {
            chart: Chart::new(ChartConfig::from_json(json)?),
        })
    }

    // =========================================================================
    // Data and View
    // =========================================================================

    /// Replace the department data with an array of records.
    #[wasm_bindgen(js_name = setData)]
    pub fn set_data(&mut self, records: JsValue) -> std::result::Result<(), JsError> {
        let records: Vec<DepartmentRecord> =
            serde_wasm_bindgen::from_value(records).map_err(ChartError::from)?;
        self.chart.set_data(records);
        Ok(())
    }

    /// Switch to `tree`, `hierarchy`, `network` or `radial`.
    ///
    /// Returns true when the layout changed.
    #[wasm_bindgen(js_name = setViewMode)]
    pub fn set_view_mode(&mut self, mode: &str) -> std::result::Result<bool, JsError> {
        let mode: ViewMode = mode.parse()?;
        Ok(self.chart.set_view_mode(mode))
    }

    #[wasm_bindgen(js_name = viewMode)]
    pub fn view_mode(&self) -> String {
        self.chart.view_mode().to_string()
    }

    /// Resize the canvas and re-layout.
    #[wasm_bindgen(js_name = setExtent)]
    pub fn set_extent(&mut self, width: f32, height: f32) {
        self.chart.set_extent(layout::Extent::new(width, height));
    }

    #[wasm_bindgen(js_name = toggleCollapse)]
    pub fn toggle_collapse(&mut self, id: &str) -> std::result::Result<bool, JsError> {
        Ok(self.chart.toggle_collapse(id)?)
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Advance to `now_ms` (e.g. the `requestAnimationFrame` timestamp).
    ///
    /// Returns true while anything is still moving.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.chart.tick(now_ms)
    }

    /// Current scene frame: node and link visuals plus the camera.
    pub fn frame(&self) -> std::result::Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.chart.frame()).map_err(ChartError::from)?)
    }

    /// Node positions as [x0, y0, x1, y1, ...], in the order of `nodeIds`.
    #[wasm_bindgen(js_name = nodePositions)]
    pub fn node_positions(&self) -> Float32Array {
        let positions: Vec<f32> = self
            .chart
            .animations()
            .scene()
            .nodes
            .values()
            .flat_map(|node| [node.x, node.y])
            .collect();
        Float32Array::from(positions.as_slice())
    }

    #[wasm_bindgen(js_name = nodeIds)]
    pub fn node_ids(&self) -> Vec<String> {
        self.chart.animations().scene().nodes.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> std::result::Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.chart.snapshot()).map_err(ChartError::from)?)
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Department id under the screen point, if any.
    #[wasm_bindgen(js_name = hitTest)]
    pub fn hit_test(&mut self, x: f32, y: f32) -> Option<String> {
        self.chart.hit_test(Position::new(x, y))
    }

    pub fn click(&mut self, id: &str) -> std::result::Result<(), JsError> {
        Ok(self.chart.click(id)?)
    }

    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&mut self, id: &str) -> std::result::Result<(), JsError> {
        Ok(self.chart.double_click(id)?)
    }

    #[wasm_bindgen(js_name = requestAddChild)]
    pub fn request_add_child(&mut self, parent_id: &str) -> std::result::Result<(), JsError> {
        Ok(self.chart.request_add_child(parent_id)?)
    }

    /// Events queued since the last call.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> std::result::Result<JsValue, JsError> {
        let events = self.chart.drain_events();
        Ok(serde_wasm_bindgen::to_value(&events).map_err(ChartError::from)?)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Ranked matches with their root-to-match paths.
    pub fn search(&mut self, query: &str) -> std::result::Result<JsValue, JsError> {
        let hits = self.chart.search(query);
        Ok(serde_wasm_bindgen::to_value(&hits).map_err(ChartError::from)?)
    }

    #[wasm_bindgen(js_name = clearSearch)]
    pub fn clear_search(&mut self) {
        self.chart.clear_search();
    }

    // =========================================================================
    // Camera
    // =========================================================================

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> f32 {
        self.chart.zoom_in().scale
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> f32 {
        self.chart.zoom_out().scale
    }

    #[wasm_bindgen(js_name = zoomBy)]
    pub fn zoom_by(&mut self, factor: f32) -> f32 {
        self.chart.zoom_by(factor).scale
    }

    #[wasm_bindgen(js_name = resetZoom)]
    pub fn reset_zoom(&mut self) {
        self.chart.reset_zoom();
    }

    #[wasm_bindgen(js_name = fitView)]
    pub fn fit_view(&mut self) {
        self.chart.fit_view();
    }

    // =========================================================================
    // Drag
    // =========================================================================

    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, id: &str) -> bool {
        self.chart.begin_drag(id)
    }

    /// Whether dropping on `target` would be accepted. Pass `undefined`
    /// when the pointer leaves every node.
    #[wasm_bindgen(js_name = dragOver)]
    pub fn drag_over(&mut self, target: Option<String>) -> bool {
        self.chart
            .drag_over(target.as_deref())
            .is_some_and(|feedback| feedback.valid)
    }

    /// Finish the drag over `target`. Returns the move intent, or `null`
    /// when the drop was rejected.
    #[wasm_bindgen(js_name = dropOn)]
    pub fn drop_on(&mut self, target: &str) -> std::result::Result<JsValue, JsError> {
        match self.chart.drop_on(target) {
            Ok(intent) => Ok(serde_wasm_bindgen::to_value(&intent).map_err(ChartError::from)?),
            Err(_) => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = cancelDrag)]
    pub fn cancel_drag(&mut self) {
        self.chart.cancel_drag();
    }

    // =========================================================================
    // Export and Teardown
    // =========================================================================

    /// Hand a snapshot of the scene to `callback(snapshot, format)`.
    pub fn export(&self, format: &str, callback: &Function) -> std::result::Result<(), JsError> {
        let format: ExportFormat = format.parse()?;
        let mut exporter = JsExporter { callback };
        Ok(self.chart.export(&mut exporter, format)?)
    }

    /// Stop all animations and release state.
    pub fn teardown(&mut self) {
        self.chart.teardown();
    }
}
