//! The chart: owns the data, the current layout and every controller.
//!
//! Layouts produce target positions; the chart diffs them against what is on
//! screen and asks the animation manager to move nodes in, out and across.
//! In network mode the force simulation is stepped once per frame and its
//! positions are placed directly.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::scene::{ExportFormat, SceneExporter, SceneSnapshot};
use super::{ChartEvent, ViewMode};
use crate::animation::{
    AnimationConfig, AnimationManager, AnimationPreset, LinkSpec, SceneFrame, Target,
};
use crate::camera::{CameraController, CameraTransform};
use crate::config::{ChartConfig, EMPTY_STATE_ID};
use crate::drag::{DragController, DropFeedback, DropRejection, MoveIntent};
use crate::error::{ChartError, Result};
use crate::hierarchy::{DepartmentRecord, Hierarchy};
use crate::layout::{
    Bounds, Extent, ForceLayout, ForceSimulation, LayoutStrategy, Position, PositionMap,
    RadialLayout, TreeLayout,
};
use crate::search::{SearchHit, search_with_paths};
use crate::spatial::SpatialIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Data,
    ViewMode,
}

/// One org chart bound to one rendering surface.
#[derive(Debug)]
pub struct Chart {
    config: ChartConfig,
    view_mode: ViewMode,
    records: Vec<DepartmentRecord>,
    hierarchy: Hierarchy,
    visible: Hierarchy,
    targets: PositionMap,
    simulation: Option<ForceSimulation>,
    camera: CameraController,
    animations: AnimationManager,
    drag: DragController,
    index: SpatialIndex,
    index_dirty: bool,
    selected: Option<String>,
    collapsed: HashSet<String>,
    search_matches: Vec<String>,
    events: Vec<ChartEvent>,
}

impl Chart {
    pub fn new(config: ChartConfig) -> Self {
        let camera = CameraController::new(config.camera.clone(), config.extent);
        let animations = AnimationManager::new(config.animation.clone());
        let mut chart = Self {
            config,
            view_mode: ViewMode::default(),
            records: Vec::new(),
            hierarchy: Hierarchy::build(&[]),
            visible: Hierarchy::build(&[]),
            targets: PositionMap::new(),
            simulation: None,
            camera,
            animations,
            drag: DragController::new(),
            index: SpatialIndex::new(),
            index_dirty: true,
            selected: None,
            collapsed: HashSet::new(),
            search_matches: Vec::new(),
            events: Vec::new(),
        };
        chart.relayout(Transition::Data);
        chart
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// The full hierarchy, collapsed subtrees included.
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Target position of every node currently laid out.
    pub fn targets(&self) -> &PositionMap {
        &self.targets
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    pub fn camera(&self) -> CameraTransform {
        self.camera.transform()
    }

    pub fn animations(&self) -> &AnimationManager {
        &self.animations
    }

    /// Whether the placeholder is shown instead of departments.
    pub fn is_empty_state(&self) -> bool {
        self.visible.is_empty()
    }

    /// Whether anything will still move on the next frame.
    pub fn is_animating(&self) -> bool {
        self.animations.active_count() > 0 || self.simulation_running()
    }

    fn simulation_running(&self) -> bool {
        let layout = ForceLayout::new(self.config.force.clone());
        self.simulation
            .as_ref()
            .is_some_and(|simulation| !layout.is_converged(simulation))
    }

    fn default_animation(&self) -> AnimationConfig {
        self.config.animation.default_config()
    }

    fn record(&self, id: &str) -> Result<&DepartmentRecord> {
        self.hierarchy
            .get(id)
            .filter(|node| !node.is_virtual())
            .map(|node| node.record())
            .ok_or_else(|| ChartError::UnknownNode(id.to_string()))
    }

    // =========================================================================
    // Data and layout
    // =========================================================================

    /// Replace the department data and animate to the new layout.
    pub fn set_data(&mut self, records: Vec<DepartmentRecord>) {
        self.hierarchy = Hierarchy::build(&records);
        self.records = self.hierarchy.records().cloned().collect();
        info!(departments = self.records.len(), "chart data refreshed");

        let hierarchy = &self.hierarchy;
        self.collapsed.retain(|id| hierarchy.contains(id));
        if self
            .selected
            .as_deref()
            .is_some_and(|id| !hierarchy.contains(id))
        {
            self.selected = None;
        }
        self.search_matches.retain(|id| hierarchy.contains(id));
        self.drag.cancel();

        self.relayout(Transition::Data);
    }

    /// Switch view mode. Returns true when the layout changed; switching
    /// between `tree` and `hierarchy` only renames the mode.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        let previous = self.view_mode;
        self.view_mode = mode;
        if previous.shares_layout(mode) {
            return false;
        }
        debug!(from = %previous, to = %mode, "view mode changed");
        self.relayout(Transition::ViewMode);
        true
    }

    pub fn set_extent(&mut self, extent: Extent) {
        self.config.extent = extent;
        self.camera.set_extent(extent);
        self.relayout(Transition::Data);
    }

    /// Collapse or expand the subtree below `id`. Returns the new collapsed
    /// state; leaves never collapse.
    pub fn toggle_collapse(&mut self, id: &str) -> Result<bool> {
        let node = self
            .hierarchy
            .get(id)
            .filter(|node| !node.is_virtual())
            .ok_or_else(|| ChartError::UnknownNode(id.to_string()))?;
        if node.is_leaf() {
            return Ok(false);
        }

        let collapsed = if self.collapsed.remove(id) {
            false
        } else {
            self.collapsed.insert(id.to_string());
            true
        };
        self.relayout(Transition::Data);
        Ok(collapsed)
    }

    fn compute_targets(&mut self) -> PositionMap {
        let extent = self.config.extent;
        if self.visible.is_empty() {
            self.simulation = None;
            return PositionMap::from([(EMPTY_STATE_ID.to_string(), extent.center())]);
        }

        match self.view_mode {
            ViewMode::Tree | ViewMode::Hierarchy => {
                self.simulation = None;
                TreeLayout::new(self.config.tree.clone()).layout(&self.visible, extent)
            }
            ViewMode::Radial => {
                self.simulation = None;
                RadialLayout::new(self.config.radial.clone()).layout(&self.visible, extent)
            }
            ViewMode::Network => {
                let layout = ForceLayout::new(self.config.force.clone());
                let mut simulation = layout.simulation(&self.visible, extent);
                let current: PositionMap = self
                    .animations
                    .scene()
                    .nodes
                    .values()
                    .map(|node| (node.id.clone(), node.position()))
                    .collect();
                simulation.seed_positions(&current);
                let positions = simulation.positions();
                self.simulation = Some(simulation);
                positions
            }
        }
    }

    fn link_specs(&self) -> Vec<LinkSpec> {
        self.visible
            .links()
            .into_iter()
            .filter_map(|(source, target)| {
                let from = *self.targets.get(&source)?;
                let to = *self.targets.get(&target)?;
                Some(LinkSpec::new(source, target, from, to))
            })
            .collect()
    }

    /// Lay out the visible hierarchy and animate the scene toward it.
    fn relayout(&mut self, transition: Transition) {
        self.visible = self.hierarchy.without_collapsed(&self.collapsed);
        self.targets = self.compute_targets();
        let links = self.link_specs();
        let config = self.default_animation();

        let mut ordered: Vec<(String, Position)> = self
            .targets
            .iter()
            .map(|(id, position)| (id.clone(), *position))
            .collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        // A node or link still fading out re-enters rather than moving, so
        // the exit task loses its tracks and never removes it.
        let animations = &self.animations;
        let scene = animations.scene();
        let (moving, entering): (Vec<_>, Vec<_>) = ordered.into_iter().partition(|(id, _)| {
            scene.nodes.contains_key(id) && !animations.is_exiting(&Target::Node(id.clone()))
        });
        let exiting: Vec<String> = scene
            .nodes
            .keys()
            .filter(|id| !self.targets.contains_key(*id))
            .cloned()
            .collect();

        let wanted: HashSet<String> = links.iter().map(LinkSpec::id).collect();
        let (moving_links, entering_links): (Vec<_>, Vec<_>) = links
            .into_iter()
            .partition(|spec| {
                let id = spec.id();
                scene.links.contains_key(&id) && !animations.is_exiting(&Target::Link(id))
            });
        let exiting_links: Vec<String> = scene
            .links
            .keys()
            .filter(|id| !wanted.contains(*id))
            .cloned()
            .collect();

        debug!(
            mode = %self.view_mode,
            enter = entering.len(),
            update = moving.len(),
            exit = exiting.len(),
            "layout applied"
        );

        if !moving.is_empty() || !moving_links.is_empty() {
            match transition {
                Transition::ViewMode => {
                    self.animations
                        .animate_view_mode_change(&moving, &moving_links, config);
                }
                Transition::Data if self.view_mode.is_live() => {}
                Transition::Data => {
                    self.animations.animate_update(&moving, config);
                    self.animations.animate_link_update(&moving_links, config);
                }
            }
        }
        if !entering.is_empty() {
            self.animations.animate_enter(&entering, config);
        }
        if !exiting.is_empty() {
            self.animations.animate_exit(&exiting, config);
        }
        if !entering_links.is_empty() {
            self.animations.animate_link_enter(&entering_links, config);
        }
        if !exiting_links.is_empty() {
            self.animations.animate_link_exit(&exiting_links, config);
        }
        self.index_dirty = true;
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Advance the live simulation and every animation to `now_ms`.
    /// Returns whether anything is still in motion.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if let Some(simulation) = self.simulation.take() {
            let layout = ForceLayout::new(self.config.force.clone());
            let simulation = if layout.is_converged(&simulation) {
                simulation
            } else {
                let simulation = layout.tick(simulation);
                self.targets = simulation.positions();
                let mut placed: Vec<(String, Position)> = self
                    .targets
                    .iter()
                    .map(|(id, position)| (id.clone(), *position))
                    .collect();
                placed.sort_by(|a, b| a.0.cmp(&b.0));
                self.animations.place_nodes(&placed);
                self.index_dirty = true;
                simulation
            };
            self.simulation = Some(simulation);
        }

        let had_tasks = self.animations.active_count() > 0;
        self.animations.tick(now_ms);
        if had_tasks {
            self.index_dirty = true;
        }

        let displayed = self.animations.camera();
        if displayed != self.camera.transform() {
            self.camera.pan_to(displayed);
        }

        self.is_animating()
    }

    /// What the host should draw right now.
    pub fn frame(&self) -> SceneFrame {
        self.animations.frame()
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        let mut collapsed: Vec<String> = self.collapsed.iter().cloned().collect();
        collapsed.sort();
        SceneSnapshot {
            view_mode: self.view_mode,
            extent: self.config.extent,
            frame: self.frame(),
            selected: self.selected.clone(),
            search_matches: self.search_matches.clone(),
            collapsed,
            empty_label: self
                .is_empty_state()
                .then(|| self.config.style.empty_label.clone()),
        }
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Department under the screen point, if any.
    pub fn hit_test(&mut self, screen: Position) -> Option<String> {
        if self.index_dirty {
            let points = self
                .animations
                .scene()
                .nodes
                .values()
                .filter(|node| node.id != EMPTY_STATE_ID && node.opacity > 0.0)
                .map(|node| (node.id.as_str(), node.position()));
            self.index.rebuild(points);
            self.index_dirty = false;
        }
        let world = self.camera.transform().invert(screen);
        self.index
            .nearest_within(world, self.config.style.hit_radius)
            .map(str::to_string)
    }

    /// Select `id`, moving the highlight to it.
    pub fn click(&mut self, id: &str) -> Result<()> {
        let record = self.record(id)?.clone();
        let config = self.default_animation();
        if let Some(previous) = self.selected.take().filter(|previous| previous != id) {
            self.animations.clear_highlight(&[previous], config);
        }
        self.animations.animate_highlight(&[id.to_string()], config);
        self.selected = Some(id.to_string());
        self.events.push(ChartEvent::NodeClicked(record));
        Ok(())
    }

    pub fn double_click(&mut self, id: &str) -> Result<()> {
        let record = self.record(id)?.clone();
        self.events.push(ChartEvent::EditRequested(record));
        Ok(())
    }

    pub fn request_add_child(&mut self, parent_id: &str) -> Result<()> {
        let record = self.record(parent_id)?.clone();
        self.events.push(ChartEvent::AddChildRequested(record));
        Ok(())
    }

    /// Events queued since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<ChartEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Rank departments against `query`, emphasize the matches and bring
    /// the best one into view. Collapsed ancestors of the best match are
    /// expanded first.
    pub fn search(&mut self, query: &str) -> Vec<SearchHit> {
        self.clear_search();
        let hits = search_with_paths(&self.hierarchy, &self.records, query);
        let Some(top) = hits.first() else {
            return hits;
        };

        let top_id = top.matched.record_id.clone();
        let ancestors = &top.path[..top.path.len().saturating_sub(1)];
        let mut expanded = false;
        for ancestor in ancestors {
            expanded |= self.collapsed.remove(ancestor);
        }
        if expanded {
            self.relayout(Transition::Data);
        }

        self.search_matches = hits
            .iter()
            .map(|hit| hit.matched.record_id.clone())
            .filter(|id| self.targets.contains_key(id))
            .collect();
        let config = self.default_animation();
        self.animations
            .animate_search_result(&self.search_matches, config);

        if let Some(position) = self.targets.get(&top_id).copied() {
            let target = self
                .camera
                .follow_to(position, self.config.camera.follow_scale);
            self.animations.animate_zoom(target, config);
        }
        debug!(query, hits = hits.len(), top = %top_id, "search");
        hits
    }

    /// Remove search emphasis.
    pub fn clear_search(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        let matches = std::mem::take(&mut self.search_matches);
        let config = AnimationConfig::preset(AnimationPreset::Fast);
        self.animations.clear_search_result(&matches, config);
    }

    pub fn search_matches(&self) -> &[String] {
        &self.search_matches
    }

    // =========================================================================
    // Camera
    // =========================================================================

    fn animate_camera(&mut self, target: CameraTransform) -> CameraTransform {
        let target = self.camera.clone().pan_to(target);
        self.animations
            .animate_zoom(target, AnimationConfig::preset(AnimationPreset::Fast));
        target
    }

    /// Zoom about the canvas center, animated. Returns the target transform.
    pub fn zoom_by(&mut self, factor: f32) -> CameraTransform {
        let target = self.camera.clone().zoom_by(factor);
        self.animate_camera(target)
    }

    pub fn zoom_in(&mut self) -> CameraTransform {
        self.zoom_by(self.config.camera.zoom_step)
    }

    pub fn zoom_out(&mut self) -> CameraTransform {
        self.zoom_by(1.0 / self.config.camera.zoom_step)
    }

    pub fn reset_zoom(&mut self) -> CameraTransform {
        self.animate_camera(CameraTransform::IDENTITY)
    }

    /// Fit every laid-out node into the canvas.
    pub fn fit_view(&mut self) -> CameraTransform {
        match Bounds::of(self.targets.values()) {
            Some(bounds) => {
                let target = self
                    .camera
                    .fit_to_bounds(bounds, self.config.camera.fit_padding);
                self.animate_camera(target)
            }
            None => self.reset_zoom(),
        }
    }

    // =========================================================================
    // Drag
    // =========================================================================

    pub fn begin_drag(&mut self, id: &str) -> bool {
        self.drag.begin(&self.hierarchy, id)
    }

    pub fn drag_over(&mut self, target: Option<&str>) -> Option<DropFeedback> {
        self.drag.hover(&self.hierarchy, target)
    }

    /// Release the drag over `target`. An accepted drop queues a
    /// [`ChartEvent::MoveRequested`]; the hierarchy itself is unchanged
    /// until the host refreshes the data.
    pub fn drop_on(&mut self, target: &str) -> std::result::Result<MoveIntent, DropRejection> {
        let intent = self.drag.drop_on(&self.hierarchy, target)?;
        self.events.push(ChartEvent::MoveRequested(intent.clone()));
        Ok(intent)
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    // =========================================================================
    // Export and teardown
    // =========================================================================

    pub fn export<E: SceneExporter + ?Sized>(&self, exporter: &mut E, format: ExportFormat) -> Result<()> {
        let snapshot = self.snapshot();
        exporter.export(&snapshot, format).inspect_err(|err| {
            warn!(%format, %err, "export failed");
        })
    }

    /// Stop everything and drop all state. Pending completion callbacks are
    /// discarded and queued events are dropped.
    pub fn teardown(&mut self) {
        self.animations.clear();
        self.simulation = None;
        self.drag.cancel();
        self.index.clear();
        self.index_dirty = false;
        self.events.clear();
        self.records.clear();
        self.hierarchy = Hierarchy::build(&[]);
        self.visible = Hierarchy::build(&[]);
        self.targets.clear();
        self.selected = None;
        self.collapsed.clear();
        self.search_matches.clear();
        self.camera.reset();
        debug!("chart torn down");
    }
}

impl Default for Chart {
    fn default() -> Self {
        Self::new(ChartConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationState;

    // A ── B ── G
    //  └── C
    fn records() -> Vec<DepartmentRecord> {
        vec![
            DepartmentRecord::new("A", "Company", "CO"),
            DepartmentRecord::new("B", "Engineering", "ENG").with_parent("A"),
            DepartmentRecord::new("G", "Platform Team", "PLT")
                .with_parent("B")
                .with_manager("Grace Hopper"),
            DepartmentRecord::new("C", "Sales", "SAL").with_parent("A"),
        ]
    }

    struct Clock(f64);

    impl Clock {
        /// Tick until nothing moves any more.
        fn settle(&mut self, chart: &mut Chart) {
            for _ in 0..2000 {
                let moving = chart.tick(self.0);
                self.0 += 16.0;
                if !moving {
                    return;
                }
            }
            panic!("chart did not settle");
        }
    }

    fn loaded() -> (Chart, Clock) {
        let mut chart = Chart::default();
        let mut clock = Clock(0.0);
        chart.set_data(records());
        clock.settle(&mut chart);
        (chart, clock)
    }

    fn frame_ids(chart: &Chart) -> Vec<String> {
        chart.frame().nodes.into_iter().map(|node| node.id).collect()
    }

    #[test]
    fn test_empty_chart_shows_placeholder() {
        let mut chart = Chart::default();
        Clock(0.0).settle(&mut chart);
        assert!(chart.is_empty_state());
        assert_eq!(frame_ids(&chart), vec![EMPTY_STATE_ID]);
        assert_eq!(chart.targets()[EMPTY_STATE_ID], chart.config().extent.center());
        assert_eq!(
            chart.snapshot().empty_label.as_deref(),
            Some("No departments yet")
        );
        assert_eq!(chart.hit_test(chart.config().extent.center()), None);
    }

    #[test]
    fn test_set_data_replaces_placeholder() {
        let (chart, _) = loaded();
        assert!(!chart.is_empty_state());
        assert_eq!(frame_ids(&chart), vec!["A", "B", "C", "G"]);

        let frame = chart.frame();
        for node in &frame.nodes {
            assert_eq!(node.position(), chart.targets()[&node.id]);
            assert_eq!((node.scale, node.opacity), (1.0, 1.0));
        }
        assert_eq!(frame.links.len(), 3);
        assert!(!frame.animating);
        assert_eq!(chart.animations().state(), AnimationState::Idle);
    }

    #[test]
    fn test_refresh_moves_and_removes_nodes() {
        let (mut chart, mut clock) = loaded();
        let mut next = records();
        next.retain(|record| record.id != "G");
        chart.set_data(next);
        assert!(chart.is_animating());
        clock.settle(&mut chart);

        assert_eq!(frame_ids(&chart), vec!["A", "B", "C"]);
        assert!(chart.frame().links.iter().all(|link| link.target_id != "G"));
    }

    #[test]
    fn test_node_restored_during_exit_survives() {
        let (mut chart, mut clock) = loaded();
        let mut without_g = records();
        without_g.retain(|record| record.id != "G");
        chart.set_data(without_g);
        chart.tick(clock.0);
        clock.0 += 100.0;
        chart.tick(clock.0);
        assert!(chart.animations().node("G").is_some(), "exit still in flight");

        chart.set_data(records());
        clock.settle(&mut chart);

        assert_eq!(frame_ids(&chart), vec!["A", "B", "C", "G"]);
        let g = chart.animations().node("G").unwrap();
        assert_eq!((g.scale, g.opacity), (1.0, 1.0));
        assert_eq!(g.position(), chart.targets()["G"]);
        let link = chart.animations().link("B->G").unwrap();
        assert_eq!(link.reveal, 1.0);
    }

    #[test]
    fn test_tree_and_hierarchy_are_aliases() {
        let (mut chart, _) = loaded();
        let before = chart.targets().clone();
        assert!(!chart.set_view_mode(ViewMode::Hierarchy));
        assert_eq!(chart.view_mode(), ViewMode::Hierarchy);
        assert_eq!(chart.targets(), &before);
        assert_eq!(chart.animations().active_count(), 0);
    }

    #[test]
    fn test_radial_mode_centers_root() {
        let (mut chart, mut clock) = loaded();
        assert!(chart.set_view_mode(ViewMode::Radial));
        clock.settle(&mut chart);
        let center = chart.config().extent.center();
        let root = chart.animations().node("A").unwrap();
        assert!(root.position().distance_to(center) < 1e-3);
        assert!((root.opacity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_network_mode_runs_live_simulation() {
        let (mut chart, mut clock) = loaded();
        let tree = chart.targets().clone();
        assert!(chart.set_view_mode(ViewMode::Network));
        clock.settle(&mut chart);

        assert!(!chart.is_animating());
        let frame = chart.frame();
        assert_eq!(frame.nodes.len(), 4);
        for node in &frame.nodes {
            assert!(node.x.is_finite() && node.y.is_finite());
            assert_eq!(node.position(), chart.targets()[&node.id]);
        }
        assert_ne!(chart.targets(), &tree);
        for link in &frame.links {
            assert_eq!(link.source, chart.targets()[&link.source_id]);
        }
    }

    #[test]
    fn test_click_selects_and_emits() {
        let (mut chart, _) = loaded();
        chart.click("B").unwrap();
        chart.click("C").unwrap();
        assert_eq!(chart.selected(), Some("C"));
        chart.double_click("C").unwrap();
        chart.request_add_child("A").unwrap();

        let events = chart.drain_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], ChartEvent::NodeClicked(r) if r.id == "B"));
        assert!(matches!(&events[2], ChartEvent::EditRequested(r) if r.id == "C"));
        assert!(matches!(&events[3], ChartEvent::AddChildRequested(r) if r.id == "A"));
        assert!(chart.drain_events().is_empty());

        assert!(matches!(chart.click("nope"), Err(ChartError::UnknownNode(_))));
    }

    #[test]
    fn test_highlight_follows_selection() {
        let (mut chart, mut clock) = loaded();
        chart.click("B").unwrap();
        clock.settle(&mut chart);
        assert_eq!(chart.animations().node("B").unwrap().shadow, 1.0);

        chart.click("C").unwrap();
        clock.settle(&mut chart);
        assert_eq!(chart.animations().node("B").unwrap().shadow, 0.0);
        assert_eq!(chart.animations().node("C").unwrap().shadow, 1.0);
    }

    #[test]
    fn test_drag_rejects_cycles_and_emits_moves() {
        let (mut chart, _) = loaded();
        assert!(chart.begin_drag("A"));
        assert!(!chart.drag_over(Some("G")).unwrap().valid);
        assert_eq!(chart.drop_on("G"), Err(DropRejection::TargetIsDescendant));
        assert!(chart.drain_events().is_empty());

        assert!(chart.begin_drag("B"));
        let intent = chart.drop_on("C").unwrap();
        assert_eq!(intent.new_parent_id, "C");
        assert_eq!(
            chart.drain_events(),
            vec![ChartEvent::MoveRequested(intent)]
        );
        // Unchanged until the host refreshes the data.
        assert_eq!(chart.hierarchy().parent_of("B").unwrap().id(), "A");

        chart.begin_drag("G");
        chart.cancel_drag();
        assert!(!chart.is_dragging());
    }

    #[test]
    fn test_collapse_hides_descendants() {
        let (mut chart, mut clock) = loaded();
        assert!(chart.toggle_collapse("B").unwrap());
        clock.settle(&mut chart);
        assert_eq!(frame_ids(&chart), vec!["A", "B", "C"]);
        assert_eq!(chart.snapshot().collapsed, vec!["B"]);

        assert!(!chart.toggle_collapse("B").unwrap());
        clock.settle(&mut chart);
        assert_eq!(frame_ids(&chart), vec!["A", "B", "C", "G"]);

        assert!(!chart.toggle_collapse("G").unwrap(), "leaves do not collapse");
        assert!(chart.toggle_collapse("zzz").is_err());
    }

    #[test]
    fn test_search_expands_and_follows_top_match() {
        let (mut chart, mut clock) = loaded();
        chart.toggle_collapse("A").unwrap();
        clock.settle(&mut chart);
        assert_eq!(frame_ids(&chart), vec!["A"]);

        let hits = chart.search("platform");
        assert_eq!(hits[0].matched.record_id, "G");
        assert_eq!(hits[0].path, vec!["A", "B", "G"]);
        assert!(!chart.is_collapsed("A"));
        assert_eq!(chart.search_matches(), ["G"]);

        clock.settle(&mut chart);
        let node = chart.animations().node("G").unwrap();
        assert_eq!(node.stroke, 1.0);

        let camera = chart.camera();
        assert!((camera.scale - 1.5).abs() < 1e-5);
        let on_screen = camera.apply(chart.targets()["G"]);
        assert!(on_screen.distance_to(chart.config().extent.center()) < 1e-2);

        chart.clear_search();
        clock.settle(&mut chart);
        assert_eq!(chart.animations().node("G").unwrap().stroke, 0.0);
        assert!(chart.search_matches().is_empty());
    }

    #[test]
    fn test_search_without_matches() {
        let (mut chart, _) = loaded();
        assert!(chart.search("   ").is_empty());
        assert!(chart.search("marketing").is_empty());
        assert_eq!(chart.animations().active_count(), 0);
    }

    #[test]
    fn test_hit_test_through_camera() {
        let (mut chart, mut clock) = loaded();
        let b = chart.targets()["B"];
        assert_eq!(chart.hit_test(b).as_deref(), Some("B"));
        assert_eq!(chart.hit_test(Position::new(-500.0, -500.0)), None);

        chart.zoom_by(2.0);
        clock.settle(&mut chart);
        let screen = chart.camera().apply(b);
        assert_eq!(chart.hit_test(screen).as_deref(), Some("B"));
    }

    #[test]
    fn test_zoom_reset_and_fit() {
        let (mut chart, mut clock) = loaded();
        let target = chart.zoom_by(2.0);
        assert_eq!(target.scale, 2.0);
        assert_eq!(chart.camera(), CameraTransform::IDENTITY, "applied over frames");
        clock.settle(&mut chart);
        assert_eq!(chart.camera().scale, 2.0);

        chart.zoom_by(100.0);
        clock.settle(&mut chart);
        assert_eq!(chart.camera().scale, 10.0);

        chart.reset_zoom();
        clock.settle(&mut chart);
        assert_eq!(chart.camera(), CameraTransform::IDENTITY);

        chart.fit_view();
        clock.settle(&mut chart);
        let extent = chart.config().extent;
        for p in chart.targets().values() {
            let s = chart.camera().apply(*p);
            assert!(s.x >= 0.0 && s.x <= extent.width, "{s:?}");
            assert!(s.y >= 0.0 && s.y <= extent.height, "{s:?}");
        }
    }

    #[derive(Default)]
    struct Recorder {
        exported: Vec<(ExportFormat, usize)>,
        fail: bool,
    }

    impl SceneExporter for Recorder {
        fn export(&mut self, snapshot: &SceneSnapshot, format: ExportFormat) -> Result<()> {
            if self.fail {
                return Err(ChartError::Export("disk full".into()));
            }
            self.exported.push((format, snapshot.frame.nodes.len()));
            Ok(())
        }
    }

    #[test]
    fn test_export_hands_snapshot_to_exporter() {
        let (chart, _) = loaded();
        let mut recorder = Recorder::default();
        chart.export(&mut recorder, ExportFormat::Svg).unwrap();
        assert_eq!(recorder.exported, vec![(ExportFormat::Svg, 4)]);

        recorder.fail = true;
        let err = chart.export(&mut recorder, ExportFormat::Pdf).unwrap_err();
        assert_eq!(err.to_string(), "Export failed: disk full");
    }

    #[test]
    fn test_refresh_drops_stale_state() {
        let (mut chart, _) = loaded();
        chart.click("G").unwrap();
        chart.toggle_collapse("B").unwrap();
        let mut next = records();
        next.retain(|record| record.id == "A" || record.id == "C");
        chart.set_data(next);
        assert_eq!(chart.selected(), None);
        assert!(!chart.is_collapsed("B"));
    }

    #[test]
    fn test_teardown_stops_everything() {
        let (mut chart, mut clock) = loaded();
        chart.click("B").unwrap();
        chart.set_view_mode(ViewMode::Network);
        chart.teardown();

        assert!(!chart.is_animating());
        assert!(chart.frame().nodes.is_empty());
        assert!(chart.drain_events().is_empty());
        assert!(chart.selected().is_none());
        clock.settle(&mut chart);
        assert!(chart.frame().nodes.is_empty());
    }
}
