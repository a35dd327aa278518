//! Reingold-Tilford tidy tree layout, linear and radial.
//!
//! Uses the Buchheim-Junger-Leipert refinement ("Improving Walker's Algorithm
//! to Run in Linear Time", 2002) so every level is placed with contour threads
//! in O(n) overall.
//!
//! # Algorithm Overview
//!
//! 1. **First walk (post-order):** assign preliminary x-coordinates by pushing
//!    each subtree right until its left contour clears the right contour of
//!    the subtrees already placed, then center parents over their children.
//! 2. **Second walk (pre-order):** accumulate modifiers into final x values.
//! 3. **Projection:** map the x range and depth onto the canvas, either as a
//!    top-down tree or as angle/radius around the canvas center.
//!
//! Separation between neighbours on the same level is `sibling_separation`
//! when they share a parent and `subtree_separation` otherwise. The radial
//! projection divides it by depth so outer rings are packed tighter.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Extent, LayoutStrategy, Position, PositionMap};
use crate::hierarchy::{Hierarchy, NodeId};

/// Coordinate mode for the final layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateMode {
    /// Top-down layout: x follows sibling order, y follows depth.
    Linear,
    /// Polar layout: x becomes the angle, depth the radius.
    Radial,
}

/// Configuration for the tidy tree layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidyTreeConfig {
    /// Separation between neighbours with the same parent.
    pub sibling_separation: f32,
    /// Separation between neighbours with different parents.
    pub subtree_separation: f32,
    /// Canvas padding on every side.
    pub margin: f32,
}

impl Default for TidyTreeConfig {
    fn default() -> Self {
        Self {
            sibling_separation: 1.0,
            subtree_separation: 2.0,
            margin: 40.0,
        }
    }
}

/// Per-node walk state, indexed by hierarchy arena slot.
#[derive(Debug, Clone)]
struct WalkNode {
    parent: Option<usize>,
    children: Vec<usize>,
    depth: u32,
    /// Index among its siblings.
    number: usize,
    prelim: f64,
    modifier: f64,
    shift: f64,
    change: f64,
    thread: Option<usize>,
    ancestor: usize,
    default_ancestor: Option<usize>,
    x: f64,
}

/// Tidy tree engine shared by [`TreeLayout`] and [`RadialLayout`].
#[derive(Debug, Clone)]
pub struct TidyTreeLayout {
    config: TidyTreeConfig,
    mode: CoordinateMode,
}

impl TidyTreeLayout {
    pub fn new(config: TidyTreeConfig, mode: CoordinateMode) -> Self {
        Self { config, mode }
    }

    pub fn config(&self) -> &TidyTreeConfig {
        &self.config
    }

    pub fn mode(&self) -> CoordinateMode {
        self.mode
    }

    /// Lay out `hierarchy` inside `extent`.
    ///
    /// The virtual root is never part of the result. An empty hierarchy
    /// yields an empty map; a single department sits at the canvas center.
    pub fn compute(&self, hierarchy: &Hierarchy, extent: Extent) -> PositionMap {
        let mut positions = PositionMap::new();
        if hierarchy.is_empty() {
            return positions;
        }

        let mut nodes = Self::build_walk_tree(hierarchy);
        let order = hierarchy.preorder();
        let root = hierarchy.root().index();

        for &v in Self::postorder(&order, &nodes).iter() {
            self.first_walk(v, &mut nodes);
        }
        Self::second_walk(root, &order, &mut nodes);

        let visible: Vec<NodeId> = order
            .iter()
            .copied()
            .filter(|&id| !hierarchy.node(id).is_virtual())
            .collect();

        if visible.len() == 1 {
            let id = hierarchy.node(visible[0]).id().to_string();
            positions.insert(id, extent.center());
            return positions;
        }

        // Extremes of the visible layout drive the scale (d3 `size` semantics).
        let mut left = visible[0].index();
        let mut right = left;
        let mut min_depth = u32::MAX;
        let mut max_depth = 0;
        for id in &visible {
            let slot = id.index();
            if nodes[slot].x < nodes[left].x {
                left = slot;
            }
            if nodes[slot].x > nodes[right].x {
                right = slot;
            }
            min_depth = min_depth.min(nodes[slot].depth);
            max_depth = max_depth.max(nodes[slot].depth);
        }

        let padding = if left == right {
            1.0
        } else {
            self.separation(left, right, &nodes) / 2.0
        };
        let tx = padding - nodes[left].x;
        let span = nodes[right].x + padding + tx;
        let margin = f64::from(self.config.margin);

        match self.mode {
            CoordinateMode::Linear => {
                let width = (f64::from(extent.width) - 2.0 * margin).max(0.0);
                let height = (f64::from(extent.height) - 2.0 * margin).max(0.0);
                let kx = width / span;
                let levels = max_depth - min_depth;
                let ky = height / f64::from(levels.max(1));

                for id in &visible {
                    let node = &nodes[id.index()];
                    let x = margin + (node.x + tx) * kx;
                    let y = margin + f64::from(node.depth - min_depth) * ky;
                    positions.insert(
                        hierarchy.node(*id).id().to_string(),
                        Position::new(x as f32, y as f32),
                    );
                }
            }
            CoordinateMode::Radial => {
                let center = extent.center();
                let (cx, cy) = (f64::from(center.x), f64::from(center.y));
                let outer = (f64::from(extent.width.min(extent.height)) / 2.0 - margin).max(0.0);
                let kx = std::f64::consts::TAU / span;
                let ky = outer / f64::from(max_depth.max(1));

                for id in &visible {
                    let node = &nodes[id.index()];
                    let angle = (node.x + tx) * kx;
                    let radius = f64::from(node.depth) * ky;
                    let theta = angle - std::f64::consts::FRAC_PI_2;
                    let x = cx + radius * theta.cos();
                    let y = cy + radius * theta.sin();
                    positions.insert(
                        hierarchy.node(*id).id().to_string(),
                        Position::new(x as f32, y as f32),
                    );
                }
            }
        }

        debug!(
            mode = ?self.mode,
            nodes = positions.len(),
            depth = max_depth,
            "computed tidy tree layout"
        );
        positions
    }

    fn build_walk_tree(hierarchy: &Hierarchy) -> Vec<WalkNode> {
        let mut nodes: Vec<WalkNode> = (0..hierarchy.node_count())
            .map(|slot| {
                let node = hierarchy.node(NodeId::from_index(slot));
                WalkNode {
                    parent: node.parent().map(NodeId::index),
                    children: node.children().iter().map(|c| c.index()).collect(),
                    depth: node.depth(),
                    number: 0,
                    prelim: 0.0,
                    modifier: 0.0,
                    shift: 0.0,
                    change: 0.0,
                    thread: None,
                    ancestor: slot,
                    default_ancestor: None,
                    x: 0.0,
                }
            })
            .collect();

        for slot in 0..nodes.len() {
            for i in 0..nodes[slot].children.len() {
                let child = nodes[slot].children[i];
                nodes[child].number = i;
            }
        }
        nodes
    }

    /// Children before parents, siblings left to right.
    fn postorder(preorder: &[NodeId], nodes: &[WalkNode]) -> Vec<usize> {
        let mut order = Vec::with_capacity(preorder.len());
        let Some(root) = preorder.first() else {
            return order;
        };
        let mut stack: Vec<(usize, bool)> = vec![(root.index(), false)];
        while let Some((v, expanded)) = stack.pop() {
            if expanded {
                order.push(v);
                continue;
            }
            stack.push((v, true));
            for &child in nodes[v].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    fn separation(&self, a: usize, b: usize, nodes: &[WalkNode]) -> f64 {
        let base = if nodes[a].parent == nodes[b].parent {
            self.config.sibling_separation
        } else {
            self.config.subtree_separation
        };
        match self.mode {
            CoordinateMode::Linear => f64::from(base),
            CoordinateMode::Radial => f64::from(base) / f64::from(nodes[a].depth.max(1)),
        }
    }

    fn first_walk(&self, v: usize, nodes: &mut [WalkNode]) {
        let parent = nodes[v].parent;
        let left_sibling = parent
            .filter(|_| nodes[v].number > 0)
            .map(|p| nodes[p].children[nodes[v].number - 1]);

        let first = nodes[v].children.first().copied();
        let last = nodes[v].children.last().copied();
        if let (Some(first), Some(last)) = (first, last) {
            Self::execute_shifts(v, nodes);
            let midpoint = (nodes[first].prelim + nodes[last].prelim) / 2.0;
            match left_sibling {
                Some(w) => {
                    nodes[v].prelim = nodes[w].prelim + self.separation(v, w, nodes);
                    nodes[v].modifier = nodes[v].prelim - midpoint;
                }
                None => nodes[v].prelim = midpoint,
            }
        } else if let Some(w) = left_sibling {
            nodes[v].prelim = nodes[w].prelim + self.separation(v, w, nodes);
        }

        if let Some(p) = parent {
            let current = nodes[p].default_ancestor.unwrap_or(nodes[p].children[0]);
            let next = self.apportion(v, left_sibling, current, nodes);
            nodes[p].default_ancestor = Some(next);
        }
    }

    /// Push the subtree of `v` clear of everything left of it, spreading the
    /// shift over the siblings in between.
    fn apportion(
        &self,
        v: usize,
        left_sibling: Option<usize>,
        mut default_ancestor: usize,
        nodes: &mut [WalkNode],
    ) -> usize {
        let (Some(w), Some(parent)) = (left_sibling, nodes[v].parent) else {
            return default_ancestor;
        };

        // i = inner, o = outer; p = right side (v), m = left side (w)
        let mut v_ip = v;
        let mut v_op = v;
        let mut v_im = w;
        let mut v_om = nodes[parent].children[0];
        let mut s_ip = nodes[v_ip].modifier;
        let mut s_op = nodes[v_op].modifier;
        let mut s_im = nodes[v_im].modifier;
        let mut s_om = nodes[v_om].modifier;

        let mut next_im = Self::next_right(v_im, nodes);
        let mut next_ip = Self::next_left(v_ip, nodes);

        while let (Some(im), Some(ip)) = (next_im, next_ip) {
            v_im = im;
            v_ip = ip;
            if let Some(next) = Self::next_left(v_om, nodes) {
                v_om = next;
            }
            if let Some(next) = Self::next_right(v_op, nodes) {
                v_op = next;
            }
            nodes[v_op].ancestor = v;

            let shift = nodes[v_im].prelim + s_im - nodes[v_ip].prelim - s_ip
                + self.separation(v_im, v_ip, nodes);
            if shift > 0.0 {
                let wm = Self::next_ancestor(v_im, v, default_ancestor, nodes);
                Self::move_subtree(wm, v, shift, nodes);
                s_ip += shift;
                s_op += shift;
            }

            s_im += nodes[v_im].modifier;
            s_ip += nodes[v_ip].modifier;
            s_om += nodes[v_om].modifier;
            s_op += nodes[v_op].modifier;

            next_im = Self::next_right(v_im, nodes);
            next_ip = Self::next_left(v_ip, nodes);
        }

        if let Some(im) = next_im {
            if Self::next_right(v_op, nodes).is_none() {
                nodes[v_op].thread = Some(im);
                nodes[v_op].modifier += s_im - s_op;
            }
        }
        if let Some(ip) = next_ip {
            if Self::next_left(v_om, nodes).is_none() {
                nodes[v_om].thread = Some(ip);
                nodes[v_om].modifier += s_ip - s_om;
                default_ancestor = v;
            }
        }

        default_ancestor
    }

    fn next_left(v: usize, nodes: &[WalkNode]) -> Option<usize> {
        nodes[v].children.first().copied().or(nodes[v].thread)
    }

    fn next_right(v: usize, nodes: &[WalkNode]) -> Option<usize> {
        nodes[v].children.last().copied().or(nodes[v].thread)
    }

    /// The sibling of `v` whose subtree owns `v_im`, or the default ancestor.
    fn next_ancestor(v_im: usize, v: usize, default_ancestor: usize, nodes: &[WalkNode]) -> usize {
        let candidate = nodes[v_im].ancestor;
        if nodes[candidate].parent == nodes[v].parent {
            candidate
        } else {
            default_ancestor
        }
    }

    fn move_subtree(wm: usize, wp: usize, shift: f64, nodes: &mut [WalkNode]) {
        let subtrees = (nodes[wp].number as f64 - nodes[wm].number as f64).max(1.0);
        let change = shift / subtrees;
        nodes[wp].change -= change;
        nodes[wp].shift += shift;
        nodes[wm].change += change;
        nodes[wp].prelim += shift;
        nodes[wp].modifier += shift;
    }

    fn execute_shifts(v: usize, nodes: &mut [WalkNode]) {
        let mut shift = 0.0;
        let mut change = 0.0;
        for i in (0..nodes[v].children.len()).rev() {
            let child = nodes[v].children[i];
            nodes[child].prelim += shift;
            nodes[child].modifier += shift;
            change += nodes[child].change;
            shift += nodes[child].shift + change;
        }
    }

    /// Resolve final x values. The root lands at x = 0.
    fn second_walk(root: usize, preorder: &[NodeId], nodes: &mut [WalkNode]) {
        let mut accumulated = vec![0.0f64; nodes.len()];
        for id in preorder {
            let v = id.index();
            let inherited = match nodes[v].parent {
                Some(p) => accumulated[p],
                None if v == root => -nodes[v].prelim,
                None => 0.0,
            };
            nodes[v].x = nodes[v].prelim + inherited;
            accumulated[v] = nodes[v].modifier + inherited;
        }
    }
}

/// Top-down tidy tree.
#[derive(Debug, Clone, Default)]
pub struct TreeLayout {
    pub config: TidyTreeConfig,
}

impl TreeLayout {
    pub fn new(config: TidyTreeConfig) -> Self {
        Self { config }
    }
}

impl LayoutStrategy for TreeLayout {
    fn layout(&self, hierarchy: &Hierarchy, extent: Extent) -> PositionMap {
        TidyTreeLayout::new(self.config.clone(), CoordinateMode::Linear).compute(hierarchy, extent)
    }
}

/// Tidy tree wrapped around the canvas center.
#[derive(Debug, Clone, Default)]
pub struct RadialLayout {
    pub config: TidyTreeConfig,
}

impl RadialLayout {
    pub fn new(config: TidyTreeConfig) -> Self {
        Self { config }
    }
}

impl LayoutStrategy for RadialLayout {
    fn layout(&self, hierarchy: &Hierarchy, extent: Extent) -> PositionMap {
        TidyTreeLayout::new(self.config.clone(), CoordinateMode::Radial).compute(hierarchy, extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::DepartmentRecord;

    fn rec(id: &str, parent: Option<&str>) -> DepartmentRecord {
        let record = DepartmentRecord::new(id, id, id);
        match parent {
            Some(parent) => record.with_parent(parent),
            None => record,
        }
    }

    fn extent() -> Extent {
        Extent::new(800.0, 600.0)
    }

    #[test]
    fn test_single_root_three_children() {
        let h = Hierarchy::build(&[
            rec("A", None),
            rec("B", Some("A")),
            rec("C", Some("A")),
            rec("D", Some("A")),
        ]);
        let positions = TreeLayout::default().layout(&h, extent());

        assert_eq!(positions.len(), 4);
        let (a, b, c, d) = (positions["A"], positions["B"], positions["C"], positions["D"]);

        assert_eq!(b.y, c.y);
        assert_eq!(c.y, d.y);
        assert!(b.y > a.y, "children one level below the root");
        assert!(b.x < c.x && c.x < d.x, "siblings in input order");
        assert!((a.x - c.x).abs() < 1e-3, "root centered above its children");
        assert!((a.x - 400.0).abs() < 1e-3);
    }

    #[test]
    fn test_fits_canvas() {
        let h = Hierarchy::build(&[
            rec("A", None),
            rec("B", Some("A")),
            rec("C", Some("A")),
            rec("B1", Some("B")),
            rec("B2", Some("B")),
            rec("C1", Some("C")),
        ]);
        let positions = TreeLayout::default().layout(&h, extent());

        for (id, p) in &positions {
            assert!(p.x >= 40.0 && p.x <= 760.0, "{id} x out of range: {}", p.x);
            assert!(p.y >= 40.0 && p.y <= 560.0, "{id} y out of range: {}", p.y);
        }
        assert!((positions["A"].y - 40.0).abs() < 1e-3);
        assert!((positions["B1"].y - 560.0).abs() < 1e-3);
    }

    #[test]
    fn test_cousins_get_wider_gap_than_siblings() {
        let h = Hierarchy::build(&[
            rec("A", None),
            rec("B", Some("A")),
            rec("C", Some("A")),
            rec("B1", Some("B")),
            rec("B2", Some("B")),
            rec("C1", Some("C")),
            rec("C2", Some("C")),
        ]);
        let p = TreeLayout::default().layout(&h, extent());

        let sibling_gap = p["B2"].x - p["B1"].x;
        let cousin_gap = p["C1"].x - p["B2"].x;
        assert!(
            (cousin_gap - 2.0 * sibling_gap).abs() < 1e-2,
            "sibling gap {sibling_gap}, cousin gap {cousin_gap}"
        );
    }

    #[test]
    fn test_deep_left_subtree_does_not_overlap() {
        // A → B → B1 → B11, A → C → C1
        let h = Hierarchy::build(&[
            rec("A", None),
            rec("B", Some("A")),
            rec("C", Some("A")),
            rec("B1", Some("B")),
            rec("B11", Some("B1")),
            rec("B12", Some("B1")),
            rec("C1", Some("C")),
            rec("C2", Some("C")),
            rec("C11", Some("C1")),
        ]);
        let p = TreeLayout::default().layout(&h, extent());

        assert!(p["B12"].x < p["C11"].x);
        assert!(p["B1"].x < p["C1"].x);
        assert!(p["B"].x < p["C"].x);

        // No two nodes share a spot on the same level.
        let mut by_level: Vec<(f32, f32)> = p.values().map(|p| (p.y, p.x)).collect();
        by_level.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for pair in by_level.windows(2) {
            if pair[0].0 == pair[1].0 {
                assert!(pair[1].1 - pair[0].1 > 1.0, "overlap at level {}", pair[0].0);
            }
        }
    }

    #[test]
    fn test_interior_subtrees_spread_evenly() {
        // Small subtrees between two wide ones get the shift distributed.
        let h = Hierarchy::build(&[
            rec("R", None),
            rec("L", Some("R")),
            rec("M1", Some("R")),
            rec("M2", Some("R")),
            rec("W", Some("R")),
            rec("L1", Some("L")),
            rec("L2", Some("L")),
            rec("L3", Some("L")),
            rec("W1", Some("W")),
            rec("W2", Some("W")),
            rec("W3", Some("W")),
        ]);
        let p = TreeLayout::default().layout(&h, extent());

        let gap_a = p["M1"].x - p["L"].x;
        let gap_b = p["M2"].x - p["M1"].x;
        let gap_c = p["W"].x - p["M2"].x;
        assert!((gap_a - gap_b).abs() < 1e-2, "{gap_a} vs {gap_b}");
        assert!((gap_b - gap_c).abs() < 1e-2, "{gap_b} vs {gap_c}");
    }

    #[test]
    fn test_virtual_root_children_form_top_row() {
        let h = Hierarchy::build(&[rec("X", None), rec("Y", None), rec("X1", Some("X"))]);
        let p = TreeLayout::default().layout(&h, extent());

        assert_eq!(p.len(), 3);
        assert!(!p.contains_key(crate::hierarchy::VIRTUAL_ROOT_ID));
        assert_eq!(p["X"].y, p["Y"].y);
        assert!((p["X"].y - 40.0).abs() < 1e-3);
        assert!(p["X"].x < p["Y"].x);
        assert!(p["X1"].y > p["X"].y);
    }

    #[test]
    fn test_single_node_centered() {
        let h = Hierarchy::build(&[rec("A", None)]);
        let tree = TreeLayout::default().layout(&h, extent());
        let radial = RadialLayout::default().layout(&h, extent());

        assert_eq!(tree["A"], Position::new(400.0, 300.0));
        assert_eq!(radial["A"], Position::new(400.0, 300.0));
    }

    #[test]
    fn test_empty_hierarchy() {
        let h = Hierarchy::build(&[]);
        assert!(TreeLayout::default().layout(&h, extent()).is_empty());
        assert!(RadialLayout::default().layout(&h, extent()).is_empty());
    }

    #[test]
    fn test_radial_root_at_center_children_on_ring() {
        let h = Hierarchy::build(&[
            rec("A", None),
            rec("B", Some("A")),
            rec("C", Some("A")),
            rec("D", Some("A")),
            rec("E", Some("A")),
        ]);
        let p = RadialLayout::default().layout(&h, extent());
        let center = extent().center();

        assert!(p["A"].distance_to(center) < 1e-3);
        // min(800, 600) / 2 - 40
        for id in ["B", "C", "D", "E"] {
            let r = p[id].distance_to(center);
            assert!((r - 260.0).abs() < 1e-2, "{id} radius {r}");
        }
        // First child starts at the top, angles advance clockwise.
        assert!(p["B"].y < center.y);
    }

    #[test]
    fn test_radial_four_children_quarter_turns() {
        let h = Hierarchy::build(&[
            rec("A", None),
            rec("B", Some("A")),
            rec("C", Some("A")),
            rec("D", Some("A")),
            rec("E", Some("A")),
        ]);
        let p = RadialLayout::default().layout(&h, extent());
        let center = extent().center();

        let angle = |id: &str| (p[id].y - center.y).atan2(p[id].x - center.x);
        let step = (angle("C") - angle("B")).rem_euclid(std::f32::consts::TAU);
        assert!((step - std::f32::consts::FRAC_PI_2).abs() < 1e-3, "step {step}");
    }

    #[test]
    fn test_deterministic() {
        let records = [
            rec("A", None),
            rec("B", Some("A")),
            rec("C", Some("A")),
            rec("B1", Some("B")),
            rec("Q", None),
        ];
        let h = Hierarchy::build(&records);
        let first = TreeLayout::default().layout(&h, extent());
        let second = TreeLayout::default().layout(&Hierarchy::build(&records), extent());
        assert_eq!(first, second);

        let first = RadialLayout::default().layout(&h, extent());
        let second = RadialLayout::default().layout(&h, extent());
        assert_eq!(first, second);
    }
}
