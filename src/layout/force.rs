//! Force-directed network layout.
//!
//! The simulation works on the flat department set: one node per record and
//! one spring per resolved parent reference. Topology is a petgraph
//! `StableGraph`; positions and velocities live in SoA buffers indexed by
//! `NodeIndex::index()`.
//!
//! Each step cools `alpha` toward zero and applies, in order:
//!
//! - **link**: springs pull parent/child pairs toward `link_distance`
//! - **charge**: every pair repels with `charge_strength / distance²`
//! - **collision**: circles of `collision_radius` are pushed apart
//! - **center**: the whole layout is shifted so its mean sits on the canvas center
//!
//! followed by velocity decay and integration. Pinned nodes keep their fixed
//! position and zero velocity.
//!
//! Stepping is explicit: [`ForceLayout::tick`] takes a simulation and returns
//! the next one, so the caller decides whether to drive it from a frame loop,
//! a fixed-timestep loop or a test.

use std::collections::HashMap;

use petgraph::Undirected;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Extent, LayoutStrategy, Position, PositionMap};
use crate::hierarchy::{DepartmentRecord, Hierarchy};

/// Configuration for the force simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Rest length of parent/child springs.
    pub link_distance: f32,
    /// Multiplier on the degree-normalized spring strength.
    pub link_strength: f32,
    /// Pairwise charge. Negative values repel.
    pub charge_strength: f32,
    /// Fraction of the mean offset removed per step (1 = snap to center).
    pub center_strength: f32,
    /// Radius of the collision circle around each node.
    pub collision_radius: f32,
    pub collision_strength: f32,
    /// Starting temperature.
    pub alpha: f32,
    /// Simulation stops once alpha falls below this.
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub alpha_target: f32,
    /// Fraction of velocity lost per step.
    pub velocity_decay: f32,
    /// Hard iteration budget for run-to-convergence.
    pub max_iterations: u32,
    /// Seed for the initial placement.
    pub seed: u64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            link_distance: 80.0,
            link_strength: 1.0,
            charge_strength: -300.0,
            center_strength: 1.0,
            collision_radius: 30.0,
            collision_strength: 0.7,
            alpha: 1.0,
            alpha_min: 0.001,
            // 1 - alpha_min^(1/300): cools from 1 to alpha_min in 300 steps
            alpha_decay: 0.022_8,
            alpha_target: 0.0,
            velocity_decay: 0.4,
            max_iterations: 300,
            seed: 42,
        }
    }
}

/// One frame of the force simulation.
#[derive(Debug, Clone)]
pub struct ForceSimulation {
    graph: StableGraph<String, (), Undirected>,
    index: HashMap<String, NodeIndex>,
    pos_x: Vec<f32>,
    pos_y: Vec<f32>,
    vel_x: Vec<f32>,
    vel_y: Vec<f32>,
    pinned: Vec<Option<Position>>,
    alpha: f32,
    iterations: u32,
    center: Position,
    rng: StdRng,
}

impl ForceSimulation {
    /// Build a simulation over `records`, scattered around the canvas center.
    ///
    /// Duplicate ids keep their first slot. Parent references that do not
    /// resolve, or point at the record itself, produce no spring.
    pub fn new(records: &[DepartmentRecord], extent: Extent, config: &ForceConfig) -> Self {
        let mut graph: StableGraph<String, (), Undirected> =
            StableGraph::with_capacity(records.len(), records.len());
        let mut index: HashMap<String, NodeIndex> = HashMap::with_capacity(records.len());

        for record in records {
            if !index.contains_key(&record.id) {
                let node = graph.add_node(record.id.clone());
                index.insert(record.id.clone(), node);
            }
        }

        let mut parent_of: HashMap<&str, &str> = HashMap::with_capacity(records.len());
        for record in records {
            match record.parent_id.as_deref() {
                Some(parent) => {
                    parent_of.insert(&record.id, parent);
                }
                None => {
                    parent_of.remove(record.id.as_str());
                }
            }
        }
        let nodes: Vec<NodeIndex> = graph.node_indices().collect();
        for id in nodes {
            let child_id = graph[id].clone();
            let parent = parent_of
                .get(child_id.as_str())
                .and_then(|parent_id| index.get(*parent_id))
                .copied();
            if let Some(parent) = parent.filter(|&parent| parent != id) {
                graph.add_edge(parent, id, ());
            }
        }

        let count = graph.node_bound();
        let center = extent.center();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut pos_x = Vec::with_capacity(count);
        let mut pos_y = Vec::with_capacity(count);

        if count == 1 {
            pos_x.push(center.x);
            pos_y.push(center.y);
        } else {
            let spread = config.link_distance.max(1.0) * (count as f32).sqrt() / 2.0;
            for _ in 0..count {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let radius = spread * rng.r#gen::<f32>().sqrt();
                pos_x.push(center.x + radius * angle.cos());
                pos_y.push(center.y + radius * angle.sin());
            }
        }

        Self {
            graph,
            index,
            pos_x,
            pos_y,
            vel_x: vec![0.0; count],
            vel_y: vec![0.0; count],
            pinned: vec![None; count],
            alpha: config.alpha,
            iterations: 0,
            center,
            rng,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Current position of a department.
    pub fn position(&self, id: &str) -> Option<Position> {
        self.index
            .get(id)
            .map(|node| Position::new(self.pos_x[node.index()], self.pos_y[node.index()]))
    }

    /// Current positions of every department.
    pub fn positions(&self) -> PositionMap {
        self.graph
            .node_indices()
            .map(|node| {
                let i = node.index();
                (self.graph[node].clone(), Position::new(self.pos_x[i], self.pos_y[i]))
            })
            .collect()
    }

    /// Move known departments to the given positions, e.g. to keep the
    /// previous frame's placement across a data refresh.
    pub fn seed_positions(&mut self, positions: &PositionMap) {
        for (id, p) in positions {
            if let Some(node) = self.index.get(id) {
                self.pos_x[node.index()] = p.x;
                self.pos_y[node.index()] = p.y;
            }
        }
    }

    /// Fix a department in place. Returns false for unknown ids.
    pub fn pin(&mut self, id: &str, position: Position) -> bool {
        let Some(node) = self.index.get(id) else {
            return false;
        };
        let i = node.index();
        self.pinned[i] = Some(position);
        self.pos_x[i] = position.x;
        self.pos_y[i] = position.y;
        self.vel_x[i] = 0.0;
        self.vel_y[i] = 0.0;
        true
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        match self.index.get(id) {
            Some(node) => self.pinned[node.index()].take().is_some(),
            None => false,
        }
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.index
            .get(id)
            .is_some_and(|node| self.pinned[node.index()].is_some())
    }

    /// Raise the temperature so the layout starts moving again.
    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.iterations = 0;
    }

    fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }

    /// Tiny deterministic offset for coincident points.
    fn jiggle(&mut self) -> f32 {
        (self.rng.r#gen::<f32>() - 0.5) * 1e-6
    }

    fn apply_links(&mut self, config: &ForceConfig) {
        let links: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target()))
            .collect();

        for (source, target) in links {
            let (s, t) = (source.index(), target.index());
            let source_degree = self.degree(source) as f32;
            let target_degree = self.degree(target) as f32;
            let strength = config.link_strength / source_degree.min(target_degree).max(1.0);
            let bias = source_degree / (source_degree + target_degree);

            let mut dx = self.pos_x[t] + self.vel_x[t] - self.pos_x[s] - self.vel_x[s];
            let mut dy = self.pos_y[t] + self.vel_y[t] - self.pos_y[s] - self.vel_y[s];
            if dx == 0.0 {
                dx = self.jiggle();
            }
            if dy == 0.0 {
                dy = self.jiggle();
            }
            let length = (dx * dx + dy * dy).sqrt();
            let pull = (length - config.link_distance) / length * self.alpha * strength;
            dx *= pull;
            dy *= pull;

            self.vel_x[t] -= dx * bias;
            self.vel_y[t] -= dy * bias;
            self.vel_x[s] += dx * (1.0 - bias);
            self.vel_y[s] += dy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self, config: &ForceConfig) {
        let count = self.pos_x.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let mut dx = self.pos_x[j] - self.pos_x[i];
                let mut dy = self.pos_y[j] - self.pos_y[i];
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                // Clamp to avoid blow-ups at near-zero distances.
                let distance_sq = (dx * dx + dy * dy).max(1.0);
                let w = config.charge_strength * self.alpha / distance_sq;
                self.vel_x[i] += dx * w;
                self.vel_y[i] += dy * w;
                self.vel_x[j] -= dx * w;
                self.vel_y[j] -= dy * w;
            }
        }
    }

    fn apply_collision(&mut self, config: &ForceConfig) {
        let count = self.pos_x.len();
        let min_distance = config.collision_radius * 2.0;
        for i in 0..count {
            for j in (i + 1)..count {
                let mut dx = self.pos_x[j] + self.vel_x[j] - self.pos_x[i] - self.vel_x[i];
                let mut dy = self.pos_y[j] + self.vel_y[j] - self.pos_y[i] - self.vel_y[i];
                let distance_sq = dx * dx + dy * dy;
                if distance_sq >= min_distance * min_distance {
                    continue;
                }
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                let distance = (dx * dx + dy * dy).sqrt();
                let push = (min_distance - distance) / distance * config.collision_strength * 0.5;
                self.vel_x[i] -= dx * push;
                self.vel_y[i] -= dy * push;
                self.vel_x[j] += dx * push;
                self.vel_y[j] += dy * push;
            }
        }
    }

    fn apply_center(&mut self, config: &ForceConfig) {
        let count = self.pos_x.len();
        if count == 0 {
            return;
        }
        let mean_x = self.pos_x.iter().sum::<f32>() / count as f32;
        let mean_y = self.pos_y.iter().sum::<f32>() / count as f32;
        let shift_x = (mean_x - self.center.x) * config.center_strength;
        let shift_y = (mean_y - self.center.y) * config.center_strength;
        for i in 0..count {
            self.pos_x[i] -= shift_x;
            self.pos_y[i] -= shift_y;
        }
    }

    fn integrate(&mut self, config: &ForceConfig) {
        let keep = 1.0 - config.velocity_decay;
        for i in 0..self.pos_x.len() {
            match self.pinned[i] {
                Some(fixed) => {
                    self.pos_x[i] = fixed.x;
                    self.pos_y[i] = fixed.y;
                    self.vel_x[i] = 0.0;
                    self.vel_y[i] = 0.0;
                }
                None => {
                    self.vel_x[i] *= keep;
                    self.vel_y[i] *= keep;
                    self.pos_x[i] += self.vel_x[i];
                    self.pos_y[i] += self.vel_y[i];
                }
            }
        }
    }

    fn step(&mut self, config: &ForceConfig) {
        self.alpha += (config.alpha_target - self.alpha) * config.alpha_decay;
        self.apply_links(config);
        self.apply_charge(config);
        self.apply_collision(config);
        self.apply_center(config);
        self.integrate(config);
        self.iterations += 1;
    }
}

/// Force-directed layout strategy.
#[derive(Debug, Clone, Default)]
pub struct ForceLayout {
    pub config: ForceConfig,
}

impl ForceLayout {
    pub fn new(config: ForceConfig) -> Self {
        Self { config }
    }

    /// Fresh simulation over the department records of `hierarchy`.
    pub fn simulation(&self, hierarchy: &Hierarchy, extent: Extent) -> ForceSimulation {
        let records: Vec<DepartmentRecord> = hierarchy.records().cloned().collect();
        ForceSimulation::new(&records, extent, &self.config)
    }

    /// Advance the simulation by one step.
    pub fn tick(&self, mut simulation: ForceSimulation) -> ForceSimulation {
        simulation.step(&self.config);
        simulation
    }

    /// Whether the simulation has cooled down or used its iteration budget.
    pub fn is_converged(&self, simulation: &ForceSimulation) -> bool {
        simulation.alpha < self.config.alpha_min
            || simulation.iterations >= self.config.max_iterations
    }

    /// Step until converged.
    pub fn run(&self, mut simulation: ForceSimulation) -> ForceSimulation {
        while !self.is_converged(&simulation) {
            simulation = self.tick(simulation);
        }
        debug!(
            nodes = simulation.node_count(),
            iterations = simulation.iterations,
            alpha = simulation.alpha,
            "force simulation converged"
        );
        simulation
    }
}

impl LayoutStrategy for ForceLayout {
    fn layout(&self, hierarchy: &Hierarchy, extent: Extent) -> PositionMap {
        let simulation = self.run(self.simulation(hierarchy, extent));
        simulation.positions()
    }
}
