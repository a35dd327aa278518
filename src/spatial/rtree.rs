//! R-tree over department positions, using the rstar crate.

use std::fmt;

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::layout::{Bounds, Position};

/// A department's position in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentPoint {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

impl DepartmentPoint {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            x: position.x,
            y: position.y,
        }
    }
}

impl RTreeObject for DepartmentPoint {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for DepartmentPoint {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// R*-tree of department positions in world space.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<DepartmentPoint>,
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex").field("len", &self.len()).finish()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `points`. Bulk loading beats incremental
    /// inserts for full refreshes.
    pub fn rebuild<'a, I>(&mut self, points: I)
    where
        I: IntoIterator<Item = (&'a str, Position)>,
    {
        let points: Vec<_> = points
            .into_iter()
            .map(|(id, position)| DepartmentPoint::new(id, position))
            .collect();
        self.tree = RTree::bulk_load(points);
    }

    pub fn nearest(&self, point: Position) -> Option<&str> {
        self.tree
            .nearest_neighbor(&[point.x, point.y])
            .map(|hit| hit.id.as_str())
    }

    /// Nearest department within `max_distance` of `point`.
    pub fn nearest_within(&self, point: Position, max_distance: f32) -> Option<&str> {
        let query = [point.x, point.y];
        self.tree
            .nearest_neighbor(&query)
            .filter(|hit| hit.distance_2(&query) <= max_distance * max_distance)
            .map(|hit| hit.id.as_str())
    }

    /// All departments inside `bounds`, in no particular order.
    pub fn in_bounds(&self, bounds: Bounds) -> Vec<&str> {
        let envelope = AABB::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]);
        self.tree
            .locate_in_envelope(&envelope)
            .map(|hit| hit.id.as_str())
            .collect()
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
