//! Layout strategies for the department chart.
//!
//! Each strategy is a pure computation from a [`Hierarchy`] and a canvas
//! [`Extent`] to a [`PositionMap`]. Applying positions to the scene is the
//! chart's job (it diffs old and new maps into enter/update/exit sets), so the
//! algorithms here can be tested without any rendering surface.
//!
//! - [`tidy_tree`]: top-down tree and radial layouts (shared contour engine)
//! - [`force`]: stepping force simulation for the network view

pub mod force;
pub mod tidy_tree;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hierarchy::Hierarchy;

pub use force::{ForceConfig, ForceLayout, ForceSimulation};
pub use tidy_tree::{CoordinateMode, RadialLayout, TidyTreeConfig, TidyTreeLayout, TreeLayout};

/// A 2D point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Canvas size the layouts fit into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Position {
        Position::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::new(960.0, 600.0)
    }
}

/// Axis-aligned bounds of a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Bounds of all positions, or `None` for an empty set.
    pub fn of<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for p in positions {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        if min_x == f32::INFINITY {
            return None;
        }
        Some(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Target position per department id. The virtual root is never present.
pub type PositionMap = HashMap<String, Position>;

/// A layout algorithm over a department hierarchy.
pub trait LayoutStrategy {
    /// Compute a position for every department in `hierarchy`.
    fn layout(&self, hierarchy: &Hierarchy, extent: Extent) -> PositionMap;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let points = [
            Position::new(-10.0, -5.0),
            Position::new(10.0, 5.0),
            Position::new(0.0, 0.0),
        ];
        let bounds = Bounds::of(&points).unwrap();
        assert_eq!(bounds.min_x, -10.0);
        assert_eq!(bounds.max_y, 5.0);
        assert_eq!(bounds.width(), 20.0);
        assert_eq!(bounds.center(), Position::new(0.0, 0.0));
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds::of(&[]).is_none());
    }

    #[test]
    fn test_extent_center() {
        assert_eq!(Extent::new(800.0, 600.0).center(), Position::new(400.0, 300.0));
    }
}
