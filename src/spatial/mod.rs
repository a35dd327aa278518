//! Spatial indexing for hit testing.
//!
//! The chart rebuilds the index from the scene's visual positions whenever
//! they change, and queries it in world coordinates.

mod rtree;

pub use rtree::{DepartmentPoint, SpatialIndex};
