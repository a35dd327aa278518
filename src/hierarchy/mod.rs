//! Department records and the rooted tree built from them.
//!
//! The hierarchy is an arena: nodes live in a `Vec`, and parent/child links
//! are [`NodeId`] slots. Building is a pure O(n) function of the input and is
//! cheap enough to run on every data refresh.

mod node;
mod record;
mod tree;

pub use node::NodeId;
pub use record::{DepartmentRecord, DepartmentStatus};
pub use tree::{Hierarchy, HierarchyNode, VIRTUAL_ROOT_ID};
