//! Hierarchy builder: flat parent-referencing records into a rooted tree.
//!
//! The builder runs two passes over the input:
//!
//! 1. Wrap every record in a [`HierarchyNode`] and index it by id.
//! 2. Attach each node to the node its `parent_id` resolves to, or collect it
//!    as a root candidate when the reference is absent or dangling.
//!
//! Exactly one candidate becomes the root. Zero or several candidates are
//! gathered under a synthetic virtual root so the result is always a single
//! rooted tree.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use super::node::NodeId;
use super::record::DepartmentRecord;

/// Id of the synthetic root. Never handed to persistence.
pub const VIRTUAL_ROOT_ID: &str = "virtual-root";

/// A department record placed in the tree.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    record: DepartmentRecord,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: u32,
    is_virtual: bool,
}

impl HierarchyNode {
    fn new(record: DepartmentRecord) -> Self {
        Self {
            record,
            parent: None,
            children: Vec::new(),
            depth: 0,
            is_virtual: false,
        }
    }

    fn virtual_root() -> Self {
        Self {
            record: DepartmentRecord::new(VIRTUAL_ROOT_ID, "", ""),
            parent: None,
            children: Vec::new(),
            depth: 0,
            is_virtual: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &DepartmentRecord {
        &self.record
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in input order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Depth below the tree root (root = 0, virtual or not).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted department tree stored in an arena.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    index: HashMap<String, NodeId>,
    root: NodeId,
}

impl Hierarchy {
    /// Build a hierarchy from a flat record list.
    ///
    /// Dangling `parent_id` references make the record a root candidate.
    /// Duplicate ids resolve last-wins: the later record replaces the earlier
    /// one in the earlier one's slot. Records caught in a parent cycle are
    /// promoted to roots at the first member (input order) of the cycle.
    ///
    /// A record whose id is [`VIRTUAL_ROOT_ID`] keeps that id for lookups;
    /// the synthetic root is then reachable only through [`Hierarchy::root`].
    pub fn build(records: &[DepartmentRecord]) -> Self {
        let mut nodes: Vec<HierarchyNode> = Vec::with_capacity(records.len() + 1);
        let mut index: HashMap<String, NodeId> = HashMap::with_capacity(records.len() + 1);

        for record in records {
            match index.get(&record.id) {
                Some(&existing) => {
                    warn!(id = %record.id, "duplicate department id, later record wins");
                    nodes[existing.index()].record = record.clone();
                }
                None => {
                    index.insert(record.id.clone(), NodeId::from_index(nodes.len()));
                    nodes.push(HierarchyNode::new(record.clone()));
                }
            }
        }

        let mut roots: Vec<NodeId> = Vec::new();
        for slot in 0..nodes.len() {
            let parent = nodes[slot]
                .record
                .parent_id
                .as_deref()
                .and_then(|parent_id| index.get(parent_id))
                .copied()
                .filter(|parent| parent.index() != slot);

            match parent {
                Some(parent) => {
                    nodes[slot].parent = Some(parent);
                    nodes[parent.index()].children.push(NodeId::from_index(slot));
                }
                None => roots.push(NodeId::from_index(slot)),
            }
        }

        Self::break_cycles(&mut nodes, &mut roots);

        let root = if roots.len() == 1 {
            roots[0]
        } else {
            let virtual_id = NodeId::from_index(nodes.len());
            let mut virtual_root = HierarchyNode::virtual_root();
            for &child in &roots {
                nodes[child.index()].parent = Some(virtual_id);
            }
            virtual_root.children = roots;
            nodes.push(virtual_root);
            if index.contains_key(VIRTUAL_ROOT_ID) {
                warn!(
                    id = VIRTUAL_ROOT_ID,
                    "department uses the reserved root id, synthetic root left unindexed"
                );
            } else {
                index.insert(VIRTUAL_ROOT_ID.to_string(), virtual_id);
            }
            virtual_id
        };

        let mut hierarchy = Self { nodes, index, root };
        hierarchy.assign_depths();

        debug!(
            departments = hierarchy.len(),
            virtual_root = hierarchy.root_node().is_virtual(),
            "built hierarchy"
        );
        hierarchy
    }

    /// Detach nodes that cannot be reached from any root (they sit on a
    /// parent cycle) and promote them to roots.
    fn break_cycles(nodes: &mut [HierarchyNode], roots: &mut Vec<NodeId>) {
        fn mark(stack: &mut Vec<NodeId>, reached: &mut [bool], nodes: &[HierarchyNode]) {
            while let Some(node) = stack.pop() {
                if reached[node.index()] {
                    continue;
                }
                reached[node.index()] = true;
                stack.extend(nodes[node.index()].children.iter().copied());
            }
        }

        let mut reached = vec![false; nodes.len()];
        let mut stack: Vec<NodeId> = roots.clone();
        mark(&mut stack, &mut reached, nodes);

        let mut promoted = false;
        for slot in 0..nodes.len() {
            if reached[slot] {
                continue;
            }
            let id = NodeId::from_index(slot);
            if let Some(parent) = nodes[slot].parent.take() {
                nodes[parent.index()].children.retain(|&child| child != id);
            }
            warn!(id = %nodes[slot].record.id, "parent cycle detected, promoting department to root");
            roots.push(id);
            stack.push(id);
            mark(&mut stack, &mut reached, nodes);
            promoted = true;
        }

        if promoted {
            roots.sort();
        }
    }

    fn assign_depths(&mut self) {
        let mut queue = VecDeque::from([(self.root, 0u32)]);
        while let Some((node, depth)) = queue.pop_front() {
            self.nodes[node.index()].depth = depth;
            for &child in &self.nodes[node.index()].children {
                queue.push_back((child, depth + 1));
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &HierarchyNode {
        &self.nodes[self.root.index()]
    }

    /// Get a node by arena id.
    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.index()]
    }

    /// Resolve a department id to its arena slot.
    pub fn node_id(&self, id: &str) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    /// Look up a node by department id.
    pub fn get(&self, id: &str) -> Option<&HierarchyNode> {
        self.node_id(id).map(|node| self.node(node))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of departments (the virtual root is not counted).
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| !node.is_virtual).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arena size, including the virtual root when present.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Department records in input order.
    pub fn records(&self) -> impl Iterator<Item = &DepartmentRecord> {
        self.nodes
            .iter()
            .filter(|node| !node.is_virtual)
            .map(|node| &node.record)
    }

    pub fn parent_of(&self, id: &str) -> Option<&HierarchyNode> {
        self.get(id)
            .and_then(|node| node.parent)
            .map(|parent| self.node(parent))
    }

    pub fn children_of(&self, id: &str) -> Vec<&HierarchyNode> {
        self.get(id)
            .map(|node| node.children.iter().map(|&child| self.node(child)).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// All arena ids in depth-first pre-order, children in input order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node.index()].children.iter().rev().copied());
        }
        order
    }

    /// Ancestors of `id`, nearest first, ending at the tree root.
    pub fn ancestors(&self, id: &str) -> Vec<&HierarchyNode> {
        let mut result = Vec::new();
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(node) = current {
            let node = self.node(node);
            result.push(node);
            current = node.parent;
        }
        result
    }

    /// Department ids from the top of the tree down to `id`, inclusive.
    /// The virtual root is left out. Empty for unknown ids.
    pub fn path_to(&self, id: &str) -> Vec<String> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let mut path: Vec<String> = self
            .ancestors(id)
            .into_iter()
            .filter(|ancestor| !ancestor.is_virtual)
            .map(|ancestor| ancestor.id().to_string())
            .collect();
        path.reverse();
        if !node.is_virtual {
            path.push(node.id().to_string());
        }
        path
    }

    /// Whether `node` lies strictly inside the subtree rooted at `ancestor`.
    ///
    /// Searches top-down from `ancestor`. Unknown ids are never descendants.
    pub fn is_descendant(&self, ancestor: &str, node: &str) -> bool {
        let (Some(start), Some(target)) = (self.node_id(ancestor), self.node_id(node)) else {
            return false;
        };
        if start == target {
            return false;
        }

        let mut stack: Vec<NodeId> = self.nodes[start.index()].children.clone();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            stack.extend(self.nodes[current.index()].children.iter().copied());
        }
        false
    }

    /// Parent→child department id pairs. Links from the virtual root are
    /// omitted because the root itself is never drawn.
    pub fn links(&self) -> Vec<(String, String)> {
        self.preorder()
            .into_iter()
            .filter_map(|id| {
                let node = self.node(id);
                let parent = self.node(node.parent?);
                if parent.is_virtual {
                    return None;
                }
                Some((parent.id().to_string(), node.id().to_string()))
            })
            .collect()
    }

    /// Rebuild with the descendants of every collapsed node removed.
    /// Collapsed nodes themselves stay visible.
    pub fn without_collapsed(&self, collapsed: &HashSet<String>) -> Hierarchy {
        if collapsed.is_empty() {
            return self.clone();
        }

        let mut hidden = vec![false; self.nodes.len()];
        for id in self.preorder() {
            let node = self.node(id);
            if let Some(parent) = node.parent {
                let parent_node = self.node(parent);
                hidden[id.index()] =
                    hidden[parent.index()] || collapsed.contains(parent_node.id());
            }
        }

        let visible: Vec<DepartmentRecord> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(slot, node)| !node.is_virtual && !hidden[*slot])
            .map(|(_, node)| node.record.clone())
            .collect();

        Hierarchy::build(&visible)
    }
}
