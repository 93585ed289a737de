//! Node storage for the polygon A* search

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use glam::Vec3;
use navmesh::PolyId;

/// State of a node in the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeState {
    /// Node is in the open list
    Open,
    /// Node has been expanded
    Closed,
}

/// One visited polygon
#[derive(Debug, Clone)]
pub(crate) struct SearchNode {
    pub poly: PolyId,
    /// Parent node and the parent's edge leading here
    pub parent: Option<(usize, usize)>,
    /// Where the path enters the polygon: the start position or the middle of
    /// the entry edge
    pub pos: Vec3,
    /// Cost from the start
    pub g: f32,
    /// Estimated cost to the nearest goal
    pub h: f32,
    pub state: NodeState,
}

/// Node wrapper for the binary heap (priority queue)
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeapNode {
    pub index: usize,
    /// Total cost (g + h)
    pub f: f32,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap on f, NaN sorts last
        match other.f.partial_cmp(&self.f) {
            Some(ordering) => ordering,
            None => {
                if other.f.is_nan() && !self.f.is_nan() {
                    Ordering::Greater
                } else if !other.f.is_nan() && self.f.is_nan() {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            }
        }
    }
}

/// Nodes indexed by polygon plus the open list
#[derive(Debug, Default)]
pub(crate) struct NodePool {
    nodes: Vec<SearchNode>,
    lookup: HashMap<PolyId, usize>,
    open: BinaryHeap<HeapNode>,
}

impl NodePool {
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
        self.open.clear();
    }

    pub fn node(&self, index: usize) -> &SearchNode {
        &self.nodes[index]
    }

    pub fn find(&self, poly: PolyId) -> Option<usize> {
        self.lookup.get(&poly).copied()
    }

    /// Adds a new open node and pushes it on the open list
    pub fn push(&mut self, node: SearchNode) -> usize {
        let index = self.nodes.len();
        let f = node.g + node.h;
        self.lookup.insert(node.poly, index);
        self.nodes.push(node);
        self.open.push(HeapNode { index, f });
        index
    }

    /// Gives an open node a cheaper route and queues it again
    pub fn update(&mut self, index: usize, parent: (usize, usize), pos: Vec3, g: f32) {
        let node = &mut self.nodes[index];
        node.parent = Some(parent);
        node.pos = pos;
        node.g = g;
        node.state = NodeState::Open;
        let f = node.g + node.h;
        self.open.push(HeapNode { index, f });
    }

    /// Pops the cheapest open node and closes it. Stale heap entries left by
    /// [`NodePool::update`] are skipped.
    pub fn pop(&mut self) -> Option<usize> {
        while let Some(HeapNode { index, f }) = self.open.pop() {
            let node = &mut self.nodes[index];
            if node.state == NodeState::Closed || f > node.g + node.h {
                continue;
            }
            node.state = NodeState::Closed;
            return Some(index);
        }
        None
    }

    /// Edges walked from the start to `index`, as `(node, edge)` pairs
    pub fn route(&self, index: usize) -> Vec<(usize, usize)> {
        let mut route = Vec::new();
        let mut current = index;
        while let Some((parent, edge)) = self.nodes[current].parent {
            route.push((parent, edge));
            current = parent;
        }
        route.reverse();
        route
    }
}
