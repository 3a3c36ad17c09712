//! Interned node ids and ordered adjacency

use serde::Serialize;
use std::collections::HashMap;

/// Index of a node inside a compiled graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena of node ids with insertion-ordered, duplicate-free successor lists
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    names: Vec<String>,
    index: HashMap<String, NodeId>,
    successors: Vec<Vec<NodeId>>,
    in_degree: Vec<usize>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a node name. Returns `None` if the name is already present.
    pub fn insert(&mut self, name: &str) -> Option<NodeId> {
        if self.index.contains_key(name) {
            return None;
        }
        let id = NodeId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        self.successors.push(Vec::new());
        self.in_degree.push(0);
        Some(id)
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id.index()]
    }

    /// Add a directed edge; repeated edges are collapsed
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        let successors = &mut self.successors[from.index()];
        if !successors.contains(&to) {
            successors.push(to);
            self.in_degree[to.index()] += 1;
        }
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id.index()]
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.in_degree[id.index()]
    }

    /// Nodes without incoming edges, in declaration order
    pub fn roots(&self) -> Vec<NodeId> {
        self.ids().filter(|id| self.in_degree(*id) == 0).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.names.len() as u32).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
