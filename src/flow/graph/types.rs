// SPDX-License-Identifier: MIT

//! Compiled graph types
//!
//! A `CompiledGraph` is immutable once built and is shared by every message
//! running through the flow.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::arena::{NodeArena, NodeId};
use crate::pipeline::MATCH_DELIMITER;

/// Separator between flow id and node id in namespaced ids
pub const NAMESPACE_SEPARATOR: char = ':';

/// Qualify a node id with its flow id
pub fn qualify(flow_id: &str, node_id: &str) -> String {
    format!("{}{}{}", flow_id, NAMESPACE_SEPARATOR, node_id)
}

/// Split a namespaced id into flow id and node id
pub fn split_qualified(qualified: &str) -> Option<(&str, &str)> {
    qualified.split_once(NAMESPACE_SEPARATOR)
}

/// The flow's trigger: the unique node without incoming edges
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryDescriptor {
    pub node_id: String,
    pub component: String,
    pub binding: String,
    pub params: BTreeMap<String, Value>,
}

/// Predicate text plus the language it is written in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredicateDescriptor {
    /// `None` selects the runtime's default language
    pub language: Option<String>,
    pub expression: String,
}

/// Definition of a non-entry node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeDefinition {
    Step(StepDefinition),
    Choice(ChoiceDefinition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    pub component: String,
    pub binding: String,
    pub params: BTreeMap<String, Value>,
}

/// When-clauses keyed by their resolved successors, in declared order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceDefinition {
    pub branches: Vec<ChoiceBranch>,
    pub otherwise: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceBranch {
    /// Label as authored, kept for diagnostics
    pub label: String,
    /// Local ids of every edge target sharing the label, in edge order
    pub targets: Vec<String>,
    pub predicate: PredicateDescriptor,
}

/// Render a successor list as a choice match key
pub fn join_targets<'a>(targets: impl IntoIterator<Item = &'a String>) -> String {
    targets
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(MATCH_DELIMITER.to_string().as_str())
}

impl ChoiceBranch {
    /// Resolved successor id string (local ids)
    pub fn key(&self) -> String {
        join_targets(&self.targets)
    }
}

/// Directed graph of a flow plus per-node definitions
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    flow_id: String,
    arena: NodeArena,
    entry_node: NodeId,
    entry: EntryDescriptor,
    definitions: Vec<Option<NodeDefinition>>,
}

impl CompiledGraph {
    pub(crate) fn new(
        flow_id: String,
        arena: NodeArena,
        entry_node: NodeId,
        entry: EntryDescriptor,
        definitions: Vec<Option<NodeDefinition>>,
    ) -> Self {
        Self {
            flow_id,
            arena,
            entry_node,
            entry,
            definitions,
        }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn entry(&self) -> &EntryDescriptor {
        &self.entry
    }

    pub fn entry_node(&self) -> NodeId {
        self.entry_node
    }

    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.arena.get(name)
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.arena.name(id)
    }

    /// Namespaced id of a node
    pub fn qualified(&self, id: NodeId) -> String {
        qualify(&self.flow_id, self.arena.name(id))
    }

    /// Resolve a namespaced id belonging to this flow
    pub fn resolve_qualified(&self, qualified: &str) -> Option<NodeId> {
        let (flow_id, node_id) = split_qualified(qualified)?;
        if flow_id != self.flow_id {
            return None;
        }
        self.arena.get(node_id)
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.arena.successors(id)
    }

    /// Successor names of a node, in edge order
    pub fn successor_names(&self, name: &str) -> Vec<&str> {
        self.node(name)
            .map(|id| {
                self.successors(id)
                    .iter()
                    .map(|s| self.arena.name(*s))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn definition(&self, id: NodeId) -> Option<&NodeDefinition> {
        self.definitions.get(id.index()).and_then(Option::as_ref)
    }

    /// Non-entry node definitions in declaration order
    pub fn definitions(&self) -> impl Iterator<Item = (NodeId, &NodeDefinition)> + '_ {
        self.arena
            .ids()
            .filter_map(move |id| self.definition(id).map(|def| (id, def)))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}
