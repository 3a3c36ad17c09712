//! Flow definition types
//!
//! This module defines the declarative node/edge shape a flow is authored in.
//! Both snake_case and the camelCase spelling emitted by visual editors are
//! accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A flow as authored: nodes plus the edges between them
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FlowDefinition {
    /// Flow id, used to namespace every stage
    pub id: String,
    /// Human readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Nodes in the flow
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Directed edges between nodes
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
}

/// Role a node plays in the flow
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Trigger node; must be the unique root
    Entry,
    /// Plain processing step (default)
    #[default]
    Step,
    /// Conditional branching
    Choice,
}

/// A node in the flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Unique identifier within the flow
    pub id: String,
    /// Node role
    #[serde(default)]
    pub kind: NodeKind,
    /// Component the node is bound to; unused by choice nodes
    #[serde(default, alias = "componentName", alias = "component")]
    pub component_name: String,
    /// Component parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    /// Ordered when-clauses (choice nodes only)
    #[serde(default, alias = "whenClauses")]
    pub when_clauses: Vec<WhenClause>,
    /// Branch label used when no when-clause matches (choice nodes only)
    #[serde(default, alias = "otherwiseLabel")]
    pub otherwise_label: Option<String>,
}

impl NodeConfig {
    /// Create a step node
    pub fn step(id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Step,
            component_name: component.into(),
            parameters: BTreeMap::new(),
            when_clauses: Vec::new(),
            otherwise_label: None,
        }
    }

    /// Create an entry node
    pub fn entry(id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Entry,
            ..Self::step(id, component)
        }
    }

    /// Create a choice node without clauses
    pub fn choice(id: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Choice,
            ..Self::step(id, "")
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Append a when-clause in the simple language
    pub fn when(mut self, label: impl Into<String>, expression: impl Into<String>) -> Self {
        self.when_clauses.push(WhenClause {
            label: label.into(),
            expression: expression.into(),
            language: None,
        });
        self
    }

    /// Set the otherwise label
    pub fn otherwise(mut self, label: impl Into<String>) -> Self {
        self.otherwise_label = Some(label.into());
        self
    }
}

/// One conditional branch of a choice node
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WhenClause {
    /// Branch label matched against edge labels
    pub label: String,
    /// Predicate expression
    #[serde(alias = "predicate")]
    pub expression: String,
    /// Predicate language; defaults to the runtime's default language
    #[serde(default)]
    pub language: Option<String>,
}

/// A directed edge
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EdgeConfig {
    pub source: String,
    pub target: String,
    /// Choice output this edge continues
    #[serde(default, alias = "branchLabel", alias = "sourceHandle")]
    pub branch_label: Option<String>,
}

impl EdgeConfig {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            branch_label: None,
        }
    }

    pub fn labeled(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            branch_label: Some(label.into()),
            ..Self::new(source, target)
        }
    }
}

/// Registry entry describing a component
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ComponentMetadata {
    /// Component name referenced by nodes
    pub name: String,
    /// Base binding URI handed to the host runtime
    pub binding: String,
}

impl ComponentMetadata {
    pub fn new(name: impl Into<String>, binding: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binding: binding.into(),
        }
    }
}
