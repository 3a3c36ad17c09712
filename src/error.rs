// SPDX-License-Identifier: MIT

//! Typed error handling for routeflow
//!
//! Build-time failures (`CompileError`, `DeployError`) are returned to the
//! caller and abort a deployment. Runtime failures never escape the engine:
//! they are attached to the message as an `ExchangeError`.

use thiserror::Error;

/// Boxed error used at host capability seams (processors, step factories)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for routeflow
#[derive(Debug, Error)]
pub enum FlowError {
    /// Graph compilation failed
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Runtime materialization or registration failed
    #[error("Deploy error: {0}")]
    Deploy(#[from] DeployError),

    /// Configuration errors (invalid env vars, bad flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Flow not deployed
    #[error("Flow '{0}' is not deployed")]
    FlowNotFound(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl FlowError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Errors raised while compiling a flow definition into a graph
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// Two nodes share an id
    #[error("Duplicate node id '{0}'")]
    DuplicateNode(String),

    /// An edge references a node that was not declared
    #[error("Edge {source_id} -> {target_id} references unknown node '{missing}'")]
    UnknownNode {
        source_id: String,
        target_id: String,
        missing: String,
    },

    /// No node has in-degree zero
    #[error("Flow has no entry node (every node has an incoming edge)")]
    MissingEntry,

    /// More than one node has in-degree zero
    #[error("Flow has multiple entry candidates: {0:?}")]
    AmbiguousEntry(Vec<String>),

    /// A node declared as entry has incoming edges
    #[error("Node '{0}' is declared as entry but has incoming edges")]
    EntryNotRoot(String),

    /// The component registry does not know a component
    #[error("Node '{node_id}' uses unknown component '{component}'")]
    UnresolvedComponent { node_id: String, component: String },

    /// A when-clause label has no edges, so the branch can never run
    #[error("Choice '{node_id}' branch '{label}' has no outgoing edges")]
    UnreachableBranch { node_id: String, label: String },

    /// A choice node has an outgoing edge without a branch label
    #[error("Choice '{node_id}' has an unlabeled edge to '{target_id}'")]
    UnlabeledChoiceEdge { node_id: String, target_id: String },

    /// An id contains a reserved character
    #[error("Identifier '{id}' must not contain '{reserved}'")]
    InvalidIdentifier { id: String, reserved: char },

    /// An id is empty or has leading or trailing whitespace
    #[error("Identifier '{0}' must be non-empty without surrounding whitespace")]
    UntrimmedIdentifier(String),
}

/// Errors raised while turning descriptors into runnable stages
#[derive(Debug, Error)]
pub enum DeployError {
    /// The host step factory rejected a descriptor
    #[error("Stage '{stage_id}' could not be created: {source}")]
    StepFactory {
        stage_id: String,
        #[source]
        source: BoxError,
    },

    /// A when-clause expression did not compile
    #[error("Choice '{stage_id}' predicate did not compile: {source}")]
    Predicate {
        stage_id: String,
        #[source]
        source: PredicateError,
    },

    /// No predicate language registered under the given name
    #[error("Unknown predicate language '{0}'")]
    UnknownLanguage(String),

    /// Namespaced stage id already registered by another flow
    #[error("Stage id '{0}' is already registered by another flow")]
    StageCollision(String),
}

/// Errors raised by predicate languages
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredicateError {
    /// Expression text could not be parsed
    #[error("Could not parse {what}: {input}")]
    Parse { what: &'static str, input: String },

    /// An ordered comparison met a non-numeric value
    #[error("Cannot compare '{path}' ({found}) with {op} {expected}")]
    TypeMismatch {
        path: String,
        op: String,
        expected: String,
        found: String,
    },

    /// Evaluation failed for a host-specific reason
    #[error("{0}")]
    Evaluation(String),
}

impl PredicateError {
    pub(crate) fn parse(what: &'static str, input: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.into(),
        }
    }
}

/// Failure recorded on a message while it traverses a flow
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExchangeError {
    /// A step stage returned an error
    #[error("Stage '{stage_id}' failed: {message}")]
    Stage { stage_id: String, message: String },

    /// A when-clause predicate failed; the remaining clauses were skipped
    #[error("Choice '{stage_id}' failed evaluating branch '{branch}': {source}")]
    Predicate {
        stage_id: String,
        branch: String,
        #[source]
        source: PredicateError,
    },

    /// The stage registry had no stage for a node
    #[error("No stage registered for '{0}'")]
    MissingStage(String),

    /// A path walked more nodes than the configured limit
    #[error("Path exceeded {limit} hops at stage '{stage_id}'")]
    HopLimitExceeded { stage_id: String, limit: usize },

    /// One message invoked more stages than the execution-wide budget allows
    #[error("Execution exceeded {limit} stage visits at stage '{stage_id}'")]
    VisitBudgetExceeded { stage_id: String, limit: usize },

    /// Snapshot fan-outs nested deeper than the configured limit
    #[error("Fan-out at stage '{stage_id}' nested deeper than {limit} levels")]
    FanOutDepthExceeded { stage_id: String, limit: usize },
}

impl ExchangeError {
    /// Namespaced id of the stage that produced the error
    pub fn stage_id(&self) -> &str {
        match self {
            Self::Stage { stage_id, .. }
            | Self::Predicate { stage_id, .. }
            | Self::HopLimitExceeded { stage_id, .. }
            | Self::VisitBudgetExceeded { stage_id, .. }
            | Self::FanOutDepthExceeded { stage_id, .. } => stage_id,
            Self::MissingStage(stage_id) => stage_id,
        }
    }
}
