// SPDX-License-Identifier: MIT

//! Flow graph compilation
//!
//! This module turns declarative node/edge definitions into an immutable
//! `CompiledGraph`: interned node ids, ordered adjacency and one definition
//! per non-entry node.

mod arena;
pub mod compiler;
pub mod types;

pub use arena::NodeId;
pub use compiler::GraphCompiler;
pub use types::{
    join_targets, qualify, split_qualified, ChoiceBranch, ChoiceDefinition, CompiledGraph,
    EntryDescriptor, NodeDefinition, PredicateDescriptor, StepDefinition, NAMESPACE_SEPARATOR,
};
