// SPDX-License-Identifier: MIT

//! Flow compilation, deployment and execution
//!
//! A flow goes through four stages:
//! - `graph` compiles node/edge definitions into a `CompiledGraph`
//! - `descriptor` converts the graph into namespaced route descriptors
//! - `materializer` turns descriptors into runnable stages
//! - `engine` walks the graph for every message

pub mod choice;
pub mod components;
pub mod condition;
pub mod deployment;
pub mod descriptor;
pub mod engine;
pub mod graph;
pub mod loader;
pub mod materializer;
pub mod registry;
pub mod types;

pub use choice::{ChoiceClause, ChoiceStage};
pub use components::{ComponentCatalog, ComponentLookup};
pub use deployment::{DeployedFlow, FlowRuntime};
pub use descriptor::{ParameterEncoding, RouteDescriptorConverter, RouteDescriptorSet};
pub use engine::{BranchIsolation, Completion, Continuation, EngineOptions, GraphExecutionEngine};
pub use graph::{CompiledGraph, GraphCompiler};
pub use loader::{FlowDocument, FlowLoader};
pub use materializer::RouteMaterializer;
pub use registry::{FlowStages, RunnableStage, StageRegistry};
pub use types::{ComponentMetadata, EdgeConfig, FlowDefinition, NodeConfig, NodeKind, WhenClause};
