// SPDX-License-Identifier: MIT

//! Flow deployment - orchestrates compile, convert and materialize
//!
//! `FlowRuntime` owns the shared stage registry and the set of deployed
//! flows. Deploying an id that is already deployed replaces it atomically;
//! messages already running keep the snapshot they started on.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::components::ComponentLookup;
use super::condition::PredicateLanguages;
use super::descriptor::{RouteDescriptorConverter, RouteDescriptorSet};
use super::engine::{EngineOptions, GraphExecutionEngine};
use super::graph::{CompiledGraph, GraphCompiler};
use super::materializer::RouteMaterializer;
use super::registry::{FlowStages, StageRegistry};
use super::types::FlowDefinition;
use crate::config::RuntimeConfig;
use crate::error::FlowError;
use crate::pipeline::StepFactory;

/// Everything built for one deployed flow
#[derive(Debug)]
pub struct DeployedFlow {
    pub graph: Arc<CompiledGraph>,
    pub descriptors: RouteDescriptorSet,
    pub stages: Arc<FlowStages>,
    pub deployed_at: DateTime<Utc>,
}

/// Deploys flows into a shared stage registry and hands out engines
pub struct FlowRuntime {
    components: Arc<dyn ComponentLookup>,
    converter: RouteDescriptorConverter,
    materializer: RouteMaterializer,
    registry: StageRegistry,
    flows: RwLock<HashMap<String, Arc<DeployedFlow>>>,
    options: EngineOptions,
}

impl FlowRuntime {
    /// Runtime with the built-in predicate language only
    pub fn new(
        components: Arc<dyn ComponentLookup>,
        factory: Arc<dyn StepFactory>,
        config: &RuntimeConfig,
    ) -> Result<Self, FlowError> {
        Self::with_languages(components, factory, PredicateLanguages::default(), config)
    }

    pub fn with_languages(
        components: Arc<dyn ComponentLookup>,
        factory: Arc<dyn StepFactory>,
        mut languages: PredicateLanguages,
        config: &RuntimeConfig,
    ) -> Result<Self, FlowError> {
        languages.set_default(config.default_language.clone())?;

        Ok(Self {
            components,
            converter: RouteDescriptorConverter::new(config.encoding),
            materializer: RouteMaterializer::new(factory, Arc::new(languages)),
            registry: StageRegistry::new(),
            flows: RwLock::new(HashMap::new()),
            options: config.engine_options(),
        })
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Compile, convert and materialize a flow, then swap it in.
    ///
    /// Nothing is replaced unless every step succeeds.
    pub async fn deploy(
        &self,
        definition: &FlowDefinition,
    ) -> Result<Arc<DeployedFlow>, FlowError> {
        let compiler = GraphCompiler::new(self.components.as_ref());
        let graph = compiler.compile(definition)?;
        let descriptors = self.converter.convert(&graph);
        let stages = Arc::new(self.materializer.materialize(&descriptors)?);

        let deployed = Arc::new(DeployedFlow {
            graph: Arc::new(graph),
            descriptors,
            stages: stages.clone(),
            deployed_at: Utc::now(),
        });

        let mut flows = self.flows.write().await;
        self.registry.register_flow(stages).await?;
        let previous = flows.insert(definition.id.clone(), deployed.clone());

        match previous {
            Some(old) => log::info!(
                "Redeployed flow '{}' ({} stages, replacing deploy from {})",
                definition.id,
                deployed.stages.len(),
                old.deployed_at
            ),
            None => log::info!(
                "Deployed flow '{}' ({} stages)",
                definition.id,
                deployed.stages.len()
            ),
        }
        Ok(deployed)
    }

    pub async fn undeploy(&self, flow_id: &str) -> Result<Arc<DeployedFlow>, FlowError> {
        let mut flows = self.flows.write().await;
        let removed = flows
            .remove(flow_id)
            .ok_or_else(|| FlowError::FlowNotFound(flow_id.to_string()))?;
        self.registry.remove_flow(flow_id).await;

        log::info!("Undeployed flow '{}'", flow_id);
        Ok(removed)
    }

    pub async fn flow(&self, flow_id: &str) -> Option<Arc<DeployedFlow>> {
        let flows = self.flows.read().await;
        flows.get(flow_id).cloned()
    }

    /// Engine bound to the flow's current snapshot
    pub async fn engine(&self, flow_id: &str) -> Result<GraphExecutionEngine, FlowError> {
        let deployed = self
            .flow(flow_id)
            .await
            .ok_or_else(|| FlowError::FlowNotFound(flow_id.to_string()))?;
        Ok(GraphExecutionEngine::new(
            deployed.graph.clone(),
            deployed.stages.clone(),
            self.options,
        ))
    }

    /// Deployed flow ids, sorted
    pub async fn flow_ids(&self) -> Vec<String> {
        let flows = self.flows.read().await;
        let mut ids: Vec<String> = flows.keys().cloned().collect();
        ids.sort();
        ids
    }
}
