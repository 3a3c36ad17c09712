// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::choice::ChoiceStage;
use super::graph::split_qualified;
use crate::error::DeployError;
use crate::pipeline::Processor;

/// A materialized stage bound to one namespaced node id
#[derive(Clone)]
pub enum RunnableStage {
    Step(Arc<dyn Processor>),
    Choice(Arc<ChoiceStage>),
}

impl fmt::Debug for RunnableStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnableStage::Step(processor) => {
                f.debug_tuple("Step").field(&processor.name()).finish()
            }
            RunnableStage::Choice(choice) => f.debug_tuple("Choice").field(&choice.id()).finish(),
        }
    }
}

/// Immutable stage set of one deployed flow
#[derive(Debug, Clone, Default)]
pub struct FlowStages {
    flow_id: String,
    stages: HashMap<String, RunnableStage>,
}

impl FlowStages {
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            stages: HashMap::new(),
        }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    /// Add a stage; ids must be unique within the set
    pub fn insert(
        &mut self,
        stage_id: impl Into<String>,
        stage: RunnableStage,
    ) -> Result<(), DeployError> {
        let stage_id = stage_id.into();
        if self.stages.contains_key(&stage_id) {
            return Err(DeployError::StageCollision(stage_id));
        }
        self.stages.insert(stage_id, stage);
        Ok(())
    }

    pub fn get(&self, stage_id: &str) -> Option<&RunnableStage> {
        self.stages.get(stage_id)
    }

    pub fn contains(&self, stage_id: &str) -> bool {
        self.stages.contains_key(stage_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Shared registry of stage sets, one per deployed flow
#[derive(Clone)]
pub struct StageRegistry {
    flows: Arc<RwLock<HashMap<String, Arc<FlowStages>>>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self {
            flows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register or replace a flow's stage set.
    ///
    /// The swap is atomic: readers see either the previous set or the new
    /// one. Fails if a stage id is already owned by a different flow.
    pub async fn register_flow(
        &self,
        stages: impl Into<Arc<FlowStages>>,
    ) -> Result<Option<Arc<FlowStages>>, DeployError> {
        let stages: Arc<FlowStages> = stages.into();
        let mut flows = self.flows.write().await;

        for (flow_id, existing) in flows.iter() {
            if flow_id == stages.flow_id() {
                continue;
            }
            if let Some(id) = stages.ids().find(|id| existing.contains(id)) {
                return Err(DeployError::StageCollision(id.to_string()));
            }
        }

        log::debug!(
            "Registering {} stages for flow '{}'",
            stages.len(),
            stages.flow_id()
        );
        Ok(flows.insert(stages.flow_id().to_string(), stages))
    }

    pub async fn remove_flow(&self, flow_id: &str) -> Option<Arc<FlowStages>> {
        let mut flows = self.flows.write().await;
        flows.remove(flow_id)
    }

    pub async fn flow(&self, flow_id: &str) -> Option<Arc<FlowStages>> {
        let flows = self.flows.read().await;
        flows.get(flow_id).cloned()
    }

    /// Look up a stage by namespaced id
    pub async fn get(&self, stage_id: &str) -> Option<RunnableStage> {
        let (flow_id, _) = split_qualified(stage_id)?;
        let flows = self.flows.read().await;
        flows.get(flow_id)?.get(stage_id).cloned()
    }

    /// Total number of registered stages across all flows
    pub async fn len(&self) -> usize {
        let flows = self.flows.read().await;
        flows.values().map(|stages| stages.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
