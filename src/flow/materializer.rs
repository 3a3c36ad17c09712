//! Route materialization
//!
//! Turns a descriptor set into runnable stages using the host's step factory
//! and predicate languages. Predicates are compiled here, once per deploy.

use std::sync::Arc;

use super::choice::{ChoiceClause, ChoiceStage};
use super::condition::PredicateLanguages;
use super::descriptor::{ChoiceDescriptor, RouteDescriptorSet, StageDescriptor};
use super::registry::{FlowStages, RunnableStage};
use crate::error::DeployError;
use crate::pipeline::StepFactory;

pub struct RouteMaterializer {
    factory: Arc<dyn StepFactory>,
    languages: Arc<PredicateLanguages>,
}

impl RouteMaterializer {
    pub fn new(factory: Arc<dyn StepFactory>, languages: Arc<PredicateLanguages>) -> Self {
        Self { factory, languages }
    }

    pub fn materialize(&self, descriptors: &RouteDescriptorSet) -> Result<FlowStages, DeployError> {
        let mut stages = FlowStages::new(descriptors.flow_id.clone());

        for descriptor in &descriptors.stages {
            let stage = match descriptor {
                StageDescriptor::Step(step) => {
                    let processor =
                        self.factory
                            .create(step)
                            .map_err(|source| DeployError::StepFactory {
                                stage_id: step.id.clone(),
                                source,
                            })?;
                    RunnableStage::Step(processor)
                }
                StageDescriptor::Choice(choice) => {
                    RunnableStage::Choice(Arc::new(self.choice_stage(choice)?))
                }
            };
            stages.insert(descriptor.id(), stage)?;
        }

        log::debug!(
            "Materialized {} stages for flow '{}'",
            stages.len(),
            descriptors.flow_id
        );
        Ok(stages)
    }

    fn choice_stage(&self, choice: &ChoiceDescriptor) -> Result<ChoiceStage, DeployError> {
        let clauses = choice
            .when
            .iter()
            .map(|when| -> Result<ChoiceClause, DeployError> {
                let language = self.languages.get(when.predicate.language.as_deref())?;
                let predicate = language
                    .compile(&when.predicate.expression)
                    .map_err(|source| DeployError::Predicate {
                        stage_id: choice.id.clone(),
                        source,
                    })?;
                Ok(ChoiceClause {
                    key: when.key.clone(),
                    label: when.label.clone(),
                    predicate,
                })
            })
            .collect::<Result<Vec<_>, DeployError>>()?;

        Ok(ChoiceStage::new(
            choice.id.clone(),
            clauses,
            choice.otherwise.clone(),
        ))
    }
}
