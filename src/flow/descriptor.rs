// SPDX-License-Identifier: MIT

//! Route descriptor conversion
//!
//! Translates a `CompiledGraph` into namespaced descriptors the host runtime
//! materializes into runnable stages. Every id is rendered as
//! `flow_id:node_id` so several flows can share one stage registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use url::form_urlencoded;

use super::graph::{qualify, CompiledGraph, NodeDefinition, PredicateDescriptor};
use crate::error::FlowError;
use crate::pipeline::MATCH_DELIMITER;

/// How parameter maps are rendered into binding query strings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterEncoding {
    /// `application/x-www-form-urlencoded` keys and values (default)
    #[default]
    Percent,
    /// Raw `key=value&...` with no escaping
    Legacy,
}

impl FromStr for ParameterEncoding {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "encoded" => Ok(Self::Percent),
            "legacy" | "raw" => Ok(Self::Legacy),
            other => Err(FlowError::config(format!(
                "Unknown parameter encoding: {}",
                other
            ))),
        }
    }
}

/// All descriptors of one flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDescriptorSet {
    pub flow_id: String,
    pub entry: EntryRouteDescriptor,
    pub stages: Vec<StageDescriptor>,
}

impl RouteDescriptorSet {
    /// Find a stage descriptor by namespaced id
    pub fn stage(&self, id: &str) -> Option<&StageDescriptor> {
        self.stages.iter().find(|s| s.id() == id)
    }
}

/// Namespaced entry binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRouteDescriptor {
    pub id: String,
    pub component: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StageDescriptor {
    Step(StepDescriptor),
    Choice(ChoiceDescriptor),
}

impl StageDescriptor {
    pub fn id(&self) -> &str {
        match self {
            StageDescriptor::Step(step) => &step.id,
            StageDescriptor::Choice(choice) => &choice.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDescriptor {
    pub id: String,
    pub component: String,
    pub uri: String,
}

/// When-table and otherwise key, all in namespaced ids
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceDescriptor {
    pub id: String,
    pub when: Vec<WhenDescriptor>,
    pub otherwise: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhenDescriptor {
    /// Namespaced successor ids joined by the match delimiter
    pub key: String,
    pub label: String,
    pub predicate: PredicateDescriptor,
}

/// Converts compiled graphs into descriptor sets
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteDescriptorConverter {
    encoding: ParameterEncoding,
}

impl RouteDescriptorConverter {
    pub fn new(encoding: ParameterEncoding) -> Self {
        Self { encoding }
    }

    pub fn convert(&self, graph: &CompiledGraph) -> RouteDescriptorSet {
        let flow_id = graph.flow_id();
        let entry = graph.entry();

        let stages = graph
            .definitions()
            .map(|(id, definition)| {
                let stage_id = graph.qualified(id);
                match definition {
                    NodeDefinition::Step(step) => StageDescriptor::Step(StepDescriptor {
                        id: stage_id,
                        component: step.component.clone(),
                        uri: render_uri(&step.binding, &step.params, self.encoding),
                    }),
                    NodeDefinition::Choice(choice) => StageDescriptor::Choice(ChoiceDescriptor {
                        id: stage_id,
                        when: choice
                            .branches
                            .iter()
                            .map(|branch| WhenDescriptor {
                                key: namespaced_key(flow_id, &branch.targets),
                                label: branch.label.clone(),
                                predicate: branch.predicate.clone(),
                            })
                            .collect(),
                        otherwise: choice
                            .otherwise
                            .as_ref()
                            .map(|targets| namespaced_key(flow_id, targets)),
                    }),
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Converted flow '{}' into {} stage descriptors",
            flow_id,
            stages.len()
        );

        RouteDescriptorSet {
            flow_id: flow_id.to_string(),
            entry: EntryRouteDescriptor {
                id: qualify(flow_id, &entry.node_id),
                component: entry.component.clone(),
                uri: render_uri(&entry.binding, &entry.params, self.encoding),
            },
            stages,
        }
    }
}

fn namespaced_key(flow_id: &str, targets: &[String]) -> String {
    targets
        .iter()
        .map(|target| qualify(flow_id, target))
        .collect::<Vec<_>>()
        .join(MATCH_DELIMITER.to_string().as_str())
}

/// Append a parameter map to a binding as a query string
pub fn render_uri(
    binding: &str,
    params: &BTreeMap<String, Value>,
    encoding: ParameterEncoding,
) -> String {
    if params.is_empty() {
        return binding.to_string();
    }

    let query = match encoding {
        ParameterEncoding::Percent => {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (key, value) in params {
                serializer.append_pair(key, &stringify(value));
            }
            serializer.finish()
        }
        ParameterEncoding::Legacy => params
            .iter()
            .map(|(key, value)| format!("{}={}", key, stringify(value)))
            .collect::<Vec<_>>()
            .join("&"),
    };

    let joiner = if binding.contains('?') { '&' } else { '?' };
    format!("{}{}{}", binding, joiner, query)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
