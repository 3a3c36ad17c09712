// SPDX-License-Identifier: MIT

//! Graph definition compiler
//!
//! Turns a `FlowDefinition` into a `CompiledGraph`. The transform is pure:
//! the only collaborator is the component lookup.

use std::collections::HashMap;

use super::arena::{NodeArena, NodeId};
use super::types::{
    ChoiceBranch, ChoiceDefinition, CompiledGraph, EntryDescriptor, NodeDefinition,
    PredicateDescriptor, StepDefinition, NAMESPACE_SEPARATOR,
};
use crate::error::CompileError;
use crate::flow::components::ComponentLookup;
use crate::flow::types::{ComponentMetadata, FlowDefinition, NodeConfig, NodeKind};
use crate::pipeline::MATCH_DELIMITER;

/// Compiles flow definitions against a component registry
pub struct GraphCompiler<'a> {
    components: &'a dyn ComponentLookup,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(components: &'a dyn ComponentLookup) -> Self {
        Self { components }
    }

    /// Compile a flow definition
    pub fn compile(&self, flow: &FlowDefinition) -> Result<CompiledGraph, CompileError> {
        check_identifier(&flow.id)?;

        let mut arena = NodeArena::new();
        let mut configs: Vec<&NodeConfig> = Vec::with_capacity(flow.nodes.len());
        for node in &flow.nodes {
            check_identifier(&node.id)?;
            arena
                .insert(&node.id)
                .ok_or_else(|| CompileError::DuplicateNode(node.id.clone()))?;
            configs.push(node);
        }

        let labels = connect_edges(flow, &mut arena, &configs)?;
        let entry_node = find_entry(&arena, &configs)?;
        let entry = self.entry_descriptor(configs[entry_node.index()])?;

        let mut definitions = Vec::with_capacity(configs.len());
        for id in arena.ids() {
            if id == entry_node {
                definitions.push(None);
                continue;
            }
            let config = configs[id.index()];
            let definition = match config.kind {
                NodeKind::Choice => {
                    let choice = choice_definition(config, id, &labels)?;
                    NodeDefinition::Choice(choice)
                }
                NodeKind::Step | NodeKind::Entry => {
                    let step = self.step_definition(config)?;
                    NodeDefinition::Step(step)
                }
            };
            definitions.push(Some(definition));
        }

        log::info!(
            "Compiled flow '{}': {} nodes, entry '{}'",
            flow.id,
            arena.len(),
            entry.node_id
        );

        Ok(CompiledGraph::new(
            flow.id.clone(),
            arena,
            entry_node,
            entry,
            definitions,
        ))
    }

    fn resolve(&self, node: &NodeConfig) -> Result<ComponentMetadata, CompileError> {
        self.components
            .lookup(&node.component_name)
            .ok_or_else(|| CompileError::UnresolvedComponent {
                node_id: node.id.clone(),
                component: node.component_name.clone(),
            })
    }

    fn entry_descriptor(&self, node: &NodeConfig) -> Result<EntryDescriptor, CompileError> {
        let component = self.resolve(node)?;
        Ok(EntryDescriptor {
            node_id: node.id.clone(),
            component: component.name,
            binding: component.binding,
            params: node.parameters.clone(),
        })
    }

    fn step_definition(&self, node: &NodeConfig) -> Result<StepDefinition, CompileError> {
        let component = self.resolve(node)?;
        Ok(StepDefinition {
            component: component.name,
            binding: component.binding,
            params: node.parameters.clone(),
        })
    }
}

/// Targets per (choice node, branch label), in edge order
type BranchTargets = HashMap<(NodeId, String), Vec<String>>;

fn connect_edges(
    flow: &FlowDefinition,
    arena: &mut NodeArena,
    configs: &[&NodeConfig],
) -> Result<BranchTargets, CompileError> {
    let mut labels: BranchTargets = HashMap::new();

    for edge in &flow.edges {
        let lookup = |id: &str| {
            arena.get(id).ok_or_else(|| CompileError::UnknownNode {
                source_id: edge.source.clone(),
                target_id: edge.target.clone(),
                missing: id.to_string(),
            })
        };
        let source = lookup(&edge.source)?;
        let target = lookup(&edge.target)?;
        arena.connect(source, target);

        let is_choice = configs[source.index()].kind == NodeKind::Choice;
        match &edge.branch_label {
            Some(label) => {
                let targets = labels.entry((source, label.clone())).or_default();
                if !targets.contains(&edge.target) {
                    targets.push(edge.target.clone());
                }
            }
            None if is_choice => {
                return Err(CompileError::UnlabeledChoiceEdge {
                    node_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                });
            }
            None => {}
        }
    }

    Ok(labels)
}

fn find_entry(arena: &NodeArena, configs: &[&NodeConfig]) -> Result<NodeId, CompileError> {
    let roots = arena.roots();
    let entry = match roots.as_slice() {
        [] => return Err(CompileError::MissingEntry),
        [single] => *single,
        many => {
            return Err(CompileError::AmbiguousEntry(
                many.iter().map(|id| arena.name(*id).to_string()).collect(),
            ));
        }
    };

    let misplaced = configs
        .iter()
        .filter(|c| c.kind == NodeKind::Entry)
        .find(|c| arena.get(&c.id) != Some(entry));
    if let Some(misplaced) = misplaced {
        return Err(CompileError::EntryNotRoot(misplaced.id.clone()));
    }
    Ok(entry)
}

fn choice_definition(
    node: &NodeConfig,
    id: NodeId,
    labels: &BranchTargets,
) -> Result<ChoiceDefinition, CompileError> {
    let targets_for = |label: &str| labels.get(&(id, label.to_string())).cloned();

    let mut branches = Vec::with_capacity(node.when_clauses.len());
    for clause in &node.when_clauses {
        let unreachable = || CompileError::UnreachableBranch {
            node_id: node.id.clone(),
            label: clause.label.clone(),
        };
        let targets = targets_for(&clause.label).ok_or_else(unreachable)?;
        branches.push(ChoiceBranch {
            label: clause.label.clone(),
            targets,
            predicate: PredicateDescriptor {
                language: clause.language.clone(),
                expression: clause.expression.clone(),
            },
        });
    }

    let otherwise = match &node.otherwise_label {
        Some(label) => {
            let targets = targets_for(label);
            if targets.is_none() {
                log::warn!(
                    "Choice '{}' otherwise label '{}' has no edges; unmatched messages stop here",
                    node.id,
                    label
                );
            }
            targets
        }
        None => None,
    };

    Ok(ChoiceDefinition {
        branches,
        otherwise,
    })
}

fn check_identifier(id: &str) -> Result<(), CompileError> {
    // choice matches are trimmed when split, so padded ids could never match
    if id.is_empty() || id.trim() != id {
        return Err(CompileError::UntrimmedIdentifier(id.to_string()));
    }
    for reserved in [NAMESPACE_SEPARATOR, MATCH_DELIMITER] {
        if id.contains(reserved) {
            return Err(CompileError::InvalidIdentifier {
                id: id.to_string(),
                reserved,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::components::ComponentCatalog;
    use crate::flow::types::EdgeConfig;
    use serde_json::json;

    fn catalog() -> ComponentCatalog {
        [
            ComponentMetadata::new("timer", "timer:tick"),
            ComponentMetadata::new("log", "log:info"),
            ComponentMetadata::new("http", "http://example.com/hook"),
        ]
        .into_iter()
        .collect()
    }

    fn flow(nodes: Vec<NodeConfig>, edges: Vec<EdgeConfig>) -> FlowDefinition {
        FlowDefinition {
            id: "f1".to_string(),
            name: None,
            nodes,
            edges,
        }
    }

    fn compile(flow: &FlowDefinition) -> Result<CompiledGraph, CompileError> {
        let components = catalog();
        GraphCompiler::new(&components).compile(flow)
    }

    #[test]
    fn test_linear_chain() {
        let def = flow(
            vec![
                NodeConfig::entry("a", "timer").with_param("period", json!(1000)),
                NodeConfig::step("b", "log"),
                NodeConfig::step("c", "http"),
            ],
            vec![EdgeConfig::new("a", "b"), EdgeConfig::new("b", "c")],
        );
        let graph = compile(&def).unwrap();

        assert_eq!(graph.flow_id(), "f1");
        assert_eq!(graph.entry().node_id, "a");
        assert_eq!(graph.entry().binding, "timer:tick");
        assert_eq!(graph.entry().params.get("period"), Some(&json!(1000)));
        assert_eq!(graph.successor_names("a"), vec!["b"]);
        assert_eq!(graph.successor_names("b"), vec!["c"]);
        assert!(graph.successor_names("c").is_empty());
        assert!(graph.definition(graph.entry_node()).is_none());

        let b = graph.node("b").unwrap();
        match graph.definition(b) {
            Some(NodeDefinition::Step(step)) => assert_eq!(step.binding, "log:info"),
            other => panic!("Expected Step, got {:?}", other),
        }
    }

    #[test]
    fn test_root_without_entry_kind_is_entry() {
        let def = flow(
            vec![NodeConfig::step("a", "timer"), NodeConfig::step("b", "log")],
            vec![EdgeConfig::new("a", "b")],
        );
        assert_eq!(compile(&def).unwrap().entry().node_id, "a");
    }

    #[test]
    fn test_missing_entry() {
        let def = flow(
            vec![NodeConfig::step("a", "log"), NodeConfig::step("b", "log")],
            vec![EdgeConfig::new("a", "b"), EdgeConfig::new("b", "a")],
        );
        assert_eq!(compile(&def).unwrap_err(), CompileError::MissingEntry);
    }

    #[test]
    fn test_ambiguous_entry() {
        let def = flow(
            vec![
                NodeConfig::step("a", "timer"),
                NodeConfig::step("b", "timer"),
                NodeConfig::step("c", "log"),
            ],
            vec![EdgeConfig::new("a", "c"), EdgeConfig::new("b", "c")],
        );
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::AmbiguousEntry(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_entry_kind_must_be_root() {
        let def = flow(
            vec![
                NodeConfig::step("a", "timer"),
                NodeConfig::entry("b", "log"),
            ],
            vec![EdgeConfig::new("a", "b")],
        );
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::EntryNotRoot("b".to_string())
        );
    }

    #[test]
    fn test_edge_to_undeclared_node() {
        let def = flow(
            vec![NodeConfig::entry("a", "timer")],
            vec![EdgeConfig::new("a", "ghost")],
        );
        assert!(matches!(
            compile(&def).unwrap_err(),
            CompileError::UnknownNode { missing, .. } if missing == "ghost"
        ));
    }

    #[test]
    fn test_duplicate_node() {
        let def = flow(
            vec![
                NodeConfig::entry("a", "timer"),
                NodeConfig::step("a", "log"),
            ],
            vec![],
        );
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::DuplicateNode("a".to_string())
        );
    }

    #[test]
    fn test_unresolved_component() {
        let def = flow(
            vec![
                NodeConfig::entry("a", "timer"),
                NodeConfig::step("b", "smtp"),
            ],
            vec![EdgeConfig::new("a", "b")],
        );
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::UnresolvedComponent {
                node_id: "b".to_string(),
                component: "smtp".to_string(),
            }
        );
    }

    #[test]
    fn test_reserved_characters_rejected() {
        let def = flow(vec![NodeConfig::entry("a:b", "timer")], vec![]);
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::InvalidIdentifier {
                id: "a:b".to_string(),
                reserved: ':',
            }
        );

        let def = flow(vec![NodeConfig::entry("a,b", "timer")], vec![]);
        assert!(matches!(
            compile(&def).unwrap_err(),
            CompileError::InvalidIdentifier { reserved: ',', .. }
        ));
    }

    #[test]
    fn test_padded_or_empty_identifiers_rejected() {
        let def = flow(
            vec![
                NodeConfig::entry("start", "timer"),
                NodeConfig::step(" a", "log"),
            ],
            vec![EdgeConfig::new("start", " a")],
        );
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::UntrimmedIdentifier(" a".to_string())
        );

        let mut def = flow(vec![NodeConfig::entry("start", "timer")], vec![]);
        def.id = "f1 ".to_string();
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::UntrimmedIdentifier("f1 ".to_string())
        );

        let def = flow(vec![NodeConfig::entry("", "timer")], vec![]);
        assert!(matches!(
            compile(&def).unwrap_err(),
            CompileError::UntrimmedIdentifier(_)
        ));
    }

    #[test]
    fn test_choice_branches_keyed_by_resolved_targets() {
        let def = flow(
            vec![
                NodeConfig::entry("start", "timer"),
                NodeConfig::choice("route")
                    .when("big", "x > 5")
                    .when("neg", "x < 0")
                    .otherwise("rest"),
                NodeConfig::step("n1", "log"),
                NodeConfig::step("n2", "log"),
                NodeConfig::step("n3", "log"),
                NodeConfig::step("audit", "log"),
            ],
            vec![
                EdgeConfig::new("start", "route"),
                EdgeConfig::labeled("route", "n1", "big"),
                EdgeConfig::labeled("route", "audit", "big"),
                EdgeConfig::labeled("route", "n2", "neg"),
                EdgeConfig::labeled("route", "n3", "rest"),
            ],
        );
        let graph = compile(&def).unwrap();
        let route = graph.node("route").unwrap();

        let choice = match graph.definition(route) {
            Some(NodeDefinition::Choice(choice)) => choice,
            other => panic!("Expected Choice, got {:?}", other),
        };
        let keys: Vec<String> = choice.branches.iter().map(ChoiceBranch::key).collect();
        assert_eq!(keys, vec!["n1,audit", "n2"]);
        assert_eq!(choice.branches[0].predicate.expression, "x > 5");
        assert_eq!(choice.otherwise, Some(vec!["n3".to_string()]));
    }

    #[test]
    fn test_otherwise_without_edges_is_dropped() {
        let def = flow(
            vec![
                NodeConfig::entry("start", "timer"),
                NodeConfig::choice("route")
                    .when("big", "x > 5")
                    .otherwise("rest"),
                NodeConfig::step("n1", "log"),
            ],
            vec![
                EdgeConfig::new("start", "route"),
                EdgeConfig::labeled("route", "n1", "big"),
            ],
        );
        let graph = compile(&def).unwrap();
        match graph.definition(graph.node("route").unwrap()) {
            Some(NodeDefinition::Choice(choice)) => assert!(choice.otherwise.is_none()),
            other => panic!("Expected Choice, got {:?}", other),
        }
    }

    #[test]
    fn test_when_label_without_edges_is_unreachable() {
        let def = flow(
            vec![
                NodeConfig::entry("start", "timer"),
                NodeConfig::choice("route")
                    .when("big", "x > 5")
                    .when("typo", "x < 0"),
                NodeConfig::step("n1", "log"),
            ],
            vec![
                EdgeConfig::new("start", "route"),
                EdgeConfig::labeled("route", "n1", "big"),
            ],
        );
        assert_eq!(
            compile(&def).unwrap_err(),
            CompileError::UnreachableBranch {
                node_id: "route".to_string(),
                label: "typo".to_string(),
            }
        );
    }

    #[test]
    fn test_labels_are_scoped_per_choice() {
        let def = flow(
            vec![
                NodeConfig::entry("start", "timer"),
                NodeConfig::choice("c1").when("yes", "a == 1"),
                NodeConfig::choice("c2").when("yes", "b == 1"),
                NodeConfig::step("x", "log"),
                NodeConfig::step("y", "log"),
            ],
            vec![
                EdgeConfig::new("start", "c1"),
                EdgeConfig::labeled("c1", "c2", "yes"),
                EdgeConfig::labeled("c1", "x", "yes"),
                EdgeConfig::labeled("c2", "y", "yes"),
            ],
        );
        let graph = compile(&def).unwrap();
        let key_of = |name: &str| match graph.definition(graph.node(name).unwrap()) {
            Some(NodeDefinition::Choice(choice)) => choice.branches[0].key(),
            other => panic!("Expected Choice, got {:?}", other),
        };
        assert_eq!(key_of("c1"), "c2,x");
        assert_eq!(key_of("c2"), "y");
    }

    #[test]
    fn test_unlabeled_choice_edge_rejected() {
        let def = flow(
            vec![
                NodeConfig::entry("start", "timer"),
                NodeConfig::choice("route").when("big", "x > 5"),
                NodeConfig::step("n1", "log"),
                NodeConfig::step("n2", "log"),
            ],
            vec![
                EdgeConfig::new("start", "route"),
                EdgeConfig::labeled("route", "n1", "big"),
                EdgeConfig::new("route", "n2"),
            ],
        );
        assert!(matches!(
            compile(&def).unwrap_err(),
            CompileError::UnlabeledChoiceEdge { target_id, .. } if target_id == "n2"
        ));
    }

    #[test]
    fn test_single_node_flow() {
        let def = flow(vec![NodeConfig::entry("only", "timer")], vec![]);
        let graph = compile(&def).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.successors(graph.entry_node()).is_empty());
        assert_eq!(graph.definitions().count(), 0);
    }
}
