//! Flow loader - YAML/JSON file loading and parsing
//!
//! A flow document bundles one flow definition with the components it uses,
//! standing in for the external component registry.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::components::ComponentCatalog;
use super::types::{ComponentMetadata, FlowDefinition};
use crate::error::FlowError;

/// A flow definition plus the component catalog it resolves against
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FlowDocument {
    pub flow: FlowDefinition,
    #[serde(default)]
    pub components: Vec<ComponentMetadata>,
}

impl FlowDocument {
    pub fn catalog(&self) -> ComponentCatalog {
        self.components.iter().cloned().collect()
    }
}

/// Loads flow documents from YAML or JSON
pub struct FlowLoader;

impl FlowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a flow document; `.json` files are read as JSON, anything else as YAML
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<FlowDocument, FlowError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let document = if is_json {
            Self::parse_json(&content)?
        } else {
            Self::parse_yaml(&content)?
        };
        log::info!(
            "Loaded flow '{}' ({} nodes, {} components) from {}",
            document.flow.id,
            document.flow.nodes.len(),
            document.components.len(),
            path.display()
        );
        Ok(document)
    }

    pub fn parse_yaml(content: &str) -> Result<FlowDocument, FlowError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn parse_json(content: &str) -> Result<FlowDocument, FlowError> {
        Ok(serde_json::from_str(content)?)
    }
}

impl Default for FlowLoader {
    fn default() -> Self {
        Self::new()
    }
}
