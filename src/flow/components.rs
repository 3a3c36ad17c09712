// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use super::types::ComponentMetadata;

/// Resolves component names referenced by nodes
pub trait ComponentLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Option<ComponentMetadata>;
}

/// In-memory component registry
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    components: HashMap<String, ComponentMetadata>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: ComponentMetadata) {
        self.components.insert(component.name.clone(), component);
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromIterator<ComponentMetadata> for ComponentCatalog {
    fn from_iter<I: IntoIterator<Item = ComponentMetadata>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for component in iter {
            catalog.register(component);
        }
        catalog
    }
}

impl ComponentLookup for ComponentCatalog {
    fn lookup(&self, name: &str) -> Option<ComponentMetadata> {
        self.components.get(name).cloned()
    }
}

impl<F> ComponentLookup for F
where
    F: Fn(&str) -> Option<ComponentMetadata> + Send + Sync,
{
    fn lookup(&self, name: &str) -> Option<ComponentMetadata> {
        self(name)
    }
}
