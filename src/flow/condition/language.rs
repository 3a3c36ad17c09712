// SPDX-License-Identifier: MIT

//! Predicate languages available to choice stages

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

use super::ast::Expression;
use super::{evaluator, parser};
use crate::error::{DeployError, PredicateError};
use crate::pipeline::{Message, Predicate, PredicateLanguage};

/// Name of the built-in language
pub const SIMPLE_LANGUAGE: &str = "simple";

static SIMPLE: Lazy<Arc<SimpleLanguage>> = Lazy::new(|| Arc::new(SimpleLanguage));

/// A parsed simple-language expression
#[derive(Debug, Clone)]
pub struct SimplePredicate {
    expression: Expression,
}

impl Predicate for SimplePredicate {
    fn matches(&self, message: &Message) -> Result<bool, PredicateError> {
        evaluator::evaluate(&self.expression, message)
    }
}

/// Built-in comparison language
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleLanguage;

impl PredicateLanguage for SimpleLanguage {
    fn name(&self) -> &str {
        SIMPLE_LANGUAGE
    }

    fn compile(&self, expression: &str) -> Result<Arc<dyn Predicate>, PredicateError> {
        Ok(Arc::new(SimplePredicate {
            expression: parser::parse(expression)?,
        }))
    }
}

/// Predicate languages by name, plus the default for clauses that name none
#[derive(Clone)]
pub struct PredicateLanguages {
    languages: HashMap<String, Arc<dyn PredicateLanguage>>,
    default: String,
}

impl PredicateLanguages {
    /// Registry holding only the simple language
    pub fn new() -> Self {
        let simple: Arc<SimpleLanguage> = Arc::clone(&*SIMPLE);
        let mut languages: HashMap<String, Arc<dyn PredicateLanguage>> = HashMap::new();
        languages.insert(SIMPLE_LANGUAGE.to_string(), simple);
        Self {
            languages,
            default: SIMPLE_LANGUAGE.to_string(),
        }
    }

    pub fn register(&mut self, language: Arc<dyn PredicateLanguage>) {
        self.languages.insert(language.name().to_string(), language);
    }

    /// Select the language used when a clause names none
    pub fn set_default(&mut self, name: impl Into<String>) -> Result<(), DeployError> {
        let name = name.into();
        if !self.languages.contains_key(&name) {
            return Err(DeployError::UnknownLanguage(name));
        }
        self.default = name;
        Ok(())
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn PredicateLanguage>, DeployError> {
        let name = name.unwrap_or(&self.default);
        self.languages
            .get(name)
            .cloned()
            .ok_or_else(|| DeployError::UnknownLanguage(name.to_string()))
    }
}

impl Default for PredicateLanguages {
    fn default() -> Self {
        Self::new()
    }
}
