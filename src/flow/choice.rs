// SPDX-License-Identifier: MIT

//! Choice stage
//!
//! Evaluates when-clauses in declared order and writes the successor key of
//! the first match (or the otherwise key) to the message's choice match
//! property. The engine reads that property to pick the next nodes.

use std::fmt;
use std::sync::Arc;

use crate::error::ExchangeError;
use crate::pipeline::{Message, Predicate};

/// One compiled when-clause
#[derive(Clone)]
pub struct ChoiceClause {
    /// Namespaced successor ids joined by the match delimiter
    pub key: String,
    /// Authored branch label
    pub label: String,
    pub predicate: Arc<dyn Predicate>,
}

impl fmt::Debug for ChoiceClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoiceClause")
            .field("key", &self.key)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Runtime unit bound to a choice node
#[derive(Debug, Clone)]
pub struct ChoiceStage {
    id: String,
    clauses: Vec<ChoiceClause>,
    otherwise: Option<String>,
}

impl ChoiceStage {
    pub fn new(
        id: impl Into<String>,
        clauses: Vec<ChoiceClause>,
        otherwise: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            clauses,
            otherwise,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn clauses(&self) -> &[ChoiceClause] {
        &self.clauses
    }

    pub fn otherwise(&self) -> Option<&str> {
        self.otherwise.as_deref()
    }

    /// Decide the branch for this message.
    ///
    /// Any previous choice match is cleared first. The first clause whose
    /// predicate holds wins; with no match the otherwise key is used. A
    /// predicate error stops evaluation of every remaining clause, skips the
    /// otherwise fallback and is recorded on the message. Returns `false`
    /// in that case.
    pub fn process(&self, message: &mut Message) -> bool {
        message.clear_choice_match();

        let mut selected: Option<&str> = None;
        for clause in &self.clauses {
            match clause.predicate.matches(message) {
                Ok(true) => {
                    selected = Some(&clause.key);
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    log::warn!(
                        "[{}] choice '{}' branch '{}' failed: {}",
                        message.id(),
                        self.id,
                        clause.label,
                        e
                    );
                    message.set_error(ExchangeError::Predicate {
                        stage_id: self.id.clone(),
                        branch: clause.label.clone(),
                        source: e,
                    });
                    return false;
                }
            }
        }

        match selected.or(self.otherwise.as_deref()) {
            Some(key) => {
                log::debug!("[{}] choice '{}' selected {}", message.id(), self.id, key);
                message.set_choice_match(key);
            }
            None => log::debug!(
                "[{}] choice '{}' matched nothing, path ends",
                message.id(),
                self.id
            ),
        }
        true
    }
}
