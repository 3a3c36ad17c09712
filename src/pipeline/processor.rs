// SPDX-License-Identifier: MIT

//! Host capability traits
//!
//! The engine never knows what a step does. The host supplies processors for
//! step bindings and predicate languages for choice expressions.

use async_trait::async_trait;
use std::sync::Arc;

use super::message::Message;
use crate::error::{BoxError, PredicateError};
use crate::flow::descriptor::StepDescriptor;

/// Runnable unit bound to a step node
#[async_trait]
pub trait Processor: Send + Sync {
    /// Returns the processor name
    fn name(&self) -> &str;

    /// Process the message in place
    async fn process(&self, message: &mut Message) -> Result<(), BoxError>;
}

/// Builds processors from step descriptors
pub trait StepFactory: Send + Sync {
    fn create(&self, descriptor: &StepDescriptor) -> Result<Arc<dyn Processor>, BoxError>;
}

/// A compiled boolean test over a message
pub trait Predicate: Send + Sync {
    fn matches(&self, message: &Message) -> Result<bool, PredicateError>;
}

/// Compiles expression text into predicates
pub trait PredicateLanguage: Send + Sync {
    /// Name used by descriptors to select this language
    fn name(&self) -> &str;

    fn compile(&self, expression: &str) -> Result<Arc<dyn Predicate>, PredicateError>;
}

impl<F> Predicate for F
where
    F: Fn(&Message) -> Result<bool, PredicateError> + Send + Sync,
{
    fn matches(&self, message: &Message) -> Result<bool, PredicateError> {
        self(message)
    }
}
