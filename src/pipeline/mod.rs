// SPDX-License-Identifier: MIT

//! Host pipeline layer
//!
//! This module provides the capabilities the engine consumes from its host:
//! - `Message` - the per-invocation envelope
//! - `Processor` / `StepFactory` - runnable step stages
//! - `Predicate` / `PredicateLanguage` - choice expressions

pub mod message;
pub mod processor;
pub mod trace;

pub use message::{Message, CHOICE_MATCH_KEY, MATCH_DELIMITER};
pub use processor::{Predicate, PredicateLanguage, Processor, StepFactory};
