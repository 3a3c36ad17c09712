// SPDX-License-Identifier: MIT

//! Predicate language for choice stages
//!
//! This module provides parsing and evaluation of when-clause expressions.
//! Expressions are simple comparisons against message paths like:
//! - `intent == 'search'`
//! - `headers.confidence > 0.8`
//! - `intent == 'bug' and priority > 3`

mod ast;
mod evaluator;
mod language;
mod parser;

pub use ast::{CompareOp, Expression, Literal};
pub use evaluator::evaluate;
pub use language::{
    PredicateLanguages, SimpleLanguage, SimplePredicate, SIMPLE_LANGUAGE,
};
pub use parser::parse;
