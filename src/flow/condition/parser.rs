//! Simple predicate expression parser
//!
//! Parses expressions like:
//! - `field == 'value'`
//! - `headers.score > 0.8`
//! - `a == 'x' and (b > 5 or not c == true)`
//!
//! `or` binds looser than `and`, which binds looser than `not`.

use super::ast::{CompareOp, Expression, Literal};
use crate::error::PredicateError;

/// Parse a predicate expression string into an AST
pub fn parse(input: &str) -> Result<Expression, PredicateError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PredicateError::parse("condition", input));
    }

    if let Some(inner) = strip_parens(input) {
        return parse(inner);
    }

    // Handle special cases
    if input == "true" {
        return Ok(Expression::True);
    }
    if input == "false" {
        return Ok(Expression::False);
    }

    if let Some((left, right)) = split_top_level(input, " or ") {
        let left = Box::new(parse(left)?);
        let right = Box::new(parse(right)?);
        return Ok(Expression::Or(left, right));
    }
    if let Some((left, right)) = split_top_level(input, " and ") {
        let left = Box::new(parse(left)?);
        let right = Box::new(parse(right)?);
        return Ok(Expression::And(left, right));
    }
    if let Some(rest) = input.strip_prefix("not ") {
        return Ok(Expression::Not(Box::new(parse(rest)?)));
    }

    // Parse as simple comparison
    parse_comparison(input)
}

/// Strip one pair of parentheses wrapping the whole input
fn strip_parens(input: &str) -> Option<&str> {
    if !input.starts_with('(') || !input.ends_with(')') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    // The opening paren closes before the end: `(a) and (b)`
                    return (i == input.len() - 1).then(|| &input[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find `needle` outside quotes and parentheses and split around it
fn split_top_level<'a>(input: &'a str, needle: &str) -> Option<(&'a str, &'a str)> {
    let pos = find_top_level(input, needle)?;
    Some((&input[..pos], &input[pos + needle.len()..]))
}

fn find_top_level(input: &str, needle: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) if depth == 0 && input[i..].starts_with(needle) => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_comparison(input: &str) -> Result<Expression, PredicateError> {
    // Try operators in order of length (longest first)
    let operators = [
        ("!=", CompareOp::NotEq),
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        ("==", CompareOp::Eq),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        (" contains ", CompareOp::Contains),
    ];

    for (op_str, op) in operators {
        if let Some(pos) = find_top_level(input, op_str) {
            let path = input[..pos].trim();
            if path.is_empty() || path.contains(char::is_whitespace) {
                return Err(PredicateError::parse("path", path));
            }
            let right = parse_literal(&input[pos + op_str.len()..])?;
            return Ok(Expression::Compare {
                path: path.to_string(),
                op,
                right,
            });
        }
    }

    Err(PredicateError::parse("condition", input))
}

fn parse_literal(input: &str) -> Result<Literal, PredicateError> {
    let input = input.trim();

    // Null
    if input == "null" {
        return Ok(Literal::Null);
    }

    // Boolean
    if input == "true" {
        return Ok(Literal::Boolean(true));
    }
    if input == "false" {
        return Ok(Literal::Boolean(false));
    }

    // String (single or double quotes)
    if input.len() >= 2
        && ((input.starts_with('\'') && input.ends_with('\''))
            || (input.starts_with('"') && input.ends_with('"')))
    {
        let s = &input[1..input.len() - 1];
        return Ok(Literal::String(s.to_string()));
    }

    // Number
    if let Ok(n) = input.parse::<f64>() {
        return Ok(Literal::Number(n));
    }

    Err(PredicateError::parse("literal", input))
}
