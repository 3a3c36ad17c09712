//! Predicate expression evaluator

use super::ast::{CompareOp, Expression, Literal};
use crate::error::PredicateError;
use crate::pipeline::Message;
use serde_json::Value;

/// Evaluate a predicate expression against a message
pub fn evaluate(expr: &Expression, message: &Message) -> Result<bool, PredicateError> {
    match expr {
        Expression::True => Ok(true),
        Expression::False => Ok(false),
        Expression::Compare { path, op, right } => {
            evaluate_compare(path, *op, right, message.resolve_path(path))
        }
        Expression::And(left, right) => Ok(evaluate(left, message)? && evaluate(right, message)?),
        Expression::Or(left, right) => Ok(evaluate(left, message)? || evaluate(right, message)?),
        Expression::Not(inner) => Ok(!evaluate(inner, message)?),
    }
}

fn evaluate_compare(
    path: &str,
    op: CompareOp,
    right: &Literal,
    left: Option<&Value>,
) -> Result<bool, PredicateError> {
    match op {
        CompareOp::Eq => Ok(values_equal(left, right)),
        CompareOp::NotEq => Ok(!values_equal(left, right)),
        CompareOp::Contains => Ok(check_contains(left, right)),
        CompareOp::Gt => compare_numbers(path, op, left, right, |a, b| a > b),
        CompareOp::Gte => compare_numbers(path, op, left, right, |a, b| a >= b),
        CompareOp::Lt => compare_numbers(path, op, left, right, |a, b| a < b),
        CompareOp::Lte => compare_numbers(path, op, left, right, |a, b| a <= b),
    }
}

fn values_equal(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (None, Literal::Null) => true,
        (None, _) => false,
        (Some(Value::Null), Literal::Null) => true,
        (Some(Value::String(s)), Literal::String(rs)) => s == rs,
        (Some(Value::Number(n)), Literal::Number(rn)) => n
            .as_f64()
            .map(|f| (f - rn).abs() < f64::EPSILON)
            .unwrap_or(false),
        (Some(Value::Bool(b)), Literal::Boolean(rb)) => b == rb,
        _ => false,
    }
}

/// Missing or null operands never match; any other non-number is an error
fn compare_numbers<F>(
    path: &str,
    op: CompareOp,
    left: Option<&Value>,
    right: &Literal,
    cmp: F,
) -> Result<bool, PredicateError>
where
    F: Fn(f64, f64) -> bool,
{
    let mismatch = |found: String| PredicateError::TypeMismatch {
        path: path.to_string(),
        op: op.to_string(),
        expected: right.to_string(),
        found,
    };

    let rn = match right {
        Literal::Number(rn) => *rn,
        other => return Err(mismatch(format!("non-numeric literal {}", other))),
    };
    match left {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Number(n)) => Ok(n.as_f64().map(|f| cmp(f, rn)).unwrap_or(false)),
        Some(other) => Err(mismatch(other.to_string())),
    }
}

fn check_contains(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        // String contains substring
        (Some(Value::String(s)), Literal::String(substr)) => s.contains(substr.as_str()),
        // Array contains value
        (Some(Value::Array(arr)), Literal::String(val)) => {
            arr.iter().any(|v| v.as_str() == Some(val.as_str()))
        }
        (Some(Value::Array(arr)), Literal::Number(val)) => arr.iter().any(|v| {
            v.as_f64()
                .map(|f| (f - val).abs() < f64::EPSILON)
                .unwrap_or(false)
        }),
        (Some(Value::Array(arr)), Literal::Boolean(val)) => {
            arr.iter().any(|v| v.as_bool() == Some(*val))
        }
        // Object has key
        (Some(Value::Object(obj)), Literal::String(key)) => obj.contains_key(key),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::condition::parser::parse;
    use serde_json::json;

    fn eval(expr: &str, message: &Message) -> bool {
        evaluate(&parse(expr).unwrap(), message).unwrap()
    }

    #[test]
    fn test_string_equality() {
        let message = Message::new(json!({"intent": "search"}));
        assert!(eval("intent == 'search'", &message));
        assert!(!eval("intent == 'code'", &message));
        assert!(eval("intent != 'code'", &message));
    }

    #[test]
    fn test_number_comparison() {
        let message = Message::new(json!({"score": 7.5}));

        assert!(eval("score > 5", &message));
        assert!(!eval("score > 10", &message));
        assert!(eval("score >= 7.5", &message));
        assert!(!eval("score >= 8", &message));
        assert!(eval("score < 10", &message));
        assert!(!eval("score < 5", &message));
        assert!(eval("score <= 7.5", &message));
        assert!(!eval("score <= 7", &message));
    }

    #[test]
    fn test_boolean_comparison() {
        let message = Message::new(json!({"is_draft": true}));
        assert!(eval("is_draft == true", &message));
        assert!(!eval("is_draft == false", &message));
    }

    #[test]
    fn test_null_and_missing() {
        let message = Message::new(json!({"result": null}));

        assert!(eval("result == null", &message));
        assert!(!eval("result != null", &message));
        assert!(eval("nonexistent == null", &message));
        assert!(!eval("nonexistent == 'value'", &message));
        assert!(!eval("nonexistent > 3", &message));
        assert!(!eval("result < 3", &message));
    }

    #[test]
    fn test_ordering_against_text_is_an_error() {
        let message = Message::new(json!({"x": "ten"}));
        let err = evaluate(&parse("x > 5").unwrap(), &message).unwrap_err();
        assert!(matches!(err, PredicateError::TypeMismatch { ref path, .. } if path == "x"));

        let message = Message::new(json!({"x": 10}));
        assert!(evaluate(&parse("x > 'five'").unwrap(), &message).is_err());
    }

    #[test]
    fn test_contains() {
        let message = Message::new(json!({
            "message": "hello world",
            "tags": ["bug", "urgent"],
            "meta": {"owner": "ops"}
        }));

        assert!(eval("message contains 'world'", &message));
        assert!(!eval("message contains 'foo'", &message));
        assert!(eval("tags contains 'urgent'", &message));
        assert!(!eval("tags contains 'frontend'", &message));
        assert!(eval("meta contains 'owner'", &message));
    }

    #[test]
    fn test_logical_operators() {
        let message = Message::new(json!({"type": "feature", "priority": 5}));

        assert!(eval("type == 'bug' or priority > 3", &message));
        assert!(!eval("type == 'bug' or priority > 10", &message));
        assert!(eval("type == 'feature' and priority > 3", &message));
        assert!(eval("not type == 'bug'", &message));
    }

    #[test]
    fn test_and_short_circuits_before_error() {
        let message = Message::new(json!({"x": "text"}));
        assert!(!eval("false and x > 1", &message));
    }

    #[test]
    fn test_header_and_nested_paths() {
        let message = Message::new(json!({"result": {"data": {"intent": "search"}}}))
            .with_header("region", json!("eu"));

        assert!(eval("result.data.intent == 'search'", &message));
        assert!(eval("headers.region == 'eu'", &message));
        assert!(!eval("headers.region == 'us'", &message));
    }
}
