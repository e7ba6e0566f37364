//! Evaluates filter expressions against a single candidate node.
//!
//! Missing fields resolve to [`Operand::Absent`], and a comparison between
//! incompatible types is simply false. The only error is a referenced node
//! whose source does not decode.

use crate::ast::{BinaryOperator, Expr, Literal, PathSegment, UnaryOperator};
use crate::datasource::DataSourceNode;
use crate::engine::EvaluationContext;
use crate::error::PathError;
use serde_json::Value;
use std::cmp::Ordering;

/// The result of resolving one side of a comparison or a function argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A field reference that did not resolve, or a function with no answer.
    Absent,
    Literal(Literal),
    /// A resolved field, decoded.
    Value(Value),
}

impl Operand {
    pub fn is_absent(&self) -> bool {
        matches!(self, Operand::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Literal(Literal::String(s)) => Some(s),
            Operand::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Coerces with the boolean rule: numbers are true when nonzero, strings
    /// only when they read exactly `"true"`, everything else is false.
    pub fn to_bool(&self) -> bool {
        match self {
            Operand::Absent => false,
            Operand::Literal(literal) => literal_truth(literal),
            Operand::Value(value) => value_as_bool(value).unwrap_or(false),
        }
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Literal(Literal::Bool(b))
    }
}

/// Evaluates `expr` as a predicate for `candidate`.
pub fn evaluate<'a, N>(
    expr: &Expr,
    candidate: N,
    e_ctx: &EvaluationContext<'_>,
) -> Result<bool, PathError>
where
    N: DataSourceNode<'a>,
{
    let passes = match expr {
        Expr::Binary { op, left, right } => match op {
            BinaryOperator::And => {
                evaluate(left, candidate, e_ctx)? && evaluate(right, candidate, e_ctx)?
            }
            BinaryOperator::Or => {
                evaluate(left, candidate, e_ctx)? || evaluate(right, candidate, e_ctx)?
            }
            _ => {
                let l = resolve(left, candidate, e_ctx)?;
                let r = resolve(right, candidate, e_ctx)?;
                compare(*op, &l, &r)
            }
        },
        Expr::Unary {
            op: UnaryOperator::Not,
            operand,
        } => !evaluate(operand, candidate, e_ctx)?,
        Expr::FieldRef(segments) => resolve_ref(candidate, segments).is_some(),
        Expr::Literal(literal) => literal_truth(literal),
        Expr::Call { .. } => resolve(expr, candidate, e_ctx)?.to_bool(),
    };
    Ok(passes)
}

/// Resolves an expression to an operand without applying truth coercion.
pub fn resolve<'a, N>(
    expr: &Expr,
    candidate: N,
    e_ctx: &EvaluationContext<'_>,
) -> Result<Operand, PathError>
where
    N: DataSourceNode<'a>,
{
    let operand = match expr {
        Expr::Literal(literal) => Operand::Literal(literal.clone()),
        Expr::FieldRef(segments) => match resolve_ref(candidate, segments) {
            Some(node) => Operand::Value(node.to_value()?),
            None => Operand::Absent,
        },
        Expr::Call { name, args } => match e_ctx.functions.get(name) {
            Some(func) => {
                let args = args
                    .iter()
                    .map(|arg| resolve(arg, candidate, e_ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                func(&args)
            }
            None => {
                log::warn!("Unknown filter function '{}'; treating it as absent", name);
                Operand::Absent
            }
        },
        Expr::Binary { .. } | Expr::Unary { .. } => evaluate(expr, candidate, e_ctx)?.into(),
    };
    Ok(operand)
}

/// Walks a `@`-relative sub-path. Negative indices count from the end.
pub fn resolve_ref<'a, N>(candidate: N, segments: &[PathSegment]) -> Option<N>
where
    N: DataSourceNode<'a>,
{
    segments.iter().try_fold(candidate, |node, segment| match segment {
        PathSegment::Key(name) => node.field(name),
        PathSegment::Index(i) => {
            let len = node.len();
            let index = if *i < 0 { len as i64 + i } else { *i };
            usize::try_from(index).ok().and_then(|idx| node.element(idx))
        }
    })
}

// --- Comparisons ---

/// Compares two operands. Symmetric: a literal on the left is handled by
/// flipping the operator.
pub fn compare(op: BinaryOperator, left: &Operand, right: &Operand) -> bool {
    match (left, right) {
        (Operand::Literal(lit), Operand::Literal(other)) => {
            compare_with_literal(op, &Operand::Value(literal_to_value(lit)), other)
        }
        (_, Operand::Literal(lit)) => compare_with_literal(op, left, lit),
        (Operand::Literal(lit), _) => compare_with_literal(flip(op), right, lit),
        (Operand::Value(a), Operand::Value(b)) => compare_values(op, a, b),
        (Operand::Absent, Operand::Value(b)) => match value_to_literal(b) {
            Some(lit) => compare_with_literal(op, left, &lit),
            None => false,
        },
        (Operand::Value(_), Operand::Absent) => compare(flip(op), right, left),
        (Operand::Absent, Operand::Absent) => compare_with_literal(op, left, &Literal::Null),
    }
}

fn compare_values(op: BinaryOperator, a: &Value, b: &Value) -> bool {
    if a.is_array() || a.is_object() || b.is_array() || b.is_object() {
        return match op {
            BinaryOperator::Equals => a == b,
            BinaryOperator::NotEquals => a != b,
            _ => false,
        };
    }
    match value_to_literal(b) {
        Some(lit) => compare_with_literal(op, &Operand::Value(a.clone()), &lit),
        None => false,
    }
}

/// Compares a resolved candidate (never a literal) against a literal.
fn compare_with_literal(op: BinaryOperator, candidate: &Operand, literal: &Literal) -> bool {
    let value = match candidate {
        Operand::Value(value) => Some(value),
        _ => None,
    };

    match literal {
        Literal::Null => {
            let is_null = value.is_none_or(Value::is_null);
            match op {
                BinaryOperator::Equals => is_null,
                BinaryOperator::NotEquals => !is_null,
                _ => false,
            }
        }
        Literal::Bool(expected) => {
            let Some(actual) = value.and_then(value_as_bool) else {
                return false;
            };
            match op {
                BinaryOperator::Equals => actual == *expected,
                BinaryOperator::NotEquals => actual != *expected,
                _ => false,
            }
        }
        Literal::String(expected) => match value {
            Some(Value::String(actual)) => ordering_holds(op, actual.as_str().cmp(expected)),
            _ => false,
        },
        Literal::Number(expected) => {
            let Some(actual) = value.and_then(value_as_number) else {
                return false;
            };
            actual
                .partial_cmp(expected)
                .is_some_and(|ordering| ordering_holds(op, ordering))
        }
    }
}

fn ordering_holds(op: BinaryOperator, ordering: Ordering) -> bool {
    match op {
        BinaryOperator::Equals => ordering == Ordering::Equal,
        BinaryOperator::NotEquals => ordering != Ordering::Equal,
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        BinaryOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        BinaryOperator::And | BinaryOperator::Or => false,
    }
}

fn flip(op: BinaryOperator) -> BinaryOperator {
    match op {
        BinaryOperator::LessThan => BinaryOperator::GreaterThan,
        BinaryOperator::LessThanOrEqual => BinaryOperator::GreaterThanOrEqual,
        BinaryOperator::GreaterThan => BinaryOperator::LessThan,
        BinaryOperator::GreaterThanOrEqual => BinaryOperator::LessThanOrEqual,
        other => other,
    }
}

// --- Coercion Helpers ---

/// Strict boolean view of a value: booleans, numbers (nonzero is true), and
/// the exact strings `"true"` / `"false"`.
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Numeric view of a value: numbers, and strings that parse as a finite number.
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn literal_truth(literal: &Literal) -> bool {
    match literal {
        Literal::Null => false,
        Literal::Bool(b) => *b,
        Literal::Number(n) => *n != 0.0,
        Literal::String(s) => s == "true",
    }
}

fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Literal::String(s) => Value::String(s.clone()),
    }
}

fn value_to_literal(value: &Value) -> Option<Literal> {
    match value {
        Value::Null => Some(Literal::Null),
        Value::Bool(b) => Some(Literal::Bool(*b)),
        Value::Number(n) => n.as_f64().map(Literal::Number),
        Value::String(s) => Some(Literal::String(s.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;
    use crate::parser::parse_filter;
    use serde_json::json;

    fn check(filter: &str, data: &Value) -> bool {
        let funcs = FunctionRegistry::default();
        let e_ctx = EvaluationContext::new(&funcs);
        let expr = parse_filter(filter).unwrap();
        evaluate(&expr, data, &e_ctx).unwrap()
    }

    #[test]
    fn test_numeric_comparisons() {
        let item = json!({ "price": 8.95, "qty": "12", "name": "pen", "padded": " 12 " });
        assert!(check("@.price < 10", &item));
        assert!(check("@.price >= 8.95", &item));
        assert!(!check("@.price > 10", &item));
        assert!(check("@.qty == 12", &item));
        assert!(check("@.qty > 3", &item));
        assert!(!check("@.name > 3", &item));
        assert!(!check("@.name != 3", &item));
        assert!(!check("@.padded == 12", &item));
        assert!(!check("@.padded > 3", &item));
    }

    #[test]
    fn test_literal_first_flips_ordering() {
        let item = json!({ "price": 8 });
        assert!(check("10 > @.price", &item));
        assert!(!check("10 < @.price", &item));
        assert!(check("8 <= @.price", &item));
    }

    #[test]
    fn test_string_comparisons_are_type_strict() {
        let item = json!({ "s": "abc", "n": 5 });
        assert!(check("@.s == 'abc'", &item));
        assert!(check("@.s < 'abd'", &item));
        assert!(!check("@.n == '5'", &item));
        assert!(!check("@.n != '5'", &item));
    }

    #[test]
    fn test_boolean_coercion() {
        let item = json!({ "b": true, "one": 1, "zero": 0, "ts": "true", "yes": "yes" });
        assert!(check("@.b == true", &item));
        assert!(check("@.one == true", &item));
        assert!(check("@.zero == false", &item));
        assert!(check("@.ts == true", &item));
        assert!(!check("@.yes == true", &item));
        assert!(!check("@.yes != true", &item));
        assert!(!check("@.b > false", &item));
    }

    #[test]
    fn test_absent_and_null() {
        let item = json!({ "n": null, "v": 1 });
        assert!(check("@.missing == null", &item));
        assert!(!check("@.missing != null", &item));
        assert!(check("@.n == null", &item));
        assert!(check("@.v != null", &item));
        assert!(!check("@.missing == 1", &item));
        assert!(!check("@.missing != 1", &item));
        assert!(!check("@.missing < 1", &item));
    }

    #[test]
    fn test_existence_and_logic() {
        let item = json!({ "a": null, "b": 2 });
        assert!(check("@.a", &item));
        assert!(!check("@.c", &item));
        assert!(check("!@.c", &item));
        assert!(check("@.c || @.b == 2", &item));
        assert!(!check("@.c && @.b == 2", &item));
        assert!(check("!(@.b == 3)", &item));
    }

    #[test]
    fn test_field_vs_field() {
        let item = json!({ "a": 3, "b": "3", "c": [1, 2], "d": [1, 2], "e": 4 });
        // The right-hand value decides the comparison kind.
        assert!(!check("@.a == @.b", &item));
        assert!(check("@.b == @.a", &item));
        assert!(check("@.a < @.e", &item));
        assert!(check("@.c == @.d", &item));
        assert!(!check("@.c < @.d", &item));
        assert!(!check("@.c == @.a", &item));
    }

    #[test]
    fn test_indexed_field_refs() {
        let item = json!({ "tags": ["x", "y"] });
        assert!(check("@.tags[0] == 'x'", &item));
        assert!(check("@.tags[-1] == 'y'", &item));
        assert!(!check("@.tags[5]", &item));
    }

    #[test]
    fn test_unknown_function_is_absent() {
        let item = json!({ "a": 1 });
        assert!(!check("nosuch(@.a)", &item));
        assert!(check("nosuch(@.a) == null", &item));
    }

    #[test]
    fn test_comparisons_on_raw_source() {
        let source = br#"{ "price": 4, "tags": ["a", "b"] }"#;
        let node = crate::datasource::RawNode::root(source).unwrap();
        let funcs = FunctionRegistry::default();
        let e_ctx = EvaluationContext::new(&funcs);
        let expr = parse_filter("@.price < 5 && @.tags[1] == 'b'").unwrap();
        assert!(evaluate(&expr, node, &e_ctx).unwrap());
    }

    #[test]
    fn test_undecodable_field_is_an_error() {
        let source = br#"{ "big": 1e400, "ok": 1 }"#;
        let node = crate::datasource::RawNode::root(source).unwrap();
        let funcs = FunctionRegistry::default();
        let e_ctx = EvaluationContext::new(&funcs);
        let expr = parse_filter("@.big > 0").unwrap();
        assert!(matches!(
            evaluate(&expr, node, &e_ctx),
            Err(PathError::Decode(_))
        ));
        let expr = parse_filter("@.ok == 1").unwrap();
        assert!(evaluate(&expr, node, &e_ctx).unwrap());
    }
}
