//! Defines the registry and built-in implementations for filter functions.
use crate::ast::BinaryOperator;
use crate::evaluator::{Operand, compare};
use serde_json::Value;
use std::collections::HashMap;

/// The signature for a filter function implementation.
pub type PathFunction = fn(args: &[Operand]) -> Operand;

/// A registry to hold all available functions for the evaluation engine.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, PathFunction>,
}

impl FunctionRegistry {
    /// Creates a new, empty function registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registers a function, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, func: PathFunction) {
        self.functions.insert(name.to_lowercase(), func);
    }

    /// Finds a function by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&PathFunction> {
        self.functions.get(&name.to_lowercase())
    }
}

// --- Built-in Function Implementations ---

fn exists(args: &[Operand]) -> Operand {
    args.first().is_some_and(|arg| !arg.is_absent()).into()
}

fn includes(args: &[Operand]) -> Operand {
    let (Some(Operand::Value(Value::Array(items))), Some(needle)) = (args.first(), args.get(1))
    else {
        return false.into();
    };
    items
        .iter()
        .any(|item| compare(BinaryOperator::Equals, &Operand::Value(item.clone()), needle))
        .into()
}

fn length(args: &[Operand]) -> Operand {
    let len = match args.first() {
        Some(Operand::Value(Value::Array(items))) => items.len(),
        Some(Operand::Value(Value::Object(map))) => map.len(),
        Some(operand) => match operand.as_str() {
            Some(s) => s.chars().count(),
            None => return Operand::Absent,
        },
        None => return Operand::Absent,
    };
    Operand::Value(Value::from(len))
}

fn contains(args: &[Operand]) -> Operand {
    let haystack = args.first().and_then(Operand::as_str);
    let needle = args.get(1).and_then(Operand::as_str);
    match (haystack, needle) {
        (Some(h), Some(n)) => h.contains(n).into(),
        _ => false.into(),
    }
}

impl Default for FunctionRegistry {
    /// Creates a registry populated with the built-in functions.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("exists", exists);
        registry.register("includes", includes);
        registry.register("length", length);
        registry.register("contains", contains);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;
    use serde_json::json;

    fn call(name: &str, args: &[Operand]) -> Operand {
        let registry = FunctionRegistry::default();
        let func = registry.get(name).unwrap();
        func(args)
    }

    fn string(s: &str) -> Operand {
        Operand::Literal(Literal::String(s.to_string()))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::default();
        assert!(registry.get("EXISTS").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_exists() {
        assert_eq!(call("exists", &[Operand::Value(json!(null))]), Operand::from(true));
        assert_eq!(call("exists", &[Operand::Absent]), Operand::from(false));
    }

    #[test]
    fn test_includes() {
        let tags = Operand::Value(json!(["red", 2, true]));
        assert_eq!(call("includes", &[tags.clone(), string("red")]), Operand::from(true));
        assert_eq!(
            call("includes", &[tags.clone(), Operand::Literal(Literal::Number(2.0))]),
            Operand::from(true)
        );
        assert_eq!(call("includes", &[tags, string("blue")]), Operand::from(false));
        assert_eq!(
            call("includes", &[Operand::Value(json!("red")), string("red")]),
            Operand::from(false)
        );
    }

    #[test]
    fn test_length() {
        assert_eq!(
            call("length", &[Operand::Value(json!([1, 2, 3]))]),
            Operand::Value(json!(3))
        );
        assert_eq!(
            call("length", &[Operand::Value(json!("héllo"))]),
            Operand::Value(json!(5))
        );
        assert_eq!(call("length", &[Operand::Value(json!(7))]), Operand::Absent);
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            call("contains", &[Operand::Value(json!("hello")), string("ell")]),
            Operand::from(true)
        );
        assert_eq!(
            call("contains", &[Operand::Value(json!(12)), string("1")]),
            Operand::from(false)
        );
    }

    #[test]
    fn test_custom_function() {
        fn always(_: &[Operand]) -> Operand {
            true.into()
        }
        let mut registry = FunctionRegistry::new();
        registry.register("Always", always);
        let func = registry.get("always").unwrap();
        assert_eq!(func(&[]), Operand::from(true));
    }
}
