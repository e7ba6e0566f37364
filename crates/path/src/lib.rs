//! An XPath-like path language for JSON.
//!
//! Path text is tokenized, parsed into an immutable [`Query`], and executed
//! against any [`DataSourceNode`]: a decoded `serde_json::Value` tree, or a
//! [`RawNode`] that scans unparsed bytes and decodes only what it returns.
//!
//! ```
//! use jsonxp_path::{EvaluationContext, FunctionRegistry, Query, select};
//! use serde_json::json;
//!
//! let data = json!({ "a": { "b": [1, 2, 3] } });
//! let query = Query::parse("/a/b[-1]").unwrap();
//! let funcs = FunctionRegistry::default();
//! let values = select(&query, &data, &EvaluationContext::new(&funcs)).unwrap();
//! assert_eq!(values, vec![json!(3)]);
//! ```

pub mod ast;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
mod parser;
pub mod selectors;

// --- Public API ---
pub use ast::{
    BinaryOperator, Expr, Literal, PathSegment, Predicate, Query, Selector, Step, UnaryOperator,
};
pub use datasource::{DataSourceNode, NodeKind, RawNode};
pub use engine::{DEFAULT_MAX_DEPTH, EvaluationContext, Match, execute, select};
pub use error::PathError;
pub use evaluator::Operand;
pub use functions::{FunctionRegistry, PathFunction};
pub use parser::{parse_filter, parse_query};
