//! Defines the Abstract Syntax Tree (AST) for path expressions.

use crate::error::PathError;
use std::str::FromStr;

/// A parsed path expression. Immutable once built and safe to share between
/// threads and executions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub steps: Vec<Step>,
}

impl Query {
    /// Parses path text into a query.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        crate::parser::parse_query(text)
    }

    /// True for the empty path (`""`, `"/"`, `"$"`), which selects the whole document.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// True if every step is a plain field or index descent, so the query can
    /// be answered without decoding anything besides the target.
    pub fn is_direct(&self) -> bool {
        self.steps.iter().all(Step::is_direct)
    }

    /// Flattens a direct query into key/index segments. Returns `None` if any
    /// step fans out, filters, or navigates upwards.
    pub fn direct_segments(&self) -> Option<Vec<PathSegment>> {
        let mut segments = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match &step.selector {
                Selector::Field(name) => segments.push(PathSegment::Key(name.clone())),
                Selector::Index(i) => segments.push(PathSegment::Index(*i)),
                _ => return None,
            }
            for predicate in &step.predicates {
                match predicate {
                    Predicate::Index(i) => segments.push(PathSegment::Index(*i)),
                    _ => return None,
                }
            }
        }
        Some(segments)
    }
}

impl FromStr for Query {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::parse(s)
    }
}

/// One segment of a parsed path: a selector plus its predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub selector: Selector,
    pub predicates: Vec<Predicate>,
}

impl Step {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            predicates: Vec::new(),
        }
    }

    fn is_direct(&self) -> bool {
        matches!(self.selector, Selector::Field(_) | Selector::Index(_))
            && self
                .predicates
                .iter()
                .all(|p| matches!(p, Predicate::Index(_)))
    }
}

/// Chooses the candidates a step produces from its input.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// An object member by name (`/name`, `.name`, `['name']`).
    Field(String),
    /// An array element; negative values count from the end (`[n]`).
    Index(i64),
    /// A sub-array with optional, possibly negative bounds (`[a:b]`).
    Slice { start: Option<i64>, end: Option<i64> },
    /// All members or elements (`*`, `[*]`).
    Wildcard,
    /// Every member with this name at any depth (`..name`, `//name`).
    Recursive(String),
    /// The parent of the candidate (`/..`).
    Parent,
    /// The candidate itself; used for steps that begin with a bracket.
    Current,
}

impl Selector {
    /// Selectors that turn one candidate into many.
    pub fn is_fan_out(&self) -> bool {
        matches!(
            self,
            Selector::Wildcard | Selector::Recursive(_) | Selector::Slice { .. }
        )
    }
}

/// A bracketed refinement attached to a step.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Index(i64),
    Slice { start: Option<i64>, end: Option<i64> },
    Filter(Expr),
}

/// A segment of a direct path or of a field reference inside a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(i64),
}

/// A filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A sub-path relative to the candidate (`@`, `@.a.b`, `@.items[0]`).
    FieldRef(Vec<PathSegment>),
    /// A call to a function in the evaluation context's registry.
    Call { name: String, args: Vec<Expr> },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl BinaryOperator {
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::Or | BinaryOperator::And)
    }
}
