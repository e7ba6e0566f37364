//! The execution engine for running a parsed query against a generic `DataSourceNode`.

use crate::ast::{Query, Step};
use crate::datasource::DataSourceNode;
use crate::error::PathError;
use crate::functions::FunctionRegistry;
use crate::selectors;
use serde_json::Value;

/// Recursive descent gives up below this depth unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// A container for all state needed during query execution.
/// `'d` is the lifetime of the borrowed configuration.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'d> {
    pub functions: &'d FunctionRegistry,
    pub max_depth: usize,
}

impl<'d> EvaluationContext<'d> {
    pub fn new(functions: &'d FunctionRegistry) -> Self {
        Self {
            functions,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// One result of a query.
#[derive(Debug, Clone)]
pub enum Match<N> {
    /// A node of the source.
    Node(N),
    /// An array assembled by a slice; its elements are nodes of the source.
    Array(Vec<N>),
}

impl<'a, N: DataSourceNode<'a>> Match<N> {
    /// Decodes the match into an owned value.
    pub fn to_value(&self) -> Result<Value, PathError> {
        match self {
            Match::Node(node) => node.to_value(),
            Match::Array(nodes) => nodes
                .iter()
                .map(|n| n.to_value())
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }
}

// --- Internal Working Set ---

/// Every node the engine has visited during one execution, with parent links
/// stored as indices so `..` can walk back up without the source's help.
pub(crate) struct Arena<N> {
    visits: Vec<Visit<N>>,
}

struct Visit<N> {
    node: N,
    parent: Option<usize>,
}

impl<'a, N: DataSourceNode<'a>> Arena<N> {
    fn new() -> Self {
        Self { visits: Vec::new() }
    }

    pub(crate) fn push(&mut self, node: N, parent: Option<usize>) -> usize {
        self.visits.push(Visit { node, parent });
        self.visits.len() - 1
    }

    pub(crate) fn node(&self, id: usize) -> N {
        self.visits[id].node
    }

    pub(crate) fn parent(&self, id: usize) -> Option<usize> {
        self.visits[id].parent
    }
}

/// An entry in the candidate set between steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Candidate {
    Node(usize),
    /// The array produced by a slice. Name-based selectors see its members;
    /// index and slice reshape it as an array.
    Group(Vec<usize>),
}

// --- Main Public Executor ---

/// Runs `query` from `root`, returning matches in document order for
/// single-step selections and discovery order for recursive descent.
///
/// # Errors
///
/// Returns [`PathError::DepthLimitExceeded`] when recursive descent nests
/// deeper than `e_ctx.max_depth`.
pub fn execute<'a, N>(
    query: &Query,
    root: N,
    e_ctx: &EvaluationContext<'_>,
) -> Result<Vec<Match<N>>, PathError>
where
    N: DataSourceNode<'a>,
{
    let mut arena = Arena::new();
    let root_id = arena.push(root, None);
    let mut candidates = vec![Candidate::Node(root_id)];

    for (index, step) in query.steps.iter().enumerate() {
        candidates = execute_step(step, candidates, &mut arena, e_ctx)?;
        log::trace!(
            "Step {} ({:?}) produced {} candidate(s)",
            index,
            step.selector,
            candidates.len()
        );
        if candidates.is_empty() {
            break;
        }
    }

    Ok(candidates
        .into_iter()
        .map(|candidate| match candidate {
            Candidate::Node(id) => Match::Node(arena.node(id)),
            Candidate::Group(ids) => Match::Array(ids.into_iter().map(|id| arena.node(id)).collect()),
        })
        .collect())
}

/// Convenience wrapper returning decoded values.
pub fn select<'a, N>(
    query: &Query,
    root: N,
    e_ctx: &EvaluationContext<'_>,
) -> Result<Vec<Value>, PathError>
where
    N: DataSourceNode<'a>,
{
    execute(query, root, e_ctx)?
        .iter()
        .map(Match::to_value)
        .collect()
}

/// Applies the step's selector, then each of its predicates in order.
fn execute_step<'a, N>(
    step: &Step,
    candidates: Vec<Candidate>,
    arena: &mut Arena<N>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<Vec<Candidate>, PathError>
where
    N: DataSourceNode<'a>,
{
    let mut selected = selectors::apply_selector(&step.selector, candidates, arena, e_ctx)?;
    let fan_out = step.selector.is_fan_out();
    for predicate in &step.predicates {
        selected = selectors::apply_predicate(predicate, fan_out, selected, arena, e_ctx)?;
    }
    Ok(selected)
}
