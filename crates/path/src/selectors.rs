//! Per-selector and per-predicate candidate transformations.

use crate::ast::{Predicate, Selector};
use crate::datasource::{DataSourceNode, NodeKind};
use crate::engine::{Arena, Candidate, EvaluationContext};
use crate::error::PathError;
use crate::evaluator;
use std::collections::HashSet;
use std::ops::Range;

// --- Index Arithmetic ---

/// Resolves a possibly negative index against `len`. Out of range is `None`.
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Resolves possibly negative slice bounds against `len`, clamped to
/// `[0, len]`. An inverted range comes back empty.
pub fn resolve_slice(start: Option<i64>, end: Option<i64>, len: usize) -> Range<usize> {
    let clamp = |bound: i64| -> usize {
        let resolved = if bound < 0 { len as i64 + bound } else { bound };
        resolved.clamp(0, len as i64) as usize
    };
    let start = start.map_or(0, clamp);
    let end = end.map_or(len, clamp);
    start..end.max(start)
}

// --- Selectors ---

pub(crate) fn apply_selector<'a, N>(
    selector: &Selector,
    candidates: Vec<Candidate>,
    arena: &mut Arena<N>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<Vec<Candidate>, PathError>
where
    N: DataSourceNode<'a>,
{
    let mut out = Vec::new();
    match selector {
        Selector::Current => return Ok(candidates),
        Selector::Index(index) => {
            for candidate in candidates {
                out.extend(index_candidate(&candidate, *index, arena));
            }
        }
        Selector::Slice { start, end } => {
            for candidate in candidates {
                out.extend(slice_candidate(&candidate, *start, *end, arena));
            }
        }
        Selector::Field(name) => {
            for id in flatten(candidates) {
                if let Some(child) = field_of(arena.node(id), name) {
                    out.push(Candidate::Node(arena.push(child, Some(id))));
                }
            }
        }
        Selector::Wildcard => {
            for id in flatten(candidates) {
                let node = arena.node(id);
                for child in node.children() {
                    out.push(Candidate::Node(arena.push(child, Some(id))));
                }
            }
        }
        Selector::Recursive(name) => {
            let mut seen = HashSet::new();
            for id in flatten(candidates) {
                descend(id, name, 0, arena, e_ctx, &mut seen, &mut out)?;
            }
        }
        Selector::Parent => {
            let mut seen = HashSet::new();
            for id in flatten(candidates) {
                if let Some(parent) = arena.parent(id)
                    && seen.insert(arena.node(parent).identity())
                {
                    out.push(Candidate::Node(parent));
                }
            }
        }
    }
    Ok(out)
}

/// Object member by name; on arrays a non-negative integer name selects an element.
fn field_of<'a, N: DataSourceNode<'a>>(node: N, name: &str) -> Option<N> {
    match node.kind() {
        NodeKind::Object => node.field(name),
        NodeKind::Array => name.parse::<usize>().ok().and_then(|i| node.element(i)),
        _ => None,
    }
}

/// Depth-first pre-order search for members called `name` below `id`.
fn descend<'a, N>(
    id: usize,
    name: &str,
    depth: usize,
    arena: &mut Arena<N>,
    e_ctx: &EvaluationContext<'_>,
    seen: &mut HashSet<usize>,
    out: &mut Vec<Candidate>,
) -> Result<(), PathError>
where
    N: DataSourceNode<'a>,
{
    if depth > e_ctx.max_depth {
        log::warn!(
            "Recursive descent for '{}' exceeded the depth limit of {}",
            name,
            e_ctx.max_depth
        );
        return Err(PathError::DepthLimitExceeded(e_ctx.max_depth));
    }

    let node = arena.node(id);
    if node.kind() == NodeKind::Object
        && let Some(found) = node.field(name)
        && seen.insert(found.identity())
    {
        out.push(Candidate::Node(arena.push(found, Some(id))));
    }

    if node.kind().is_container() {
        for child in node.children() {
            let child_id = arena.push(child, Some(id));
            descend(child_id, name, depth + 1, arena, e_ctx, seen, out)?;
        }
    }
    Ok(())
}

// --- Predicates ---

pub(crate) fn apply_predicate<'a, N>(
    predicate: &Predicate,
    fan_out: bool,
    candidates: Vec<Candidate>,
    arena: &mut Arena<N>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<Vec<Candidate>, PathError>
where
    N: DataSourceNode<'a>,
{
    match predicate {
        Predicate::Index(index) => Ok(candidates
            .iter()
            .filter_map(|c| index_candidate(c, *index, arena))
            .collect()),
        Predicate::Slice { start, end } => Ok(candidates
            .iter()
            .filter_map(|c| slice_candidate(c, *start, *end, arena))
            .collect()),
        Predicate::Filter(expr) => {
            let passes = |id: usize, arena: &Arena<N>| evaluator::evaluate(expr, arena.node(id), e_ctx);
            let mut out = Vec::new();
            for candidate in candidates {
                match candidate {
                    Candidate::Group(ids) => {
                        for id in ids {
                            if passes(id, arena)? {
                                out.push(Candidate::Node(id));
                            }
                        }
                    }
                    Candidate::Node(id)
                        if !fan_out && arena.node(id).kind() == NodeKind::Array =>
                    {
                        let node = arena.node(id);
                        for element in node.children() {
                            let element_id = arena.push(element, Some(id));
                            if passes(element_id, arena)? {
                                out.push(Candidate::Node(element_id));
                            }
                        }
                    }
                    Candidate::Node(id) => {
                        if passes(id, arena)? {
                            out.push(Candidate::Node(id));
                        }
                    }
                }
            }
            Ok(out)
        }
    }
}

// --- Shared Reshaping ---

/// Groups fan out into their members; nodes pass through.
fn flatten(candidates: Vec<Candidate>) -> Vec<usize> {
    let mut ids = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match candidate {
            Candidate::Node(id) => ids.push(id),
            Candidate::Group(members) => ids.extend(members),
        }
    }
    ids
}

fn index_candidate<'a, N>(candidate: &Candidate, index: i64, arena: &mut Arena<N>) -> Option<Candidate>
where
    N: DataSourceNode<'a>,
{
    match candidate {
        Candidate::Group(members) => {
            let i = resolve_index(index, members.len())?;
            Some(Candidate::Node(members[i]))
        }
        Candidate::Node(id) => {
            let node = arena.node(*id);
            if node.kind() != NodeKind::Array {
                return None;
            }
            let i = resolve_index(index, node.len())?;
            let element = node.element(i)?;
            Some(Candidate::Node(arena.push(element, Some(*id))))
        }
    }
}

fn slice_candidate<'a, N>(
    candidate: &Candidate,
    start: Option<i64>,
    end: Option<i64>,
    arena: &mut Arena<N>,
) -> Option<Candidate>
where
    N: DataSourceNode<'a>,
{
    match candidate {
        Candidate::Group(members) => {
            let range = resolve_slice(start, end, members.len());
            Some(Candidate::Group(members[range].to_vec()))
        }
        Candidate::Node(id) => {
            let node = arena.node(*id);
            if node.kind() != NodeKind::Array {
                return None;
            }
            let range = resolve_slice(start, end, node.len());
            let members = node
                .children()
                .skip(range.start)
                .take(range.len())
                .map(|element| arena.push(element, Some(*id)))
                .collect();
            Some(Candidate::Group(members))
        }
    }
}
