//! Structural checks on a [`CsrGraph`] before it reaches the builder.
//!
//! [`check_graph_valid`] is the generic CSR sanity check over `first_out`
//! and `head` alone. [`check_boundaries`] then re-checks the same arrays
//! against the declared `node_count` and the weight array. Both run from
//! [`validate_graph`]; the first violated invariant is reported.

use tracing::debug;

use crate::graph::CsrGraph;

/// A violated CSR invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("the first_out vector must not be empty")]
    EmptyFirstOut,

    #[error("the first_out vector must have node_count + 1 = {expected} entries, found {actual}")]
    FirstOutLength { expected: usize, actual: usize },

    #[error("the first element of first_out must be 0, found {found}")]
    FirstOutStart { found: u32 },

    #[error("first_out must be non-decreasing: entry {index} is {value}, previous is {previous}")]
    FirstOutNotMonotone {
        index: usize,
        previous: u32,
        value: u32,
    },

    #[error("the last element of first_out must be the arc count {arc_count}, found {found}")]
    FirstOutEnd { found: u32, arc_count: usize },

    #[error("the head vector must not be empty")]
    EmptyHead,

    #[error("the head vector contains an out-of-bounds node id: arc {arc} points to {head}, node count is {node_count}")]
    HeadOutOfBounds {
        arc: usize,
        head: u32,
        node_count: usize,
    },

    #[error("the weight vector must be as long as the number of arcs: expected {expected}, found {actual}")]
    WeightLength { expected: usize, actual: usize },
}

/// Generic CSR check over the offset and head arrays.
///
/// The node count is taken to be `first_out.len() - 1`.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn check_graph_valid(first_out: &[u32], head: &[u32]) -> Result<(), ValidationError> {
    let Some((&first, _)) = first_out.split_first() else {
        return Err(ValidationError::EmptyFirstOut);
    };
    if first != 0 {
        return Err(ValidationError::FirstOutStart { found: first });
    }
    check_monotone(first_out)?;
    check_end(first_out, head.len())?;
    check_heads(head, first_out.len() - 1)
}

/// Explicit boundary checks against the declared node count and weights.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn check_boundaries(graph: &CsrGraph) -> Result<(), ValidationError> {
    let node_count = graph.node_count;
    let arc_count = graph.arc_count();

    if graph.first_out.len() != node_count + 1 {
        return Err(ValidationError::FirstOutLength {
            expected: node_count + 1,
            actual: graph.first_out.len(),
        });
    }
    check_monotone(&graph.first_out)?;
    if graph.first_out[0] != 0 {
        return Err(ValidationError::FirstOutStart {
            found: graph.first_out[0],
        });
    }
    check_end(&graph.first_out, arc_count)?;
    if graph.head.is_empty() {
        return Err(ValidationError::EmptyHead);
    }
    check_heads(&graph.head, node_count)?;
    if graph.weight.len() != arc_count {
        return Err(ValidationError::WeightLength {
            expected: arc_count,
            actual: graph.weight.len(),
        });
    }
    Ok(())
}

/// Run the generic check, then the explicit boundary checks.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_graph(graph: &CsrGraph) -> Result<(), ValidationError> {
    check_graph_valid(&graph.first_out, &graph.head)?;
    check_boundaries(graph)?;
    debug!(
        nodes = graph.node_count,
        arcs = graph.arc_count(),
        "graph passed validity tests"
    );
    Ok(())
}

fn check_monotone(first_out: &[u32]) -> Result<(), ValidationError> {
    match first_out.windows(2).position(|pair| pair[0] > pair[1]) {
        Some(i) => Err(ValidationError::FirstOutNotMonotone {
            index: i + 1,
            previous: first_out[i],
            value: first_out[i + 1],
        }),
        None => Ok(()),
    }
}

fn check_end(first_out: &[u32], arc_count: usize) -> Result<(), ValidationError> {
    match first_out.last() {
        Some(&last) if last as usize == arc_count => Ok(()),
        Some(&last) => Err(ValidationError::FirstOutEnd {
            found: last,
            arc_count,
        }),
        None => Err(ValidationError::EmptyFirstOut),
    }
}

fn check_heads(head: &[u32], node_count: usize) -> Result<(), ValidationError> {
    match head.iter().position(|&h| h as usize >= node_count) {
        Some(arc) => Err(ValidationError::HeadOutOfBounds {
            arc,
            head: head[arc],
            node_count,
        }),
        None => Ok(()),
    }
}
