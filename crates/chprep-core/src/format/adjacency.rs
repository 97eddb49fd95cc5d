//! Whitespace-separated adjacency text format (`.adj`).
//!
//! ```text
//! WeightedAdjacencyGraph
//! <n> <m>
//! <first_out[0]> … <first_out[n-1]>
//! <head[0]> … <head[m-1]>
//! <weight[0]> … <weight[m-1]>
//! ```
//!
//! The header tag is required but not interpreted. The `first_out[n] = m`
//! sentinel is not stored on disk. Weights may be written as floats and are
//! truncated toward zero. Tokens may be split across lines arbitrarily;
//! anything after the last weight is ignored.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::SplitAsciiWhitespace;

use tracing::trace;

use super::FormatError;
use crate::error::PrepError;
use crate::graph::CsrGraph;

/// Header tag emitted by [`write_adjacency`].
pub const HEADER_TAG: &str = "WeightedAdjacencyGraph";

/// Upper bound on speculative preallocation from header counts.
const MAX_PREALLOC: usize = 1 << 20;

pub(crate) fn read_adjacency(path: &Path) -> Result<CsrGraph, PrepError> {
    let bytes = fs::read(path).map_err(|source| PrepError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let format_err = |source| PrepError::Format {
        path: path.to_path_buf(),
        source,
    };
    let text = std::str::from_utf8(&bytes).map_err(|_| format_err(FormatError::NotText))?;
    parse_adjacency(text).map_err(format_err)
}

/// Parse an adjacency listing held in memory.
///
/// # Errors
///
/// Returns [`FormatError`] if the stream ends early or a token does not
/// parse as the expected kind of number.
pub fn parse_adjacency(text: &str) -> Result<CsrGraph, FormatError> {
    let mut tokens = Tokens::new(text);

    let tag = tokens.next("header tag")?;
    trace!(tag, "adjacency header");

    let node_count = tokens.next_count("node count")?;
    let arc_count = tokens.next_u32("arc count")?;

    let mut first_out = Vec::with_capacity(node_count.saturating_add(1).min(MAX_PREALLOC));
    for _ in 0..node_count {
        first_out.push(tokens.next_u32("first_out offset")?);
    }
    first_out.push(arc_count);

    let arcs = arc_count as usize;
    let mut head = Vec::with_capacity(arcs.min(MAX_PREALLOC));
    for _ in 0..arcs {
        head.push(tokens.next_u32("head node id")?);
    }

    let mut weight = Vec::with_capacity(arcs.min(MAX_PREALLOC));
    for _ in 0..arcs {
        weight.push(tokens.next_weight()?);
    }

    Ok(CsrGraph::new(node_count, first_out, head, weight))
}

/// Write `graph` as an adjacency listing.
///
/// # Errors
///
/// Propagates any I/O error from `out`.
pub fn write_adjacency(graph: &CsrGraph, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{HEADER_TAG}")?;
    writeln!(out, "{}", graph.node_count)?;
    writeln!(out, "{}", graph.arc_count())?;
    for offset in graph.first_out.iter().take(graph.node_count) {
        writeln!(out, "{offset}")?;
    }
    for h in &graph.head {
        writeln!(out, "{h}")?;
    }
    for w in &graph.weight {
        writeln!(out, "{w}")?;
    }
    Ok(())
}

struct Tokens<'a> {
    inner: SplitAsciiWhitespace<'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_ascii_whitespace(),
            position: 0,
        }
    }

    fn next(&mut self, expected: &'static str) -> Result<&'a str, FormatError> {
        let token = self
            .inner
            .next()
            .ok_or(FormatError::UnexpectedEnd { expected })?;
        self.position += 1;
        Ok(token)
    }

    fn next_u64(&mut self, expected: &'static str) -> Result<u64, FormatError> {
        let token = self.next(expected)?;
        token.parse().map_err(|_| FormatError::InvalidToken {
            position: self.position,
            token: token.to_string(),
            expected,
        })
    }

    fn next_u32(&mut self, expected: &'static str) -> Result<u32, FormatError> {
        let value = self.next_u64(expected)?;
        u32::try_from(value).map_err(|_| FormatError::ValueOutOfRange {
            field: expected,
            value,
        })
    }

    /// Node count: the last vertex id must still fit in a `u32`.
    fn next_count(&mut self, expected: &'static str) -> Result<usize, FormatError> {
        let value = self.next_u64(expected)?;
        if value > u64::from(u32::MAX) {
            return Err(FormatError::ValueOutOfRange {
                field: expected,
                value,
            });
        }
        Ok(value as usize)
    }

    #[allow(clippy::cast_sign_loss)]
    fn next_weight(&mut self) -> Result<u32, FormatError> {
        let token = self.next("arc weight")?;
        let value: f64 = token.parse().map_err(|_| FormatError::InvalidToken {
            position: self.position,
            token: token.to_string(),
            expected: "arc weight",
        })?;
        let truncated = value.trunc();
        if !truncated.is_finite() || truncated < 0.0 || truncated > f64::from(u32::MAX) {
            return Err(FormatError::WeightOutOfRange {
                position: self.position,
                token: token.to_string(),
            });
        }
        Ok(truncated as u32)
    }
}
