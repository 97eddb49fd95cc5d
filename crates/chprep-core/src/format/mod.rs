//! On-disk graph formats.
//!
//! Two formats are understood, selected purely by file extension:
//!
//! - [`adjacency`] — `.adj`, whitespace-separated text with explicit weights.
//! - [`binary`] — `.bin`, packed little-endian dump without weights; weights
//!   are synthesized by [`crate::weight`] while arcs are decoded.
//!
//! Both readers produce an unchecked [`CsrGraph`]; validation is a separate
//! pipeline stage.

pub mod adjacency;
pub mod binary;

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::PrepError;
use crate::graph::CsrGraph;

pub use adjacency::{parse_adjacency, write_adjacency};
pub use binary::{BinaryHeader, ByteCursor, decode_binary, write_binary};

/// Errors raised while decoding a graph file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The text token stream ended early.
    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// A text file is not valid UTF-8.
    #[error("input is not valid UTF-8 text")]
    NotText,

    /// A text token could not be parsed.
    #[error("token {position} ('{token}') is not a valid {expected}")]
    InvalidToken {
        position: usize,
        token: String,
        expected: &'static str,
    },

    /// A weight was negative, non-finite or too large after truncation.
    #[error("weight token {position} ('{token}') does not truncate to a 32-bit unsigned integer")]
    WeightOutOfRange { position: usize, token: String },

    /// The binary buffer is shorter than its header promises.
    #[error("truncated at byte {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A count or offset does not fit the 32-bit in-memory word.
    #[error("{field} value {value} does not fit in 32 bits")]
    ValueOutOfRange { field: &'static str, value: u64 },
}

/// Input format, chosen from the path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    /// Text adjacency listing (`.adj`).
    Adjacency,
    /// Packed binary dump (`.bin`).
    Binary,
}

impl GraphFormat {
    /// Detect the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::UnsupportedFormat`] for any extension other
    /// than `adj` or `bin`.
    pub fn from_path(path: &Path) -> Result<Self, PrepError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("adj") => Ok(Self::Adjacency),
            Some("bin") => Ok(Self::Binary),
            _ => Err(PrepError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Adjacency => "adj",
            Self::Binary => "bin",
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adjacency => write!(f, "adjacency"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Read a graph file, picking the decoder from the extension.
///
/// # Errors
///
/// Returns a setup-class [`PrepError`] when the extension is unknown, the
/// file cannot be opened, stat'd or mapped, or its contents are malformed.
pub fn read_graph(path: &Path) -> Result<CsrGraph, PrepError> {
    let format = GraphFormat::from_path(path)?;
    info!(path = %path.display(), %format, "reading graph");

    let graph = match format {
        GraphFormat::Adjacency => adjacency::read_adjacency(path)?,
        GraphFormat::Binary => binary::read_binary(path)?,
    };

    debug!(
        nodes = graph.node_count,
        arcs = graph.arc_count(),
        "graph decoded"
    );
    Ok(graph)
}

/// Write a graph in the format implied by `path`'s extension.
///
/// # Errors
///
/// Returns [`PrepError::UnsupportedFormat`] for unknown extensions and
/// [`PrepError::Open`] when the file cannot be created or written.
pub fn write_graph(path: &Path, graph: &CsrGraph) -> Result<(), PrepError> {
    let format = GraphFormat::from_path(path)?;
    let io_err = |source| PrepError::Open {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    match format {
        GraphFormat::Adjacency => write_adjacency(graph, &mut writer),
        GraphFormat::Binary => write_binary(graph, &mut writer),
    }
    .and_then(|()| writer.flush())
    .map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> CsrGraph {
        CsrGraph::from_arcs(4, &[(0, 1, 3), (0, 2, 1), (1, 3, 7), (3, 0, 2)])
    }

    #[test]
    fn extension_selects_format() {
        assert_eq!(
            GraphFormat::from_path(Path::new("roads.adj")).ok(),
            Some(GraphFormat::Adjacency)
        );
        assert_eq!(
            GraphFormat::from_path(Path::new("dir.adj/roads.bin")).ok(),
            Some(GraphFormat::Binary)
        );
    }

    #[test]
    fn extension_is_detected_back() {
        for format in [GraphFormat::Adjacency, GraphFormat::Binary] {
            let name = format!("graph.{}", format.extension());
            assert_eq!(GraphFormat::from_path(Path::new(&name)).ok(), Some(format));
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        for name in ["roads.txt", "roads", "roads.adj.gz", "roads.BIN"] {
            let err = GraphFormat::from_path(Path::new(name)).unwrap_err();
            assert!(
                matches!(err, PrepError::UnsupportedFormat { .. }),
                "{name} should be unsupported"
            );
        }
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = read_graph(&dir.path().join("absent.adj")).unwrap_err();
        assert!(matches!(err, PrepError::Open { .. }));

        let err = read_graph(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, PrepError::Open { .. }));
    }

    #[test]
    fn adjacency_file_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("g.adj");
        let graph = sample();

        write_graph(&path, &graph).expect("write");
        assert_eq!(read_graph(&path).expect("read"), graph);
    }

    #[test]
    fn binary_file_keeps_topology_and_synthesizes_weights() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("g.bin");
        let graph = sample();

        write_graph(&path, &graph).expect("write");
        let read = read_graph(&path).expect("read");

        assert_eq!(read.node_count, graph.node_count);
        assert_eq!(read.first_out, graph.first_out);
        assert_eq!(read.head, graph.head);
        let expected: Vec<u32> = graph
            .arcs()
            .map(|(u, v, _)| crate::weight::synthesize(u, v))
            .collect();
        assert_eq!(read.weight, expected);
    }
}
