//! Packed little-endian graph dump (`.bin`).
//!
//! # Layout
//!
//! | offset          | width     | field                         |
//! |-----------------|-----------|-------------------------------|
//! | 0               | 8         | `node_count`                  |
//! | 8               | 8         | `arc_count`                   |
//! | 16              | 8         | reserved (ignored on read)    |
//! | 24              | 8 × (n+1) | `first_out`, narrowed to u32  |
//! | 24 + 8 × (n+1)  | 4 × m     | `head`                        |
//!
//! The format carries no weights. They are synthesized per arc from its
//! endpoints while arcs are scanned vertex by vertex.
//!
//! Files are memory-mapped through [`MappedFile`], which owns the mapping
//! for the duration of one decode and unmaps it when dropped.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, trace};

use super::FormatError;
use crate::error::PrepError;
use crate::graph::CsrGraph;
use crate::weight;

/// One fixed-width header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderField {
    pub name: &'static str,
    pub width: usize,
}

/// Decoded fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryHeader {
    pub node_count: u64,
    pub arc_count: u64,
    /// Unused word kept for layout compatibility; written as zero.
    pub reserved: u64,
}

impl BinaryHeader {
    /// Header fields in on-disk order.
    pub const FIELDS: [HeaderField; 3] = [
        HeaderField {
            name: "node_count",
            width: 8,
        },
        HeaderField {
            name: "arc_count",
            width: 8,
        },
        HeaderField {
            name: "reserved",
            width: 8,
        },
    ];

    /// Header size in bytes.
    pub const SIZE: usize = {
        let mut total = 0;
        let mut i = 0;
        while i < Self::FIELDS.len() {
            total += Self::FIELDS[i].width;
            i += 1;
        }
        total
    };

    /// Width of one `first_out` entry on disk.
    pub const FIRST_OUT_WIDTH: usize = 8;

    /// Width of one `head` entry on disk.
    pub const HEAD_WIDTH: usize = 4;

    /// Read the header fields from the start of `cursor`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Truncated`] if fewer than [`Self::SIZE`] bytes
    /// remain.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            node_count: cursor.read_u64_le()?,
            arc_count: cursor.read_u64_le()?,
            reserved: cursor.read_u64_le()?,
        })
    }

    /// Write the header fields.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from `out`.
    pub fn encode(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_all(&self.node_count.to_le_bytes())?;
        out.write_all(&self.arc_count.to_le_bytes())?;
        out.write_all(&self.reserved.to_le_bytes())
    }

    /// Byte offset of the `head` array, or `None` on overflow.
    #[must_use]
    pub fn head_offset(&self) -> Option<usize> {
        let entries = usize::try_from(self.node_count).ok()?.checked_add(1)?;
        entries
            .checked_mul(Self::FIRST_OUT_WIDTH)?
            .checked_add(Self::SIZE)
    }

    /// Total byte length the header promises, or `None` on overflow.
    #[must_use]
    pub fn total_len(&self) -> Option<usize> {
        let heads = usize::try_from(self.arc_count)
            .ok()?
            .checked_mul(Self::HEAD_WIDTH)?;
        self.head_offset()?.checked_add(heads)
    }
}

/// Bounds-checked little-endian reader over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Consume exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Truncated`] if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if self.remaining() < len {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns [`FormatError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_u64_le(&mut self) -> Result<u64, FormatError> {
        self.take_array().map(u64::from_le_bytes)
    }

    /// # Errors
    ///
    /// Returns [`FormatError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_u32_le(&mut self) -> Result<u32, FormatError> {
        self.take_array().map(u32::from_le_bytes)
    }
}

/// Read-only mapping of an input file, unmapped on drop.
pub struct MappedFile {
    map: Mmap,
}

impl MappedFile {
    /// Open and map `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Open`], [`PrepError::Stat`] or
    /// [`PrepError::Map`] for the step that failed.
    pub fn open(path: &Path) -> Result<Self, PrepError> {
        let file = File::open(path).map_err(|source| PrepError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| PrepError::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        // Safety: the input is treated as immutable for the duration of the
        // decode; concurrent writers are not supported.
        #[allow(unsafe_code)]
        let map = unsafe { Mmap::map(&file) }.map_err(|source| PrepError::Map {
            path: path.to_path_buf(),
            source,
        })?;
        trace!(path = %path.display(), len, "mapped input");
        Ok(Self { map })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        trace!(len = self.map.len(), "unmapping input");
    }
}

pub(crate) fn read_binary(path: &Path) -> Result<CsrGraph, PrepError> {
    let mapped = MappedFile::open(path)?;
    decode_binary(mapped.as_slice()).map_err(|source| PrepError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode a binary dump held in memory, synthesizing weights.
///
/// # Errors
///
/// Returns [`FormatError::Truncated`] when the buffer is shorter than the
/// header promises and [`FormatError::ValueOutOfRange`] when a count or
/// offset does not fit in 32 bits.
pub fn decode_binary(bytes: &[u8]) -> Result<CsrGraph, FormatError> {
    let mut cursor = ByteCursor::new(bytes);
    let header = BinaryHeader::decode(&mut cursor)?;

    let node_count = narrow("node count", header.node_count)?;
    let arc_count = narrow("arc count", header.arc_count)?;

    // Reject short files before allocating from header counts.
    let total = header.total_len().unwrap_or(usize::MAX);
    if bytes.len() < total {
        return Err(FormatError::Truncated {
            offset: cursor.position(),
            needed: total - cursor.position(),
            available: cursor.remaining(),
        });
    }

    let n = node_count as usize;
    let m = arc_count as usize;

    let mut first_out = Vec::with_capacity(n + 1);
    for _ in 0..=n {
        first_out.push(narrow("first_out offset", cursor.read_u64_le()?)?);
    }

    let mut head = Vec::with_capacity(m);
    for _ in 0..m {
        head.push(cursor.read_u32_le()?);
    }

    let weight = synthesize_weights(&first_out, &head);
    debug!(nodes = n, arcs = m, "decoded binary graph");

    Ok(CsrGraph::new(n, first_out, head, weight))
}

/// Assign every arc its synthetic weight, walking vertices in CSR order.
///
/// Arc ranges are clamped to `head.len()`; arcs outside every well-formed
/// range keep weight 0 and the graph is rejected by validation.
fn synthesize_weights(first_out: &[u32], head: &[u32]) -> Vec<u32> {
    let m = head.len();
    let mut weight = vec![0_u32; m];
    for (v, bounds) in first_out.windows(2).enumerate() {
        let end = (bounds[1] as usize).min(m);
        let start = (bounds[0] as usize).min(end);
        for arc in start..end {
            weight[arc] = weight::synthesize(v as u32, head[arc]);
        }
    }
    weight
}

fn narrow(field: &'static str, value: u64) -> Result<u32, FormatError> {
    u32::try_from(value).map_err(|_| FormatError::ValueOutOfRange { field, value })
}

/// Write `graph` as a binary dump. Weights are not stored.
///
/// # Errors
///
/// Propagates any I/O error from `out`.
pub fn write_binary(graph: &CsrGraph, out: &mut impl Write) -> io::Result<()> {
    let header = BinaryHeader {
        node_count: graph.node_count as u64,
        arc_count: graph.arc_count() as u64,
        reserved: 0,
    };
    header.encode(out)?;
    for &offset in &graph.first_out {
        out.write_all(&u64::from(offset).to_le_bytes())?;
    }
    for &h in &graph.head {
        out.write_all(&h.to_le_bytes())?;
    }
    Ok(())
}
