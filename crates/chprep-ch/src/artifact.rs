//! On-disk hierarchy artifact.
//!
//! Layout (all integers little-endian):
//!
//! - 4 bytes: magic `CHPH`
//! - 1 byte:  version
//! - 3 bytes: reserved (zero)
//! - 8 bytes: node count `n`
//! - 8 bytes: forward arc count `f`
//! - 8 bytes: backward arc count `b`
//! - `n` × u32: rank
//! - forward graph: `n + 1` × u32 first_out, then `f` × u32 each of head,
//!   weight, middle
//! - backward graph: same with `b`
//! - 32 bytes: BLAKE3 digest of everything above
//!
//! Saving writes a hidden sibling file and renames it over the target, so a
//! failed save never leaves a partial artifact at the requested path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chprep_core::BuilderError;
use chprep_core::format::ByteCursor;
use tracing::{debug, warn};

use crate::hierarchy::{ContractionHierarchy, UpwardGraph};

/// Leading magic bytes of every artifact.
pub const ARTIFACT_MAGIC: [u8; 4] = *b"CHPH";

/// Format version written by this build.
pub const ARTIFACT_VERSION: u8 = 1;

const HEADER_SIZE: usize = 32;
const DIGEST_SIZE: usize = 32;

pub(crate) fn save(ch: &ContractionHierarchy, path: &Path) -> Result<(), BuilderError> {
    let bytes = encode(ch);
    let partial = partial_path(path);
    let io_err = |source| BuilderError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Err(err) = fs::write(&partial, &bytes).and_then(|()| fs::rename(&partial, path)) {
        if let Err(cleanup) = fs::remove_file(&partial) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %cleanup, "failed to remove partial artifact");
            }
        }
        return Err(io_err(err));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

pub(crate) fn load(path: &Path) -> Result<ContractionHierarchy, BuilderError> {
    let bytes = fs::read(path).map_err(|source| BuilderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes).map_err(|reason| BuilderError::Corrupt {
        path: path.to_path_buf(),
        reason,
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "hierarchy".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial"))
}

pub(crate) fn encode(ch: &ContractionHierarchy) -> Vec<u8> {
    let words = ch.rank.len()
        + 2 * (ch.rank.len() + 1)
        + 3 * (ch.forward.arc_count() + ch.backward.arc_count());
    let mut out = Vec::with_capacity(HEADER_SIZE + 4 * words + DIGEST_SIZE);

    out.extend_from_slice(&ARTIFACT_MAGIC);
    out.push(ARTIFACT_VERSION);
    out.extend_from_slice(&[0_u8; 3]);
    out.extend_from_slice(&(ch.rank.len() as u64).to_le_bytes());
    out.extend_from_slice(&(ch.forward.arc_count() as u64).to_le_bytes());
    out.extend_from_slice(&(ch.backward.arc_count() as u64).to_le_bytes());
    debug_assert_eq!(out.len(), HEADER_SIZE);

    put_words(&mut out, &ch.rank);
    for graph in [&ch.forward, &ch.backward] {
        put_words(&mut out, &graph.first_out);
        put_words(&mut out, &graph.head);
        put_words(&mut out, &graph.weight);
        put_words(&mut out, &graph.middle);
    }

    let digest = blake3::hash(&out);
    out.extend_from_slice(digest.as_bytes());
    out
}

pub(crate) fn decode(bytes: &[u8]) -> Result<ContractionHierarchy, String> {
    if bytes.len() < HEADER_SIZE + DIGEST_SIZE {
        return Err(format!("{} bytes is shorter than the fixed header", bytes.len()));
    }
    let (body, stored) = bytes.split_at(bytes.len() - DIGEST_SIZE);
    if blake3::hash(body).as_bytes() != stored {
        return Err("checksum mismatch".to_string());
    }

    let mut cursor = ByteCursor::new(body);
    let err = |e: chprep_core::format::FormatError| e.to_string();

    let magic = cursor.take(4).map_err(err)?;
    if magic != ARTIFACT_MAGIC {
        return Err(format!("invalid magic bytes {magic:?}"));
    }
    let version = cursor.take(4).map_err(err)?[0];
    if version > ARTIFACT_VERSION {
        return Err(format!(
            "unsupported version {version}: maximum supported is {ARTIFACT_VERSION}"
        ));
    }

    let n = read_len(&mut cursor, "node count")?;
    let forward_arcs = read_len(&mut cursor, "forward arc count")?;
    let backward_arcs = read_len(&mut cursor, "backward arc count")?;

    let words = n
        .checked_mul(3)
        .and_then(|w| w.checked_add(2))
        .and_then(|w| forward_arcs.checked_mul(3).and_then(|f| w.checked_add(f)))
        .and_then(|w| backward_arcs.checked_mul(3).and_then(|b| w.checked_add(b)))
        .and_then(|w| w.checked_mul(4));
    if words != Some(cursor.remaining()) {
        return Err(format!(
            "body holds {} bytes, header implies {words:?}",
            cursor.remaining()
        ));
    }

    let rank = get_words(&mut cursor, n).map_err(err)?;
    let forward = get_graph(&mut cursor, n, forward_arcs).map_err(err)?;
    let backward = get_graph(&mut cursor, n, backward_arcs).map_err(err)?;

    let mut order = vec![0_u32; n];
    for (v, &r) in rank.iter().enumerate() {
        let slot = order
            .get_mut(r as usize)
            .ok_or_else(|| format!("rank {r} of node {v} is out of range"))?;
        *slot = v as u32;
    }

    Ok(ContractionHierarchy {
        rank,
        order,
        forward,
        backward,
    })
}

fn put_words(out: &mut Vec<u8>, words: &[u32]) {
    for w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
}

fn read_len(cursor: &mut ByteCursor<'_>, field: &str) -> Result<usize, String> {
    let value = cursor.read_u64_le().map_err(|e| e.to_string())?;
    usize::try_from(value).map_err(|_| format!("{field} {value} does not fit in memory"))
}

fn get_words(
    cursor: &mut ByteCursor<'_>,
    count: usize,
) -> Result<Vec<u32>, chprep_core::format::FormatError> {
    (0..count).map(|_| cursor.read_u32_le()).collect()
}

fn get_graph(
    cursor: &mut ByteCursor<'_>,
    n: usize,
    arcs: usize,
) -> Result<UpwardGraph, chprep_core::format::FormatError> {
    Ok(UpwardGraph {
        first_out: get_words(cursor, n + 1)?,
        head: get_words(cursor, arcs)?,
        weight: get_words(cursor, arcs)?,
        middle: get_words(cursor, arcs)?,
    })
}
