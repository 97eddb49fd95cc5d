//! Contract between the ingestion pipeline and a hierarchy builder.
//!
//! The pipeline never looks inside the produced structure: it asks the
//! builder for one, asks the result to check itself, and asks it to save
//! itself. Any implementation satisfying these two traits can be plugged
//! into [`Pipeline`](crate::pipeline::Pipeline).

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Failures reported by a hierarchy builder or the hierarchy it produced.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// The arrays handed to `build` disagree with each other.
    #[error("inconsistent builder input: {0}")]
    InconsistentInput(String),

    /// The built hierarchy failed its own consistency check.
    #[error("hierarchy self-check failed: {0}")]
    SelfCheck(String),

    /// Reading or writing the artifact failed.
    #[error("hierarchy artifact I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored artifact could not be decoded.
    #[error("hierarchy artifact {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl BuilderError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InconsistentInput(_) => ErrorCode::InconsistentBuilderInput,
            Self::SelfCheck(_) => ErrorCode::HierarchyCheckFailed,
            Self::Io { .. } => ErrorCode::ArtifactIoFailed,
            Self::Corrupt { .. } => ErrorCode::ArtifactCorrupt,
        }
    }
}

/// Builds an auxiliary query structure from a validated graph.
pub trait HierarchyBuilder {
    type Output: Hierarchy;

    /// Build the structure from arc-list form.
    ///
    /// `arc_sources`, `head` and `weight` are parallel arrays indexed by
    /// arc. `progress` receives human-readable status lines, in order.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InconsistentInput`] if the arrays disagree.
    fn build(
        &self,
        node_count: usize,
        arc_sources: &[u32],
        head: &[u32],
        weight: &[u32],
        progress: &mut dyn FnMut(&str),
    ) -> Result<Self::Output, BuilderError>;
}

/// A built structure that can verify and persist itself.
pub trait Hierarchy {
    /// Check internal invariants.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::SelfCheck`] describing the first violation.
    fn self_check(&self) -> Result<(), BuilderError>;

    /// Persist to `path`. Nothing is left at `path` on failure.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Io`] if the artifact cannot be written.
    fn save(&self, path: &Path) -> Result<(), BuilderError>;
}
