#![forbid(unsafe_code)]
//! chprep-ch library.
//!
//! A contraction hierarchy implementation of
//! [`chprep_core::HierarchyBuilder`]. Nodes are contracted one at a time in
//! order of a lazily updated priority; shortcuts preserve shortest-path
//! distances among the nodes that remain. The result is two upward graphs
//! plus the contraction order, persisted in a checksummed binary artifact.
//!
//! # Conventions
//!
//! - **Errors**: everything surfaces as [`chprep_core::BuilderError`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

mod artifact;
mod contraction;
mod hierarchy;
mod witness;

pub use artifact::{ARTIFACT_MAGIC, ARTIFACT_VERSION};
pub use contraction::ContractionBuilder;
pub use hierarchy::{ContractionHierarchy, NO_MIDDLE, UpwardGraph};
