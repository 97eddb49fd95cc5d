//! chprep-core library.
//!
//! Reads a static directed graph from disk, checks its CSR invariants and
//! hands it to a [`hierarchy::HierarchyBuilder`] through the
//! [`pipeline::Pipeline`].
//!
//! # Conventions
//!
//! - **Errors**: library failures are `thiserror` enums rolled up into
//!   [`error::PrepError`]; `anyhow::Result` is reserved for the config layer.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod format;
pub mod graph;
pub mod hierarchy;
pub mod pipeline;
pub mod timing;
pub mod validate;
pub mod weight;

pub use error::{ErrorCategory, ErrorCode, PrepError};
pub use format::{GraphFormat, read_graph, write_graph};
pub use graph::CsrGraph;
pub use hierarchy::{BuilderError, Hierarchy, HierarchyBuilder};
pub use pipeline::{Pipeline, PipelineReport};
pub use validate::{ValidationError, validate_graph};
