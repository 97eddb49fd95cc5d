//! Read → validate → build → self-check → save.
//!
//! The pipeline is strictly linear and synchronous. The graph is owned by
//! [`Pipeline::run`] and lent read-only to the builder; it is dropped when
//! the run returns. The output path is touched only by the final save
//! stage, so any earlier failure leaves nothing behind.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument};

use crate::error::PrepError;
use crate::format::{self, GraphFormat};
use crate::hierarchy::{Hierarchy, HierarchyBuilder};
use crate::timing;
use crate::validate;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: GraphFormat,
    pub node_count: usize,
    pub arc_count: usize,
    /// Wall-clock time per stage, in run order.
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub name: &'static str,
    pub elapsed_ms: f64,
}

/// Drives one graph through a [`HierarchyBuilder`].
pub struct Pipeline<'b, B> {
    builder: &'b B,
}

impl<'b, B: HierarchyBuilder> Pipeline<'b, B> {
    #[must_use]
    pub const fn new(builder: &'b B) -> Self {
        Self { builder }
    }

    /// Run every stage against `input`, saving the result to `output`.
    ///
    /// Builder progress lines are forwarded to `progress` unchanged and in
    /// order.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. Setup errors come from reading,
    /// [`PrepError::Validation`] from the validity tests, and
    /// [`PrepError::Builder`] from build, self-check or save.
    #[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        progress: &mut dyn FnMut(&str),
    ) -> Result<PipelineReport, PrepError> {
        let format = GraphFormat::from_path(input)?;
        let mut stages = Vec::with_capacity(5);

        let graph = stage(&mut stages, "read", || format::read_graph(input))?;
        info!(
            %format,
            nodes = graph.node_count,
            arcs = graph.arc_count(),
            "graph loaded"
        );

        stage(&mut stages, "validate", || validate::validate_graph(&graph))?;
        info!("validity tests passed");

        let arc_sources = graph.arc_sources();
        let hierarchy = stage(&mut stages, "build", || {
            self.builder.build(
                graph.node_count,
                &arc_sources,
                &graph.head,
                &graph.weight,
                progress,
            )
        })?;
        drop(arc_sources);

        stage(&mut stages, "check", || hierarchy.self_check())?;
        stage(&mut stages, "save", || hierarchy.save(output))?;
        info!(output = %output.display(), "hierarchy saved");

        Ok(PipelineReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            format,
            node_count: graph.node_count,
            arc_count: graph.arc_count(),
            stages,
        })
    }
}

/// Time one stage both for the report and for the `--timing` table.
fn stage<T, E>(
    stages: &mut Vec<StageReport>,
    name: &'static str,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, PrepError>
where
    PrepError: From<E>,
{
    let started = Instant::now();
    let result = timing::timed(&format!("pipeline.{name}"), f);
    stages.push(StageReport {
        name,
        elapsed_ms: millis(started.elapsed()),
    });
    result.map_err(PrepError::from)
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::format::write_graph;
    use crate::graph::CsrGraph;
    use crate::hierarchy::BuilderError;
    use crate::validate::ValidationError;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records its input and writes a marker file on save.
    #[derive(Default)]
    struct RecordingBuilder {
        seen: RefCell<Option<(usize, Vec<u32>, Vec<u32>, Vec<u32>)>>,
        fail_check: bool,
    }

    struct Marker {
        fail_check: bool,
    }

    impl HierarchyBuilder for RecordingBuilder {
        type Output = Marker;

        fn build(
            &self,
            node_count: usize,
            arc_sources: &[u32],
            head: &[u32],
            weight: &[u32],
            progress: &mut dyn FnMut(&str),
        ) -> Result<Marker, BuilderError> {
            progress("first");
            progress("second");
            *self.seen.borrow_mut() = Some((
                node_count,
                arc_sources.to_vec(),
                head.to_vec(),
                weight.to_vec(),
            ));
            Ok(Marker {
                fail_check: self.fail_check,
            })
        }
    }

    impl Hierarchy for Marker {
        fn self_check(&self) -> Result<(), BuilderError> {
            if self.fail_check {
                Err(BuilderError::SelfCheck("forced".into()))
            } else {
                Ok(())
            }
        }

        fn save(&self, path: &Path) -> Result<(), BuilderError> {
            std::fs::write(path, b"marker").map_err(|source| BuilderError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    fn write_input(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).expect("write input");
        path
    }

    #[test]
    fn valid_text_input_reaches_builder_and_is_saved() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_input(&dir, "g.adj", "AdjacencyGraph 2 1 0 1 1 5.0");
        let output = dir.path().join("g.ch");
        let builder = RecordingBuilder::default();
        let mut messages = Vec::new();

        let report = Pipeline::new(&builder)
            .run(&input, &output, &mut |msg| messages.push(msg.to_string()))
            .expect("run");

        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(
            builder.seen.borrow().clone(),
            Some((2, vec![0], vec![1], vec![5]))
        );
        assert_eq!(report.node_count, 2);
        assert_eq!(report.arc_count, 1);
        assert_eq!(report.format, GraphFormat::Adjacency);
        let names: Vec<_> = report.stages.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["read", "validate", "build", "check", "save"]);
        assert!(output.exists());
    }

    #[test]
    fn invalid_graph_never_reaches_builder() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_input(&dir, "g.adj", "AdjacencyGraph 2 1 1 1 1 5.0");
        let output = dir.path().join("g.ch");
        let builder = RecordingBuilder::default();

        let err = Pipeline::new(&builder)
            .run(&input, &output, &mut |_| {})
            .unwrap_err();

        assert!(matches!(
            err,
            PrepError::Validation(ValidationError::FirstOutStart { found: 1 })
        ));
        assert!(builder.seen.borrow().is_none());
        assert!(!output.exists());
    }

    #[test]
    fn out_of_range_head_is_a_validation_error() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_input(&dir, "g.adj", "AdjacencyGraph 2 1 0 1 2 5.0");
        let builder = RecordingBuilder::default();

        let err = Pipeline::new(&builder)
            .run(&input, &dir.path().join("g.ch"), &mut |_| {})
            .unwrap_err();
        assert!(err.to_string().contains("out-of-bounds node id"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn failed_self_check_writes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_input(&dir, "g.adj", "AdjacencyGraph 2 1 0 1 1 5.0");
        let output = dir.path().join("g.ch");
        let builder = RecordingBuilder {
            fail_check: true,
            ..RecordingBuilder::default()
        };

        let err = Pipeline::new(&builder)
            .run(&input, &output, &mut |_| {})
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Builder);
        assert!(!output.exists());
    }

    #[test]
    fn binary_input_gets_synthesized_weights() {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("g.bin");
        write_graph(&input, &CsrGraph::new(2, vec![0, 1, 1], vec![1], vec![0])).expect("write");
        let builder = RecordingBuilder::default();

        Pipeline::new(&builder)
            .run(&input, &dir.path().join("g.ch"), &mut |_| {})
            .expect("run");

        let expected = crate::weight::synthesize(0, 1);
        let seen = builder.seen.borrow().clone().expect("builder ran");
        assert_eq!(seen.3, vec![expected]);
    }

    #[test]
    fn unsupported_extension_fails_before_reading() {
        let dir = TempDir::new().expect("tempdir");
        let builder = RecordingBuilder::default();
        let err = Pipeline::new(&builder)
            .run(
                &dir.path().join("missing.gr"),
                &dir.path().join("g.ch"),
                &mut |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, PrepError::UnsupportedFormat { .. }));
    }
}
