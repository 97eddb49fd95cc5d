//! Rendering of run results and failures.
//!
//! Results go to stdout, failures and timing tables to stderr. In JSON mode
//! both are a single pretty-printed document.

use std::io::{self, Write};

use chprep_core::timing::TimingReport;
use chprep_core::{ErrorCode, PipelineReport, PrepError};
use serde::Serialize;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub const fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A failure ready to be shown to the operator.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Machine-readable error code, e.g. `E3001`.
    pub error_code: &'static str,
    /// Short summary of the error class.
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
}

impl From<&PrepError> for CliError {
    fn from(err: &PrepError) -> Self {
        Self {
            error_code: err.code().code(),
            kind: err.code().message(),
            message: err.to_string(),
            suggestion: err.hint(),
        }
    }
}

impl CliError {
    /// A config file that could not be read or parsed.
    pub fn config(err: &anyhow::Error) -> Self {
        let code = ErrorCode::ConfigParseError;
        Self {
            error_code: code.code(),
            kind: code.message(),
            message: format!("{err:#}"),
            suggestion: code.hint(),
        }
    }
}

/// Render a failure to stderr.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            writeln!(out, "error[{}]: {}", error.error_code, error.message)?;
            if let Some(suggestion) = error.suggestion {
                writeln!(out, "  hint: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render a completed run to stdout.
pub fn render_report(mode: OutputMode, report: &PipelineReport) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
        OutputMode::Human => write_stage_lines(&mut out, report)?,
    }
    Ok(())
}

fn write_stage_lines(w: &mut dyn Write, report: &PipelineReport) -> io::Result<()> {
    for stage in &report.stages {
        writeln!(w, "{:<9} done ({:.1} ms)", stage.name, stage.elapsed_ms)?;
    }
    writeln!(
        w,
        "wrote {} ({} nodes, {} arcs)",
        report.output.display(),
        report.node_count,
        report.arc_count
    )
}

/// Print the collected timing table to stderr.
pub fn render_timing(report: &TimingReport) -> anyhow::Result<()> {
    if report.is_empty() {
        eprintln!("timing report: no samples recorded");
    } else {
        eprintln!("timing report:");
        eprintln!("{}", report.display_table());
        eprintln!("timing report (json):");
        eprintln!("{}", serde_json::to_string_pretty(&report.to_json())?);
    }
    Ok(())
}
