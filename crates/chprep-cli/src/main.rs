#![forbid(unsafe_code)]

mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use chprep_ch::ContractionBuilder;
use chprep_core::config::{ConfigSource, resolve_config};
use chprep_core::{ErrorCategory, GraphFormat, Pipeline, timing};
use clap::Parser;
use output::{CliError, OutputMode};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "chprep",
    author,
    version,
    about = "Build a contraction hierarchy from a graph file",
    long_about = "Read a weighted directed graph (.adj text or .bin binary), check its \
                  CSR invariants, contract it and save the hierarchy to OUTPUT.",
    after_help = "EXAMPLES:\n    # Text adjacency input\n    chprep roads.adj roads.ch\n\n    # Binary input with a stage timing table\n    chprep --timing roads.bin roads.ch\n\n    # Machine-readable run report\n    chprep --json roads.adj roads.ch\n\nEXIT STATUS:\n    0  success, --help, --version\n    1  usage error\n    2  invalid graph or hierarchy build/save failure\n    3  unreadable, unsupported or malformed input, or bad config\n    4  artifact saved but the run report could not be printed"
)]
struct Cli {
    /// Input graph (`.adj` or `.bin`).
    input: PathBuf,

    /// Where to write the hierarchy artifact.
    output: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit stage timing report to stderr.
    #[arg(long)]
    timing: bool,

    /// Print the run report as JSON instead of status lines.
    #[arg(long)]
    json: bool,

    /// Read settings from this file instead of the usual locations.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        OutputMode::from_flag(self.json)
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CHPREP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "chprep=debug,chprep_core=debug,chprep_ch=debug,info"
        } else {
            "warn"
        })
    });

    let format = env::var("CHPREP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Report `error` and pick the exit status for `category`.
fn fail(mode: OutputMode, error: &CliError, category: ErrorCategory) -> ExitCode {
    if let Err(err) = output::render_error(mode, error) {
        eprintln!("error: {err:#}");
    }
    ExitCode::from(category.exit_code())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version go to stdout and are not failures.
            let status = if err.use_stderr() {
                ExitCode::from(ErrorCategory::Usage.exit_code())
            } else {
                ExitCode::SUCCESS
            };
            if let Err(io) = err.print() {
                eprintln!("error: {io}");
            }
            return status;
        }
    };

    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let mode = cli.output_mode();
    let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let (config, source) = match resolve_config(cli.config.as_deref(), &working_dir) {
        Ok(resolved) => resolved,
        Err(err) => return fail(mode, &CliError::config(&err), ErrorCategory::Setup),
    };
    log_config_source(&source);
    debug!(?config, "effective config");

    if !mode.is_json()
        && let Ok(format) = GraphFormat::from_path(&cli.input)
    {
        println!("Reading {format} format...");
    }

    let builder = ContractionBuilder::new(config.contraction);
    // Keep stdout a single JSON document in JSON mode.
    let result = Pipeline::new(&builder).run(&cli.input, &cli.output, &mut |line| {
        if mode.is_json() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    });

    let status = match result {
        Ok(report) => match output::render_report(mode, &report) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: cannot print run report: {err:#}");
                ExitCode::from(ErrorCategory::Report.exit_code())
            }
        },
        Err(err) => fail(mode, &CliError::from(&err), err.category()),
    };

    if timing_enabled
        && let Err(err) = output::render_timing(&timing::collect_report())
    {
        eprintln!("error: cannot print timing report: {err:#}");
    }

    status
}

fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::Explicit(path) | ConfigSource::Project(path) | ConfigSource::User(path) => {
            debug!(path = %path.display(), "loaded config file");
        }
        ConfigSource::Defaults => debug!("using built-in config defaults"),
    }
}
