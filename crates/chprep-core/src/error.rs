use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::format::FormatError;
use crate::hierarchy::BuilderError;
use crate::validate::ValidationError;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UsageError,
    ConfigParseError,
    FileOpenFailed,
    FileStatFailed,
    FileMapFailed,
    UnsupportedFormat,
    MalformedInput,
    InvalidGraph,
    InconsistentBuilderInput,
    HierarchyCheckFailed,
    ArtifactIoFailed,
    ArtifactCorrupt,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UsageError => "E1001",
            Self::ConfigParseError => "E1002",
            Self::FileOpenFailed => "E2001",
            Self::FileStatFailed => "E2002",
            Self::FileMapFailed => "E2003",
            Self::UnsupportedFormat => "E2004",
            Self::MalformedInput => "E2005",
            Self::InvalidGraph => "E3001",
            Self::InconsistentBuilderInput => "E4001",
            Self::HierarchyCheckFailed => "E4002",
            Self::ArtifactIoFailed => "E4003",
            Self::ArtifactCorrupt => "E4004",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UsageError => "Invalid invocation",
            Self::ConfigParseError => "Config file parse error",
            Self::FileOpenFailed => "Cannot open input file",
            Self::FileStatFailed => "Unable to acquire file stat",
            Self::FileMapFailed => "Unable to map input file",
            Self::UnsupportedFormat => "Unsupported file extension",
            Self::MalformedInput => "Malformed graph file",
            Self::InvalidGraph => "Graph failed validity tests",
            Self::InconsistentBuilderInput => "Inconsistent hierarchy builder input",
            Self::HierarchyCheckFailed => "Hierarchy self-check failed",
            Self::ArtifactIoFailed => "Hierarchy artifact I/O failed",
            Self::ArtifactCorrupt => "Hierarchy artifact is corrupt",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::UsageError => Some("Run `chprep <INPUT> <OUTPUT>`; see `chprep --help`."),
            Self::ConfigParseError => Some("Fix syntax in chprep.toml and retry."),
            Self::FileOpenFailed => Some("Check that the input path exists and is readable."),
            Self::FileStatFailed | Self::FileMapFailed => None,
            Self::UnsupportedFormat => Some("Input files must end in `.adj` or `.bin`."),
            Self::MalformedInput => {
                Some("The file is truncated or not in the format its extension claims.")
            }
            Self::InvalidGraph => Some("Regenerate the input graph; its CSR arrays are inconsistent."),
            Self::InconsistentBuilderInput | Self::HierarchyCheckFailed => {
                Some("Retry once. If persistent, report a bug with the input graph.")
            }
            Self::ArtifactIoFailed => Some("Check disk space and write permissions."),
            Self::ArtifactCorrupt => Some("Rebuild the hierarchy from the source graph."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse error class, used to pick the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed invocation.
    Usage,
    /// The input could not be opened, mapped, recognised or decoded.
    Setup,
    /// The decoded graph violates a CSR invariant.
    Validation,
    /// The hierarchy builder rejected its input or failed to check/save.
    Builder,
    /// The artifact was saved but the run report could not be printed.
    Report,
}

impl ErrorCategory {
    /// Process exit status for this class of failure.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Usage => 1,
            Self::Validation | Self::Builder => 2,
            Self::Setup => 3,
            Self::Report => 4,
        }
    }
}

/// Every failure the ingestion pipeline can surface.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    #[error("cannot open file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to acquire file stat for {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to map {}: {source}", path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported file extension: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("malformed graph file {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("validity test failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("hierarchy builder failed: {0}")]
    Builder(#[from] BuilderError),
}

impl PrepError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Open { .. } => ErrorCode::FileOpenFailed,
            Self::Stat { .. } => ErrorCode::FileStatFailed,
            Self::Map { .. } => ErrorCode::FileMapFailed,
            Self::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            Self::Format { .. } => ErrorCode::MalformedInput,
            Self::Validation(_) => ErrorCode::InvalidGraph,
            Self::Builder(err) => err.code(),
        }
    }

    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Open { .. }
            | Self::Stat { .. }
            | Self::Map { .. }
            | Self::UnsupportedFormat { .. }
            | Self::Format { .. } => ErrorCategory::Setup,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Builder(_) => ErrorCategory::Builder,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
