//! Unified diagnostics for the harness.
//!
//! Every infrastructure failure the harness can hit is a variant of
//! [`HarnessError`]. Expected failures of the product under test (a compile
//! that reports errors, a tested program exiting nonzero) are never errors:
//! they are recorded in the transcript as data. Baseline mismatches are also
//! not errors; they are outcomes (see `baseline::TypeOutcome`).

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// An infrastructure failure: broken test environment or fixture, never a
/// product regression. Aborts the current test case's remaining test types.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("tool '{name}' not found; searched {searched:?}")]
    #[diagnostic(
        code(regatta::tool_not_found),
        help("install the tool, add it to PATH, or point --drop-root at a toolchain drop")
    )]
    ToolNotFound { name: String, searched: Vec<String> },

    #[error("tool '{name}' did not finish within {seconds}s")]
    #[diagnostic(
        code(regatta::tool_timed_out),
        help("raise --timeout or drop it to restore unbounded waiting")
    )]
    ToolTimedOut { name: String, seconds: u64 },

    #[error("{tool} rejected harness-generated input (exit {exit_code})")]
    #[diagnostic(code(regatta::secondary_tool_failed), help("{output}"))]
    SecondaryToolFailed {
        tool: String,
        exit_code: i32,
        output: String,
    },

    #[error("malformed test descriptor {path}")]
    #[diagnostic(code(regatta::malformed_descriptor))]
    MalformedDescriptor {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no source program in test directory {dir}")]
    #[diagnostic(code(regatta::missing_source))]
    MissingSource { dir: PathBuf },

    #[error("expected generated artifact {path} was not produced")]
    #[diagnostic(code(regatta::missing_generated))]
    MissingGenerated { path: PathBuf },

    #[error("include file {path} is missing")]
    #[diagnostic(
        code(regatta::missing_include),
        help("only includes whose name ends in 'trace' may be absent")
    )]
    MissingInclude { path: PathBuf },

    #[error("baseline file {path} is missing")]
    #[diagnostic(
        code(regatta::missing_baseline),
        help("run with --reset to record a baseline for this test")
    )]
    MissingBaseline { path: PathBuf },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(regatta::invalid_config))]
    InvalidConfig { message: String },

    #[error("I/O error on {path}")]
    #[diagnostic(code(regatta::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("internal error: {message}")]
    #[diagnostic(code(regatta::internal))]
    Internal { message: String },
}

impl HarnessError {
    /// Wraps an `io::Error` with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        HarnessError::Internal {
            message: message.into(),
        }
    }
}
