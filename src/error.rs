//! Error types for runbook
//!
//! Uses `miette` for pretty error reporting with help text, and maps every
//! error onto the process exit code.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code reserved for errors raised while resolving the task graph.
pub const RESOLUTION_EXIT_CODE: u8 = 3;

/// Exit code used for command-line usage errors (matches clap).
pub const USAGE_EXIT_CODE: u8 = 2;

/// Main error type for runbook operations
#[derive(Error, Diagnostic, Debug)]
pub enum RunbookError {
    #[error("Configuration file not found")]
    #[diagnostic(
        code(runbook::config::not_found),
        help("Create a runbook.toml in your project root (`runbook init`), or specify one with --config")
    )]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("Failed to parse configuration {}", .path.display())]
    #[diagnostic(code(runbook::config::parse))]
    ConfigParse {
        #[source]
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(runbook::config::invalid))]
    InvalidConfig { reason: String },

    #[error("Task '{name}' not found")]
    #[diagnostic(
        code(runbook::task::not_found),
        help("Run `runbook list` to see available tasks")
    )]
    UnknownTask { name: String, available: Vec<String> },

    #[error("Circular dependency detected: {cycle}")]
    #[diagnostic(
        code(runbook::task::cycle),
        help("A task may not depend on itself, directly or through its prerequisites")
    )]
    CycleDetected { cycle: String },

    #[error("Task '{name}' is registered twice")]
    #[diagnostic(code(runbook::task::duplicate))]
    DuplicateTask { name: String },

    #[error("Command `{command}` failed with exit code {code}")]
    #[diagnostic(code(runbook::exec::failed))]
    CommandFailed {
        command: String,
        code: i32,
        #[help]
        stderr: Option<String>,
    },

    #[error("Command not found: {command}")]
    #[diagnostic(
        code(runbook::exec::command_not_found),
        help("Ensure the command is installed and in your PATH")
    )]
    CommandNotFound { command: String },

    #[error("Task '{task}' cannot proceed: {message}")]
    #[diagnostic(code(runbook::task::precondition))]
    Precondition { task: String, message: String },

    #[error("Invalid value for option '{option}' of task '{task}': {reason}")]
    #[diagnostic(code(runbook::task::option))]
    InvalidOption {
        task: String,
        option: String,
        reason: String,
    },

    #[error("Invalid glob pattern '{pattern}'")]
    #[diagnostic(code(runbook::task::pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{} already exists", .path.display())]
    #[diagnostic(
        code(runbook::init::exists),
        help("Pass --force to overwrite it")
    )]
    AlreadyExists { path: PathBuf },

    #[error("Failed to render JSON output")]
    #[diagnostic(code(runbook::output::json))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(runbook::usage))]
    Usage(#[from] clap::Error),

    #[error("I/O error")]
    #[diagnostic(code(runbook::io))]
    Io(#[from] std::io::Error),
}

impl RunbookError {
    /// Process exit code for this error.
    ///
    /// A failed command propagates its own status; graph errors use
    /// [`RESOLUTION_EXIT_CODE`].
    pub fn exit_code(&self) -> u8 {
        match self {
            RunbookError::CommandFailed { code, .. } => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            RunbookError::UnknownTask { .. }
            | RunbookError::CycleDetected { .. }
            | RunbookError::DuplicateTask { .. } => RESOLUTION_EXIT_CODE,
            RunbookError::Usage(_) => USAGE_EXIT_CODE,
            _ => 1,
        }
    }
}

/// Result type alias for runbook operations
pub type Result<T> = std::result::Result<T, RunbookError>;
