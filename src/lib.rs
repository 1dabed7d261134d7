//! runbook - project automation tasks with explicit prerequisites
//!
//! This crate provides both a CLI tool and a library for running a small,
//! statically declared graph of project tasks (clean, format, test, lint,
//! build, package, release).
//!
//! # Model
//!
//! - **Tasks** are registered once in a [`Registry`], each with an ordered
//!   list of prerequisites, declared options, and a body.
//! - **Resolution** ([`graph::resolve`]) expands a requested task into a
//!   depth-first order in which every prerequisite runs once, before its
//!   dependents.
//! - **Execution** ([`Executor`]) runs that order sequentially and stops at
//!   the first failure.
//! - **Commands** go through a [`CommandExecutor`], with the working
//!   directory and environment taken from the [`Context`].
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use runbook::{Context, Executor, ExecutorConfig, Options, ProcessExecutor, Registry, Task};
//! use runbook::config::ProjectConfig;
//!
//! fn main() -> runbook::Result<()> {
//!     let mut registry = Registry::new();
//!     registry
//!         .register(Task::new("test", "Run tests").body(|ctx, _| {
//!             ctx.sh("cargo test")?;
//!             Ok(())
//!         }))?
//!         .register(Task::new("build", "Build release").depends(["test"]).body(|ctx, _| {
//!             ctx.sh("cargo build --release")?;
//!             Ok(())
//!         }))?;
//!
//!     let project = ProjectConfig::named("demo");
//!     let mut ctx = Context::new(&ProcessExecutor, &project, std::env::current_dir()?);
//!     Executor::new(&registry, ExecutorConfig::default()).execute(&mut ctx, "build", &Options::new())?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod registry;
pub mod task;
pub mod tasks;

// Re-export main types
pub use command::{CommandExecutor, CommandLine, DryRunExecutor, ExecutionResult, ProcessExecutor};
#[cfg(any(test, feature = "testing"))]
pub use command::ScriptedExecutor;
pub use config::Config;
pub use context::Context;
pub use error::{Result, RunbookError};
pub use executor::{Executor, ExecutorConfig, TaskResult};
pub use graph::{resolve, TaskGraph};
pub use registry::Registry;
pub use task::{OptionValue, Options, Task};
