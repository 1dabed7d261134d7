//! Execution context shared by every task body of one invocation
//!
//! The context owns a working-directory stack and an environment overlay.
//! Both are only changed through scoped acquisition
//! ([`Context::with_directory`], [`Context::with_environment`]), which
//! restores the previous state when the scope exits, including when the
//! scoped body returns an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::command::{CommandExecutor, CommandLine, ExecutionResult, Failure};
use crate::config::ProjectConfig;
use crate::error::{Result, RunbookError};

/// Execution context that tracks state during one invocation
pub struct Context<'a> {
    executor: &'a dyn CommandExecutor,
    project: &'a ProjectConfig,
    dirs: Vec<PathBuf>,
    env: BTreeMap<String, String>,
    quiet: bool,
}

impl<'a> Context<'a> {
    /// Create a context rooted at `root`
    pub fn new(executor: &'a dyn CommandExecutor, project: &'a ProjectConfig, root: PathBuf) -> Self {
        Self {
            executor,
            project,
            dirs: vec![root],
            env: BTreeMap::new(),
            quiet: false,
        }
    }

    /// Seed the environment overlay
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Suppress progress banners
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn project(&self) -> &'a ProjectConfig {
        self.project
    }

    /// Directory commands currently run in
    pub fn current_dir(&self) -> &Path {
        // The root pushed by `new` is never popped.
        self.dirs.last().map(PathBuf::as_path).unwrap_or(Path::new("."))
    }

    /// Directory the invocation started in
    pub fn root_dir(&self) -> &Path {
        self.dirs.first().map(PathBuf::as_path).unwrap_or(Path::new("."))
    }

    /// Current environment overlay
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Run `body` with `path` (relative to the current directory) as the
    /// working directory.
    pub fn with_directory<T>(
        &mut self,
        path: impl AsRef<Path>,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let dir = self.current_dir().join(path);
        tracing::debug!(dir = %dir.display(), "entering directory");

        let depth = self.dirs.len();
        self.dirs.push(dir);
        let result = body(self);
        self.dirs.truncate(depth);

        result
    }

    /// Run `body` with `vars` merged over the environment overlay.
    pub fn with_environment<T, I, K, V>(
        &mut self,
        vars: I,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let saved = self.env.clone();
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));

        let result = body(self);
        self.env = saved;

        result
    }

    /// Run a command in the current directory and overlay.
    ///
    /// With [`Failure::Fatal`] a non-zero exit status becomes
    /// [`RunbookError::CommandFailed`]; with [`Failure::Probe`] the result is
    /// returned as is.
    pub fn run(&self, command: &CommandLine) -> Result<ExecutionResult> {
        let result = self
            .executor
            .run(command, self.current_dir(), &self.env)?;

        if command.failure == Failure::Fatal && !result.is_success() {
            let stderr = result.stderr.trim();
            return Err(RunbookError::CommandFailed {
                command: command.to_string(),
                code: result.exit_code,
                stderr: (!stderr.is_empty()).then(|| stderr.to_string()),
            });
        }

        Ok(result)
    }

    /// Parse and run a command string with the default (fatal) policy
    pub fn sh(&self, command: &str) -> Result<ExecutionResult> {
        self.run(&CommandLine::parse(command))
    }
}
