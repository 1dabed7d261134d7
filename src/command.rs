//! Command execution boundary
//!
//! Task bodies never spawn processes themselves. They describe a
//! [`CommandLine`] and hand it to the [`Context`](crate::context::Context),
//! which forwards it to a [`CommandExecutor`] together with the current
//! directory and environment overlay.
//!
//! - [`ProcessExecutor`] spawns real child processes.
//! - [`DryRunExecutor`] prints what would run.
//! - `ScriptedExecutor` records invocations and returns scripted results.
//!   It is compiled for tests and behind the `testing` feature.

#[cfg(any(test, feature = "testing"))]
use std::cell::RefCell;
use std::collections::BTreeMap;
#[cfg(any(test, feature = "testing"))]
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use console::style;

use crate::error::{Result, RunbookError};

/// What happens to the child's standard streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    /// Stream straight to the terminal
    #[default]
    Inherit,
    /// Collect stdout/stderr into the [`ExecutionResult`]
    Capture,
}

/// How a non-zero exit status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Failure {
    /// Non-zero status aborts the run with `CommandFailed`
    #[default]
    Fatal,
    /// Status and output are returned to the caller for inspection
    Probe,
}

/// A program plus arguments, with per-call capture and failure policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub capture: Capture,
    pub failure: Failure,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture: Capture::Inherit,
            failure: Failure::Fatal,
        }
    }

    /// Split a command string into program and arguments.
    ///
    /// Handles single and double quotes; no other shell syntax.
    pub fn parse(cmd: &str) -> Self {
        let mut parts = split_command(cmd).into_iter();
        let program = parts.next().unwrap_or_default();
        Self::new(program).args(parts)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Capture stdout/stderr instead of inheriting them
    pub fn captured(mut self) -> Self {
        self.capture = Capture::Capture;
        self
    }

    /// Report a non-zero status to the caller instead of failing
    pub fn probe(mut self) -> Self {
        self.failure = Failure::Probe;
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(part: &str) -> String {
    if part.is_empty() || part.contains(char::is_whitespace) {
        format!("\"{}\"", part)
    } else {
        part.to_string()
    }
}

fn split_command(cmd: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';

    for c in cmd.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

/// Outcome of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Empty unless the command was captured
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a single command in a directory with an environment overlay.
///
/// A non-zero exit status is NOT an error at this level; implementations
/// return `Err` only when the command could not be run at all.
pub trait CommandExecutor {
    fn run(
        &self,
        command: &CommandLine,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<ExecutionResult>;
}

/// Spawns real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Resolve the program against the overlay `PATH` (or the process one)
    fn resolve(program: &str, cwd: &Path, env: &BTreeMap<String, String>) -> Result<PathBuf> {
        let paths: Option<OsString> = env
            .get("PATH")
            .map(OsString::from)
            .or_else(|| std::env::var_os("PATH"));

        which::which_in(program, paths, cwd).map_err(|_| RunbookError::CommandNotFound {
            command: program.to_string(),
        })
    }
}

impl CommandExecutor for ProcessExecutor {
    fn run(
        &self,
        command: &CommandLine,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<ExecutionResult> {
        let program = Self::resolve(&command.program, cwd, env)?;
        tracing::debug!(command = %command, cwd = %cwd.display(), "spawning");

        let mut child = Command::new(&program);
        child.args(&command.args).current_dir(cwd).envs(env);

        let start = Instant::now();
        let result = match command.capture {
            Capture::Inherit => {
                let status = child
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()?;
                ExecutionResult {
                    exit_code: status.code().unwrap_or(1),
                    duration: start.elapsed(),
                    ..ExecutionResult::default()
                }
            }
            Capture::Capture => {
                let output = child
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()?;
                ExecutionResult {
                    exit_code: output.status.code().unwrap_or(1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration: start.elapsed(),
                }
            }
        };

        tracing::debug!(command = %command, code = result.exit_code, "exited");
        Ok(result)
    }
}

/// Prints commands instead of running them
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

impl CommandExecutor for DryRunExecutor {
    fn run(
        &self,
        command: &CommandLine,
        cwd: &Path,
        _env: &BTreeMap<String, String>,
    ) -> Result<ExecutionResult> {
        println!(
            "    {} {} {}",
            style("→").dim(),
            command,
            style(format!("({})", cwd.display())).dim()
        );
        Ok(ExecutionResult::success())
    }
}

/// One call seen by [`ScriptedExecutor`]
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// Test double: records every command and answers from a script.
///
/// Responses are keyed by the rendered command line; anything without a
/// scripted response succeeds with empty output.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: HashMap<String, ExecutionResult>,
    missing: Vec<String>,
    invocations: RefCell<Vec<Invocation>>,
}

#[cfg(any(test, feature = "testing"))]
impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `result`
    pub fn respond(mut self, command: &str, result: ExecutionResult) -> Self {
        self.responses.insert(command.to_string(), result);
        self
    }

    /// Make `command` exit with `code`
    pub fn fail(self, command: &str, code: i32) -> Self {
        self.respond(command, ExecutionResult::failure(code))
    }

    /// Pretend `program` is not installed
    pub fn missing(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// Rendered command lines, in call order
    pub fn commands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(|i| i.command.clone())
            .collect()
    }
}

#[cfg(any(test, feature = "testing"))]
impl CommandExecutor for ScriptedExecutor {
    fn run(
        &self,
        command: &CommandLine,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<ExecutionResult> {
        if self.missing.contains(&command.program) {
            return Err(RunbookError::CommandNotFound {
                command: command.program.clone(),
            });
        }

        let rendered = command.to_string();
        self.invocations.borrow_mut().push(Invocation {
            command: rendered.clone(),
            cwd: cwd.to_path_buf(),
            env: env.clone(),
        });

        Ok(self.responses.get(&rendered).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let cmd = CommandLine::parse("cargo test --all");
        assert_eq!(cmd.program, "cargo");
        assert_eq!(cmd.args, vec!["test", "--all"]);
        assert_eq!(cmd.failure, Failure::Fatal);
        assert_eq!(cmd.capture, Capture::Inherit);
    }

    #[test]
    fn test_parse_command_with_quotes() {
        let cmd = CommandLine::parse(r#"git commit -m "hello world""#);
        assert_eq!(cmd.args, vec!["commit", "-m", "hello world"]);
        assert_eq!(cmd.to_string(), r#"git commit -m "hello world""#);
    }

    #[test]
    fn test_builder_flags_are_per_call() {
        let probe = CommandLine::new("git")
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .captured()
            .probe();
        assert_eq!(probe.capture, Capture::Capture);
        assert_eq!(probe.failure, Failure::Probe);

        let plain = CommandLine::new("git").arg("status");
        assert_eq!(plain.failure, Failure::Fatal);
    }

    #[test]
    fn test_scripted_executor_records_and_responds() {
        let exec = ScriptedExecutor::new()
            .respond("git branch", ExecutionResult::with_stdout("develop\n"))
            .fail("make html", 2);
        let cwd = Path::new("/project");
        let env = BTreeMap::new();

        let ok = exec.run(&CommandLine::parse("git branch"), cwd, &env).unwrap();
        assert_eq!(ok.stdout, "develop\n");

        let failed = exec.run(&CommandLine::parse("make html"), cwd, &env).unwrap();
        assert_eq!(failed.exit_code, 2);

        let other = exec.run(&CommandLine::parse("ls"), cwd, &env).unwrap();
        assert!(other.is_success());

        assert_eq!(exec.commands(), vec!["git branch", "make html", "ls"]);
        assert_eq!(exec.invocations()[0].cwd, cwd);
    }

    #[test]
    fn test_scripted_missing_program() {
        let exec = ScriptedExecutor::new().missing("twine");
        let result = exec.run(
            &CommandLine::parse("twine upload x.whl"),
            Path::new("."),
            &BTreeMap::new(),
        );
        assert!(matches!(result, Err(RunbookError::CommandNotFound { .. })));
        assert!(exec.commands().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = BTreeMap::new();
        env.insert("RUNBOOK_GREETING".to_string(), "hello".to_string());

        let cmd = CommandLine::new("sh")
            .args(["-c", "echo $RUNBOOK_GREETING; pwd"])
            .captured();
        let result = ProcessExecutor.run(&cmd, dir.path(), &env).unwrap();

        assert!(result.is_success());
        let mut lines = result.stdout.lines();
        assert_eq!(lines.next(), Some("hello"));
        let pwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(pwd.canonicalize().unwrap(), dir.path().canonicalize().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_reports_status() {
        let cmd = CommandLine::new("sh").args(["-c", "exit 7"]).captured();
        let result = ProcessExecutor
            .run(&cmd, Path::new("."), &BTreeMap::new())
            .unwrap();
        assert_eq!(result.exit_code, 7);
    }

    #[test]
    fn test_process_executor_missing_program() {
        let cmd = CommandLine::new("runbook-no-such-program-anywhere");
        let result = ProcessExecutor.run(&cmd, Path::new("."), &BTreeMap::new());
        assert!(matches!(result, Err(RunbookError::CommandNotFound { .. })));
    }
}
