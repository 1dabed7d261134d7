//! CLI command definitions and handling
//!
//! Uses the `clap` derive API for the fixed surface and a builder-built
//! `clap::Command` per task for that task's options.

use std::path::PathBuf;

use clap::{Arg, ArgAction, Parser, Subcommand, ValueEnum};

use crate::error::Result;
use crate::task::{OptionValue, Options, Task};

/// runbook - run project automation tasks with their prerequisites
#[derive(Parser, Debug)]
#[command(name = "runbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to runbook.toml config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banners and status lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Working directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a task and its prerequisites
    Run {
        /// Task to run
        task: String,

        /// Options of the task, e.g. `--no-docs --bytecode`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List available tasks
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: ListFormat,

        /// Show task dependencies
        #[arg(long)]
        deps: bool,
    },

    /// Show task dependency graph
    Graph {
        /// Task to show graph for (all tasks if not specified)
        task: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Initialize a new runbook.toml
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Validate runbook.toml and the task graph
    Check,

    /// Any other name is a task, followed by its options
    /// (shorthand for `runbook run <task>`)
    #[command(external_subcommand)]
    Task(Vec<String>),
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ListFormat {
    #[default]
    Table,
    Json,
    Plain,
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum GraphFormat {
    #[default]
    Text,
    Dot,
    Json,
}

impl Cli {
    /// Get the effective command, treating bare task names as `run <task>`
    pub fn effective_command(&self) -> EffectiveCommand<'_> {
        match &self.command {
            Some(Commands::Run { task, args }) => EffectiveCommand::RunTask { task, args },
            Some(Commands::Task(words)) => match words.split_first() {
                Some((task, args)) => EffectiveCommand::RunTask { task, args },
                None => EffectiveCommand::None,
            },
            Some(Commands::List { format, deps }) => EffectiveCommand::List {
                format: format.clone(),
                deps: *deps,
            },
            Some(Commands::Graph { task, format }) => EffectiveCommand::Graph {
                task: task.as_deref(),
                format: format.clone(),
            },
            Some(Commands::Init { force }) => EffectiveCommand::Init { force: *force },
            Some(Commands::Check) => EffectiveCommand::Check,
            None => EffectiveCommand::None,
        }
    }
}

/// What to do, with the bare-task shorthand folded into `RunTask`
pub enum EffectiveCommand<'a> {
    List { format: ListFormat, deps: bool },
    Graph { task: Option<&'a str>, format: GraphFormat },
    Init { force: bool },
    Check,
    RunTask { task: &'a str, args: &'a [String] },
    None,
}

fn negated_id(name: &str) -> String {
    format!("no_{}", name)
}

/// Parser for one task's options.
///
/// A boolean option `x` is spelled `--x` / `--no-x` (last one wins); a
/// string option `y` is spelled `--y <VALUE>`.
pub fn task_command(task: &Task) -> clap::Command {
    let mut cmd = clap::Command::new(task.name.clone())
        .about(task.desc.clone())
        .no_binary_name(true)
        .disable_version_flag(true);

    for spec in &task.options {
        let long = spec.flag_name();
        cmd = match &spec.default {
            OptionValue::Bool(default) => {
                let negated = negated_id(&spec.name);
                cmd.arg(
                    Arg::new(spec.name.clone())
                        .long(long.clone())
                        .action(ArgAction::SetTrue)
                        .overrides_with(negated.clone())
                        .help(format!("{} [default: {}]", spec.help, default)),
                )
                .arg(
                    Arg::new(negated)
                        .long(format!("no-{}", long))
                        .action(ArgAction::SetTrue)
                        .overrides_with(spec.name.clone())
                        .help(format!("Disable --{}", long)),
                )
            }
            OptionValue::Str(default) => cmd.arg(
                Arg::new(spec.name.clone())
                    .long(long)
                    .value_name("VALUE")
                    .default_value(default.clone())
                    .help(spec.help.clone()),
            ),
        };
    }

    cmd
}

/// Parse command-line option arguments for `task` over its defaults
pub fn parse_task_options(task: &Task, args: &[String]) -> Result<Options> {
    let matches = task_command(task).try_get_matches_from(args)?;
    let mut options = task.default_options();

    for spec in &task.options {
        match spec.default {
            OptionValue::Bool(_) => {
                if matches.get_flag(&spec.name) {
                    options.set(spec.name.clone(), OptionValue::Bool(true));
                } else if matches.get_flag(&negated_id(&spec.name)) {
                    options.set(spec.name.clone(), OptionValue::Bool(false));
                }
            }
            OptionValue::Str(_) => {
                if let Some(value) = matches.get_one::<String>(&spec.name) {
                    options.set(spec.name.clone(), OptionValue::Str(value.clone()));
                }
            }
        }
    }

    tracing::debug!(task = %task.name, ?options, "parsed task options");
    Ok(options)
}
