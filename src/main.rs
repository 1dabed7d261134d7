//! runbook - project automation runner
//!
//! Named project tasks with explicit prerequisites:
//! - Depth-first resolution, every prerequisite runs once
//! - Sequential execution that stops at the first failure
//! - Scoped working directory and environment for commands
//! - Dry runs that print every command instead of spawning it

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use runbook::cli::{self, Cli, EffectiveCommand, GraphFormat, ListFormat};
use runbook::command::CommandExecutor;
use runbook::config::CONFIG_FILES;
use runbook::{
    tasks, Config, Context, DryRunExecutor, Executor, ExecutorConfig, OptionValue, ProcessExecutor,
    Registry, Result, RunbookError, TaskGraph,
};

fn main() -> ExitCode {
    // Set up panic handler for nice error messages
    miette::set_panic_hook();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunbookError::Usage(e)) => e.exit(),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{}: {:?}", style("error").red().bold(), miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Some(cwd) = &cli.cwd {
        std::env::set_current_dir(cwd)?;
    }

    let registry = tasks::builtin()?;

    match cli.effective_command() {
        EffectiveCommand::RunTask { task, args } => run_task(&registry, task, args, cli),

        EffectiveCommand::List { format, deps } => {
            let graph = TaskGraph::new(&registry)?;
            print_task_list(&graph, format, deps)
        }

        EffectiveCommand::Graph { task, format } => {
            let graph = TaskGraph::new(&registry)?;
            print_graph(&graph, task, format)
        }

        EffectiveCommand::Init { force } => init_config(force),

        EffectiveCommand::Check => check(&registry, cli),

        EffectiveCommand::None => {
            let graph = TaskGraph::new(&registry)?;
            print_task_list(&graph, ListFormat::Table, false)
        }
    }
}

fn check(registry: &Registry, cli: &Cli) -> Result<()> {
    let graph = TaskGraph::new(registry)?;
    let count = graph.registry().len();

    match Config::load(cli.config.as_deref()) {
        Ok((config, path)) => println!(
            "{} {} is valid ({} tasks, package {})",
            style("✓").green(),
            path.display(),
            count,
            style(&config.project.package).bold()
        ),
        Err(RunbookError::ConfigNotFound { .. }) if cli.config.is_none() => {
            let config = Config::load_or_default(None, &std::env::current_dir()?)?;
            println!(
                "{} task graph is valid ({} tasks); no {} found, package defaults to {}",
                style("✓").green(),
                count,
                CONFIG_FILES[0],
                style(&config.project.package).bold()
            );
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

fn run_task(registry: &Registry, task_name: &str, args: &[String], cli: &Cli) -> Result<()> {
    // Name, graph and options are all checked before anything runs.
    let task = registry.require(task_name)?;
    let options = cli::parse_task_options(task, args)?;
    TaskGraph::new(registry)?;

    let (config, path) = Config::load(cli.config.as_deref())?;
    let root = std::env::current_dir()?;
    tracing::debug!(config = %path.display(), root = %root.display(), task = task_name, "starting run");

    let executor: &dyn CommandExecutor = if cli.dry_run {
        &DryRunExecutor
    } else {
        &ProcessExecutor
    };

    let mut ctx = Context::new(executor, &config.project, root)
        .with_env(config.env.clone())
        .with_quiet(cli.quiet);

    let exec_config = ExecutorConfig {
        dry_run: cli.dry_run,
        quiet: cli.quiet,
    };

    Executor::new(registry, exec_config).execute(&mut ctx, task_name, &options)?;
    Ok(())
}

fn print_task_list(graph: &TaskGraph, format: ListFormat, show_deps: bool) -> Result<()> {
    let registry = graph.registry();

    match format {
        ListFormat::Table => {
            println!("{}", style("Available tasks:").bold());
            println!();

            let names = registry.names_sorted();
            let max_name_len = names.iter().map(|n| n.len()).max().unwrap_or(0);

            for name in &names {
                let Some(task) = registry.get(name) else {
                    continue;
                };

                print!(
                    "  {}{}  {}",
                    style(name).cyan().bold(),
                    " ".repeat(max_name_len - name.len()),
                    style(&task.desc).dim()
                );

                if show_deps && !task.depends.is_empty() {
                    print!(
                        " {}",
                        style(format!("[deps: {}]", task.depends.join(", "))).yellow().dim()
                    );
                }

                println!();

                for spec in &task.options {
                    let flag = match spec.default {
                        OptionValue::Bool(_) => format!("--[no-]{}", spec.flag_name()),
                        OptionValue::Str(_) => format!("--{} <VALUE>", spec.flag_name()),
                    };
                    println!(
                        "  {}    {} {}",
                        " ".repeat(max_name_len),
                        style(flag).dim(),
                        style(format!("(default: {})", spec.default)).dim()
                    );
                }
            }
        }

        ListFormat::Json => {
            let mut tasks = serde_json::Map::new();
            for task in registry.tasks() {
                let mut obj = serde_json::Map::new();
                obj.insert("description".to_string(), serde_json::json!(task.desc));

                let options: serde_json::Map<String, serde_json::Value> = task
                    .default_options()
                    .iter()
                    .map(|(name, value)| (name.to_string(), serde_json::json!(value.to_string())))
                    .collect();
                obj.insert("options".to_string(), serde_json::Value::Object(options));

                if show_deps {
                    obj.insert("depends".to_string(), serde_json::json!(task.depends));
                    obj.insert(
                        "dependents".to_string(),
                        serde_json::json!(graph.dependents(&task.name).unwrap_or_default()),
                    );
                }
                tasks.insert(task.name.clone(), serde_json::Value::Object(obj));
            }
            println!("{}", to_json(&tasks)?);
        }

        ListFormat::Plain => {
            for name in registry.names_sorted() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn print_graph(graph: &TaskGraph, task: Option<&str>, format: GraphFormat) -> Result<()> {
    let tasks = if let Some(name) = task {
        graph.execution_order(name)?
    } else {
        graph.all_tasks_ordered()?
    };

    match format {
        GraphFormat::Text => {
            println!("{}", style("Task dependency graph:").bold());
            println!();

            for (i, task_node) in tasks.iter().enumerate() {
                let deps = graph.dependencies(&task_node.name).unwrap_or_default();
                let step = style(format!("{:>2}.", i + 1)).dim();

                if deps.is_empty() {
                    println!("  {} {}", step, style(&task_node.name).cyan().bold());
                } else {
                    println!(
                        "  {} {} {} {}",
                        step,
                        style(&task_node.name).cyan().bold(),
                        style("←").dim(),
                        deps.join(", ")
                    );
                }
            }

            if task.is_none() {
                println!();
                println!(
                    "{} {}",
                    style("Entry points:").bold(),
                    graph.roots().join(", ")
                );
            }
        }

        GraphFormat::Dot => {
            println!("digraph runbook {{");
            println!("  rankdir=LR;");
            println!("  node [shape=box];");

            for task_node in &tasks {
                println!("  \"{}\";", task_node.name);
                for dep in &task_node.depends {
                    println!("  \"{}\" -> \"{}\";", dep, task_node.name);
                }
            }

            println!("}}");
        }

        GraphFormat::Json => {
            let mut nodes = Vec::new();
            let mut edges = Vec::new();

            for task_node in &tasks {
                nodes.push(serde_json::json!({
                    "id": task_node.name,
                    "description": task_node.desc,
                }));

                for dep in &task_node.depends {
                    edges.push(serde_json::json!({
                        "from": dep,
                        "to": task_node.name,
                    }));
                }
            }

            let output = serde_json::json!({
                "order": tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "nodes": nodes,
                "edges": edges,
            });

            println!("{}", to_json(&output)?);
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn init_config(force: bool) -> Result<()> {
    let file_name = CONFIG_FILES[0];
    let path = Path::new(file_name);

    if path.exists() && !force {
        return Err(RunbookError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    let cwd = std::env::current_dir()?;
    let package = Config::load_or_default(None, &cwd)
        .map(|c| c.project.package)
        .unwrap_or_else(|_| "project".to_string());

    let template = format!(
        r#"# {file_name} - project automation settings

[project]
package = "{package}"                   # source package directory
# application = "{package}"             # display name
# distribution = "{distribution}"       # sdist / wheel base name
# version_file = "{package}/__init__.py"
# remote = "upstream"                   # remote checked for existing tags
# release_branch = "develop"            # branch releases are cut from

[env]
# Initial environment for every command, `$VAR` and `~` are expanded
# PYTHONHASHSEED = "0"
"#,
        distribution = package.replace('_', "-"),
    );

    std::fs::write(path, template)?;

    println!("{} Created {}", style("✓").green(), style(file_name).bold());

    Ok(())
}
