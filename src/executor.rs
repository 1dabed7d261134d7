//! Task execution engine
//!
//! Runs a resolved order of tasks one after another against a shared
//! [`Context`]. The first failing task aborts the run; tasks that already
//! finished are not rolled back.

use std::time::{Duration, Instant};

use console::style;

use crate::context::Context;
use crate::error::Result;
use crate::graph::resolve;
use crate::registry::Registry;
use crate::task::{Options, Task};

/// Result of executing a single task
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub name: String,
    pub success: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Executor configuration
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Commands are printed, not run
    pub dry_run: bool,
    /// No per-task status lines or summary
    pub quiet: bool,
}

/// Task executor
pub struct Executor<'r> {
    registry: &'r Registry,
    config: ExecutorConfig,
}

impl<'r> Executor<'r> {
    pub fn new(registry: &'r Registry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Resolve `task_name` and run it with its prerequisites.
    ///
    /// `options` are laid over the requested task's declared defaults;
    /// every prerequisite gets its declared defaults only.
    pub fn execute(
        &self,
        ctx: &mut Context<'_>,
        task_name: &str,
        options: &Options,
    ) -> Result<Vec<TaskResult>> {
        let order = resolve(self.registry, task_name)?;
        self.registry.require(task_name)?.check_options(options)?;

        if self.config.dry_run && !self.config.quiet {
            println!("{}", style("Execution plan (dry run):").bold().cyan());
        }

        self.run_order(&order, ctx, task_name, options)
    }

    /// Run an already resolved order, stopping at the first failure
    pub fn run_order(
        &self,
        order: &[&Task],
        ctx: &mut Context<'_>,
        requested: &str,
        options: &Options,
    ) -> Result<Vec<TaskResult>> {
        let mut results = Vec::with_capacity(order.len());

        for (i, task) in order.iter().enumerate() {
            let task_options = if task.name == requested {
                task.options_with(options)
            } else {
                task.default_options()
            };

            tracing::info!(task = %task.name, step = i + 1, of = order.len(), "running");
            if self.config.dry_run && !self.config.quiet {
                println!("{} {}", style(format!("Step {}:", i + 1)).bold(), task.name);
            }

            let start = Instant::now();
            let outcome = task.run(ctx, &task_options);
            let result = TaskResult {
                name: task.name.clone(),
                success: outcome.is_ok(),
                duration: start.elapsed(),
                error: outcome.as_ref().err().map(|e| e.to_string()),
            };

            if !self.config.dry_run {
                self.print_task_result(&result);
            }
            results.push(result);

            if let Err(e) = outcome {
                tracing::info!(task = %task.name, skipped = order.len() - i - 1, "aborting run");
                self.print_summary(&results, order.len());
                return Err(e);
            }
        }

        self.print_summary(&results, order.len());
        Ok(results)
    }

    /// Print result of a single task
    fn print_task_result(&self, result: &TaskResult) {
        if self.config.quiet {
            return;
        }

        let status = if result.success {
            style("✓").green()
        } else {
            style("✗").red()
        };

        let duration = format!("{:.2}s", result.duration.as_secs_f64());

        println!(
            "{} {} {}",
            status,
            style(&result.name).bold(),
            style(duration).dim()
        );
    }

    /// Print execution summary
    fn print_summary(&self, results: &[TaskResult], planned: usize) {
        if self.config.quiet || self.config.dry_run {
            return;
        }

        println!();

        let total: Duration = results.iter().map(|r| r.duration).sum();
        let succeeded = results.iter().filter(|r| r.success).count();

        if succeeded == planned {
            println!(
                "{} {} tasks completed in {:.2}s",
                style("✓").green().bold(),
                succeeded,
                total.as_secs_f64(),
            );
        } else {
            println!(
                "{} {} succeeded, 1 failed, {} not run ({:.2}s)",
                style("✗").red().bold(),
                succeeded,
                planned - results.len(),
                total.as_secs_f64()
            );
        }
    }
}
