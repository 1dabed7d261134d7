//! Task graph construction and dependency resolution
//!
//! [`resolve`] turns a requested task into its execution order: a
//! depth-first, pre-order expansion of prerequisites in declared order,
//! each task emitted once, right after its own prerequisites.
//!
//! [`TaskGraph`] mirrors the whole registry in a petgraph DAG, validated
//! up front, for the `list` / `graph` / `check` views.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use crate::error::{Result, RunbookError};
use crate::registry::Registry;
use crate::task::Task;

/// Execution order for `requested`, prerequisites first.
///
/// Fails with `UnknownTask` when the task or any prerequisite is missing and
/// with `CycleDetected` when a task is reached again while it is still being
/// expanded. Nothing runs either way.
pub fn resolve<'r>(registry: &'r Registry, requested: &str) -> Result<Vec<&'r Task>> {
    let root = registry.require(requested)?;
    let mut resolver = Resolver::new(registry);
    resolver.visit(root)?;

    tracing::debug!(
        task = requested,
        order = ?resolver.order.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        "resolved"
    );
    Ok(resolver.order)
}

/// Every task in the registry, each after its prerequisites, starting from
/// registration order.
pub fn resolve_all(registry: &Registry) -> Result<Vec<&Task>> {
    let mut resolver = Resolver::new(registry);
    for task in registry.tasks() {
        resolver.visit(task)?;
    }
    Ok(resolver.order)
}

struct Resolver<'r> {
    registry: &'r Registry,
    stack: Vec<&'r str>,
    done: HashSet<&'r str>,
    order: Vec<&'r Task>,
}

impl<'r> Resolver<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            stack: Vec::new(),
            done: HashSet::new(),
            order: Vec::new(),
        }
    }

    fn visit(&mut self, task: &'r Task) -> Result<()> {
        if self.done.contains(task.name.as_str()) {
            return Ok(());
        }

        if let Some(pos) = self.stack.iter().position(|&n| n == task.name) {
            let mut path: Vec<&str> = self.stack[pos..].to_vec();
            path.push(&task.name);
            return Err(RunbookError::CycleDetected {
                cycle: path.join(" -> "),
            });
        }

        self.stack.push(&task.name);
        for dep in &task.depends {
            let dep_task = self.registry.get(dep).ok_or_else(|| {
                tracing::debug!(task = %task.name, missing = %dep, "unknown prerequisite");
                RunbookError::UnknownTask {
                    name: dep.clone(),
                    available: self.registry.names_sorted(),
                }
            })?;
            self.visit(dep_task)?;
        }
        self.stack.pop();

        self.done.insert(&task.name);
        self.order.push(task);
        Ok(())
    }
}

/// The task dependency graph
#[derive(Debug)]
pub struct TaskGraph<'r> {
    registry: &'r Registry,
    graph: DiGraph<&'r str, ()>,
    name_to_index: HashMap<&'r str, NodeIndex>,
}

impl<'r> TaskGraph<'r> {
    /// Build and validate the graph of the whole registry
    pub fn new(registry: &'r Registry) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut name_to_index = HashMap::new();

        for task in registry.tasks() {
            let idx = graph.add_node(task.name.as_str());
            name_to_index.insert(task.name.as_str(), idx);
        }

        for task in registry.tasks() {
            let task_idx = name_to_index[task.name.as_str()];

            for dep in &task.depends {
                let dep_idx = name_to_index.get(dep.as_str()).ok_or_else(|| {
                    RunbookError::UnknownTask {
                        name: dep.clone(),
                        available: registry.names_sorted(),
                    }
                })?;

                // Edge goes from dependency TO dependent (dep must run first)
                graph.add_edge(*dep_idx, task_idx, ());
            }
        }

        // Expanding every task reports any cycle with its path.
        resolve_all(registry)?;

        Ok(Self {
            registry,
            graph,
            name_to_index,
        })
    }

    /// Get execution order for a specific task (including dependencies)
    pub fn execution_order(&self, task_name: &str) -> Result<Vec<&'r Task>> {
        resolve(self.registry, task_name)
    }

    /// Get all tasks in dependency order
    pub fn all_tasks_ordered(&self) -> Result<Vec<&'r Task>> {
        resolve_all(self.registry)
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Direct prerequisites of a task, in declared order
    pub fn dependencies(&self, name: &str) -> Option<Vec<&'r str>> {
        self.registry
            .get(name)
            .map(|t| t.depends.iter().map(String::as_str).collect())
    }

    /// Tasks that list the given task as a prerequisite
    pub fn dependents(&self, name: &str) -> Option<Vec<&'r str>> {
        self.name_to_index.get(name).map(|&idx| {
            let mut names: Vec<&str> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .map(|dep_idx| self.graph[dep_idx])
                .collect();
            names.sort_unstable();
            names.dedup();
            names
        })
    }

    /// Tasks with no dependents
    pub fn roots(&self) -> Vec<&'r str> {
        self.registry
            .tasks()
            .filter(|t| {
                self.graph
                    .neighbors_directed(self.name_to_index[t.name.as_str()], Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|t| t.name.as_str())
            .collect()
    }
}
