//! Static task registry
//!
//! Tasks are declared once at startup through [`Registry::register`] and are
//! never mutated afterwards. Registration order is kept for display.

use std::collections::HashMap;

use crate::error::{Result, RunbookError};
use crate::task::Task;

/// All tasks known to one invocation
#[derive(Debug, Default)]
pub struct Registry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task; names must be unique
    pub fn register(&mut self, task: Task) -> Result<&mut Self> {
        if self.index.contains_key(&task.name) {
            return Err(RunbookError::DuplicateTask { name: task.name });
        }

        tracing::trace!(task = %task.name, depends = ?task.depends, "registered");
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(self)
    }

    /// Get a task by name
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// Get a task by name or fail with `UnknownTask`
    pub fn require(&self, name: &str) -> Result<&Task> {
        self.get(name).ok_or_else(|| RunbookError::UnknownTask {
            name: name.to_string(),
            available: self.names_sorted(),
        })
    }

    /// Tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Task names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn names_sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names().map(str::to_string).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register(Task::new("docs", "Build docs"))
            .unwrap()
            .register(Task::new("build", "Build").depends(["docs"]))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["docs", "build"]);
        assert_eq!(registry.get("build").unwrap().depends, vec!["docs"]);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = Registry::new();
        registry.register(Task::new("docs", "")).unwrap();
        let err = registry.register(Task::new("docs", "again")).unwrap_err();
        assert!(matches!(err, RunbookError::DuplicateTask { name } if name == "docs"));
        assert_eq!(registry.get("docs").unwrap().desc, "");
    }

    #[test]
    fn test_require_lists_available() {
        let mut registry = Registry::new();
        registry.register(Task::new("todo", "")).unwrap();
        registry.register(Task::new("docs", "")).unwrap();

        match registry.require("nope") {
            Err(RunbookError::UnknownTask { name, available }) => {
                assert_eq!(name, "nope");
                assert_eq!(available, vec!["docs", "todo"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
