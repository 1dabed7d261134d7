//! Task definitions
//!
//! A [`Task`] is a named unit of work: an ordered list of prerequisite task
//! names, the options it accepts, and a body that issues commands through
//! the [`Context`].

use std::collections::BTreeMap;
use std::fmt;

use crate::context::Context;
use crate::error::{Result, RunbookError};

/// Body of a task
pub type TaskBody = Box<dyn Fn(&mut Context<'_>, &Options) -> Result<()>>;

/// Value of a single task option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// An option a task declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub help: String,
    pub default: OptionValue,
}

impl OptionSpec {
    /// Command-line spelling of the option (`_` becomes `-`)
    pub fn flag_name(&self) -> String {
        self.name.replace('_', "-")
    }
}

/// Options handed to one task body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(BTreeMap<String, OptionValue>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: OptionValue) {
        self.0.insert(name.into(), value);
    }

    /// Boolean option, `false` when absent or not a boolean
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(OptionValue::Bool(true)))
    }

    /// String option
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(OptionValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A named unit of work
pub struct Task {
    pub name: String,
    pub desc: String,
    pub depends: Vec<String>,
    pub options: Vec<OptionSpec>,
    body: Option<TaskBody>,
}

impl Task {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            depends: Vec::new(),
            options: Vec::new(),
            body: None,
        }
    }

    /// Prerequisites, run left to right before this task
    pub fn depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.extend(depends.into_iter().map(Into::into));
        self
    }

    /// Declare a boolean option
    pub fn flag(mut self, name: &str, default: bool, help: &str) -> Self {
        self.options.push(OptionSpec {
            name: name.to_string(),
            help: help.to_string(),
            default: OptionValue::Bool(default),
        });
        self
    }

    /// Declare a string option
    pub fn text(mut self, name: &str, default: &str, help: &str) -> Self {
        self.options.push(OptionSpec {
            name: name.to_string(),
            help: help.to_string(),
            default: OptionValue::Str(default.to_string()),
        });
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Options) -> Result<()> + 'static,
    {
        self.body = Some(Box::new(body));
        self
    }

    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Reject options this task does not declare or whose kind differs
    /// from the declared default.
    pub fn check_options(&self, options: &Options) -> Result<()> {
        for (name, value) in options.iter() {
            let spec = self.option(name).ok_or_else(|| RunbookError::InvalidOption {
                task: self.name.clone(),
                option: name.to_string(),
                reason: "not declared by this task".to_string(),
            })?;

            let same_kind = matches!(
                (&spec.default, value),
                (OptionValue::Bool(_), OptionValue::Bool(_)) | (OptionValue::Str(_), OptionValue::Str(_))
            );
            if !same_kind {
                return Err(RunbookError::InvalidOption {
                    task: self.name.clone(),
                    option: name.to_string(),
                    reason: format!("expected a value like '{}', got '{}'", spec.default, value),
                });
            }
        }
        Ok(())
    }

    /// Every declared option at its default value
    pub fn default_options(&self) -> Options {
        let mut options = Options::new();
        for spec in &self.options {
            options.set(spec.name.clone(), spec.default.clone());
        }
        options
    }

    /// Declared defaults with `overrides` laid over them
    pub fn options_with(&self, overrides: &Options) -> Options {
        let mut options = self.default_options();
        for (name, value) in overrides.iter() {
            options.set(name, value.clone());
        }
        options
    }

    /// Whether the task does anything beyond its prerequisites
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Run the body; a task without one succeeds immediately
    pub fn run(&self, ctx: &mut Context<'_>, options: &Options) -> Result<()> {
        match &self.body {
            Some(body) => body(ctx, options),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("desc", &self.desc)
            .field("depends", &self.depends)
            .field("options", &self.options)
            .field("has_body", &self.has_body())
            .finish()
    }
}
