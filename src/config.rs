//! Configuration parsing for runbook.toml
//!
//! The configuration only supplies values that get substituted into command
//! lines and paths (package, display and distribution names) plus an initial
//! environment overlay. It is loaded once at startup and handed to the
//! [`Context`](crate::context::Context).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, RunbookError};

/// Default config file names to search for
pub const CONFIG_FILES: &[&str] = &["runbook.toml", "Runbook.toml"];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Names substituted into commands
    pub project: ProjectConfig,

    /// Initial environment overlay for every command
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Project identity and release settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Source package directory, e.g. `colour_demosaicing`
    pub package: String,

    /// Human readable application name
    #[serde(default)]
    pub application: Option<String>,

    /// Distribution (sdist / wheel) base name, e.g. `colour-demosaicing`
    #[serde(default)]
    pub distribution: Option<String>,

    /// File holding the `__major_version__` style version declarations
    #[serde(default)]
    pub version_file: Option<PathBuf>,

    /// Remote consulted for existing release tags
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Branch releases must be cut from
    #[serde(default = "default_release_branch")]
    pub release_branch: String,
}

fn default_remote() -> String {
    "upstream".to_string()
}

fn default_release_branch() -> String {
    "develop".to_string()
}

impl ProjectConfig {
    /// Configuration derived from a package name alone.
    pub fn named(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            application: None,
            distribution: None,
            version_file: None,
            remote: default_remote(),
            release_branch: default_release_branch(),
        }
    }

    /// Display name, falling back to the package name.
    pub fn application_name(&self) -> &str {
        self.application.as_deref().unwrap_or(&self.package)
    }

    /// Distribution name, falling back to the package name with `_` -> `-`.
    pub fn distribution_name(&self) -> String {
        self.distribution
            .clone()
            .unwrap_or_else(|| self.package.replace('_', "-"))
    }

    /// Path of the version declarations, relative to the project root.
    pub fn version_file(&self) -> PathBuf {
        self.version_file
            .clone()
            .unwrap_or_else(|| Path::new(&self.package).join("__init__.py"))
    }
}

impl Config {
    /// Load configuration from the specified path or search for it
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let config_path = match path {
            Some(p) => {
                if p.exists() {
                    p.to_path_buf()
                } else {
                    return Err(RunbookError::ConfigNotFound {
                        searched: vec![p.to_path_buf()],
                    });
                }
            }
            None => Self::find_config()?,
        };

        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::parse(&content, &config_path)?;

        tracing::debug!(path = %config_path.display(), package = %config.project.package, "loaded configuration");
        Ok((config, config_path))
    }

    /// Load the configuration if one can be found, otherwise derive one from
    /// the directory name. Used by commands that only inspect the registry.
    pub fn load_or_default(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok((config, _)) => Ok(config),
            Err(RunbookError::ConfigNotFound { .. }) if path.is_none() => {
                let package = cwd
                    .file_name()
                    .map(|n| n.to_string_lossy().replace('-', "_"))
                    .unwrap_or_else(|| "project".to_string());
                tracing::debug!(%package, "no configuration found, using directory name");
                Ok(Self {
                    project: ProjectConfig::named(package),
                    env: BTreeMap::new(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(content).map_err(|e| RunbookError::ConfigParse {
            source: e,
            path: path.to_path_buf(),
        })?;

        config.validate()?;
        config.expand_env()?;
        Ok(config)
    }

    /// Search for config file starting from current directory
    fn find_config() -> Result<PathBuf> {
        let mut current = std::env::current_dir()?;
        let mut searched = Vec::new();

        loop {
            for name in CONFIG_FILES {
                let candidate = current.join(name);
                searched.push(candidate.clone());
                if candidate.exists() {
                    return Ok(candidate);
                }
            }

            if !current.pop() {
                break;
            }
        }

        Err(RunbookError::ConfigNotFound { searched })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let package = self.project.package.trim();
        if package.is_empty() {
            return Err(RunbookError::InvalidConfig {
                reason: "project.package must not be empty".to_string(),
            });
        }

        if package.contains(char::is_whitespace) || package.contains('/') {
            return Err(RunbookError::InvalidConfig {
                reason: format!("project.package '{}' is not a valid package name", package),
            });
        }

        if let Some(key) = self.env.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(RunbookError::InvalidConfig {
                reason: format!("invalid environment variable name '{}'", key),
            });
        }

        Ok(())
    }

    /// Expand `$VAR` and `~` references in environment values
    fn expand_env(&mut self) -> Result<()> {
        for (key, value) in self.env.iter_mut() {
            let expanded = shellexpand::full(value).map_err(|e| RunbookError::InvalidConfig {
                reason: format!("env.{}: {}", key, e),
            })?;
            *value = expanded.into_owned();
        }
        Ok(())
    }
}
