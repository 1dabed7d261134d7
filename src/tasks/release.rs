//! Release tasks
//!
//! `tag` reads the version from the project's version file and refuses to
//! tag off the release branch or over an existing remote tag. `release`
//! uploads the built distributions.

use std::collections::BTreeSet;
use std::path::Path;

use crate::command::CommandLine;
use crate::context::Context;
use crate::error::{Result, RunbookError};
use crate::task::Task;

use super::{glob_args, message_box};

const VERSION_KEYS: [&str; 3] = ["__major_version__", "__minor_version__", "__change_version__"];

pub(super) fn tag() -> Task {
    Task::new(
        "tag",
        "Tags the repository according to the defined version using git-flow",
    )
    .body(|ctx, _| {
        message_box(ctx, "Tagging...");
        let project = ctx.project();

        let branch = current_branch(ctx)?;
        if branch != project.release_branch {
            return Err(precondition(format!(
                "Are you still on a feature or master branch? (on '{}', releases are cut from '{}')",
                branch, project.release_branch
            )));
        }

        let version = read_version(&ctx.root_dir().join(project.version_file()))?;
        let tag = format!("v{}", version);

        let tags = remote_tags(ctx, &project.remote)?;
        if tags.contains(&tag) {
            return Err(precondition(format!(
                "A \"{}\" \"{}\" tag already exists in remote repository!",
                project.package, tag
            )));
        }

        ctx.run(&CommandLine::new("git").args(["flow", "release", "start"]).arg(tag.as_str()))?;
        ctx.run(&CommandLine::new("git").args(["flow", "release", "finish"]).arg(tag.as_str()))?;
        Ok(())
    })
}

pub(super) fn release() -> Task {
    Task::new("release", "Releases the project to Pypi with Twine")
        .depends(["clean", "build"])
        .body(|ctx, _| {
            message_box(ctx, "Releasing...");
            ctx.with_directory("dist", |ctx| {
                for pattern in ["*.tar.gz", "*.whl"] {
                    let files = glob_args(ctx, pattern)?;
                    ctx.run(&CommandLine::new("twine").arg("upload").args(files))?;
                }
                Ok(())
            })
        })
}

fn precondition(message: String) -> RunbookError {
    RunbookError::Precondition {
        task: "tag".to_string(),
        message,
    }
}

fn current_branch(ctx: &Context<'_>) -> Result<String> {
    let probe = CommandLine::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .captured()
        .probe();
    let result = ctx.run(&probe)?;
    if !result.is_success() {
        return Err(precondition(format!(
            "could not determine the current branch: {}",
            result.stderr.trim()
        )));
    }
    Ok(result.stdout.trim().to_string())
}

fn remote_tags(ctx: &Context<'_>, remote: &str) -> Result<BTreeSet<String>> {
    let probe = CommandLine::new("git")
        .args(["ls-remote", "--tags", remote])
        .captured()
        .probe();
    let result = ctx.run(&probe)?;
    if !result.is_success() {
        return Err(precondition(format!(
            "could not list tags of remote '{}': {}",
            remote,
            result.stderr.trim()
        )));
    }
    Ok(parse_remote_tags(&result.stdout))
}

/// Tag names from `git ls-remote --tags` output, peeled entries folded in
fn parse_remote_tags(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_once("refs/tags/"))
        .map(|(_, tag)| tag.trim().trim_end_matches("^{}").to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Read `major.minor.change` from `__major_version__ = '0'` style lines
fn read_version(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        precondition(format!("cannot read version file {}: {}", path.display(), e))
    })?;
    parse_version(&content).ok_or_else(|| {
        precondition(format!(
            "{} does not declare {}",
            path.display(),
            VERSION_KEYS.join(", ")
        ))
    })
}

fn parse_version(content: &str) -> Option<String> {
    let mut parts = Vec::with_capacity(VERSION_KEYS.len());
    for key in VERSION_KEYS {
        let value = content.lines().find_map(|line| {
            let (name, value) = line.split_once('=')?;
            if name.trim() != key {
                return None;
            }
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
            Some(unquoted.to_string())
        })?;
        parts.push(value);
    }
    Some(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ExecutionResult, ScriptedExecutor};
    use crate::config::ProjectConfig;

    const INIT: &str = "__application_name__ = 'Colour - Demosaicing'\n\
                        __major_version__ = '0'\n\
                        __minor_version__ = \"1\"\n\
                        __change_version__ = '3'\n";

    const LS_REMOTE: &str = "aaaa\trefs/tags/v0.1.0\n\
                             bbbb\trefs/tags/v0.1.0^{}\n\
                             cccc\trefs/tags/v0.1.2\n";

    fn project_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/__init__.py"), INIT).unwrap();
        dir
    }

    fn on_branch(branch: &str) -> ScriptedExecutor {
        ScriptedExecutor::new()
            .respond(
                "git rev-parse --abbrev-ref HEAD",
                ExecutionResult::with_stdout(format!("{}\n", branch)),
            )
            .respond("git ls-remote --tags upstream", ExecutionResult::with_stdout(LS_REMOTE))
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(INIT).as_deref(), Some("0.1.3"));
        assert_eq!(parse_version("__major_version__ = '1'\n"), None);
        assert_eq!(
            parse_version("__major_version__ = 1\n__minor_version__ = '0'\n__change_version__ = '0'"),
            None
        );
    }

    #[test]
    fn test_parse_remote_tags() {
        let tags = parse_remote_tags(LS_REMOTE);
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["v0.1.0".to_string(), "v0.1.2".to_string()]
        );
        assert!(parse_remote_tags("").is_empty());
    }

    #[test]
    fn test_tag_starts_and_finishes_release() {
        let dir = project_dir();
        let exec = on_branch("develop");
        let project = ProjectConfig::named("pkg");
        let mut ctx = Context::new(&exec, &project, dir.path().to_path_buf());

        let task = tag();
        task.run(&mut ctx, &task.default_options()).unwrap();

        assert_eq!(
            exec.commands(),
            vec![
                "git rev-parse --abbrev-ref HEAD",
                "git ls-remote --tags upstream",
                "git flow release start v0.1.3",
                "git flow release finish v0.1.3",
            ]
        );
    }

    #[test]
    fn test_tag_refuses_wrong_branch() {
        let dir = project_dir();
        let exec = on_branch("feature/awb");
        let project = ProjectConfig::named("pkg");
        let mut ctx = Context::new(&exec, &project, dir.path().to_path_buf());

        let task = tag();
        let err = task.run(&mut ctx, &task.default_options()).unwrap_err();

        assert!(matches!(err, RunbookError::Precondition { .. }));
        assert_eq!(exec.commands(), vec!["git rev-parse --abbrev-ref HEAD"]);
    }

    #[test]
    fn test_tag_refuses_existing_tag() {
        let dir = project_dir();
        std::fs::write(
            dir.path().join("pkg/__init__.py"),
            INIT.replace("'3'", "'2'"),
        )
        .unwrap();
        let exec = on_branch("develop");
        let project = ProjectConfig::named("pkg");
        let mut ctx = Context::new(&exec, &project, dir.path().to_path_buf());

        let task = tag();
        let err = task.run(&mut ctx, &task.default_options()).unwrap_err();

        match err {
            RunbookError::Precondition { message, .. } => assert!(message.contains("v0.1.2")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!exec.commands().iter().any(|c| c.starts_with("git flow")));
    }

    #[test]
    fn test_tag_failed_probe_is_a_precondition() {
        let dir = project_dir();
        let exec = ScriptedExecutor::new().fail("git rev-parse --abbrev-ref HEAD", 128);
        let project = ProjectConfig::named("pkg");
        let mut ctx = Context::new(&exec, &project, dir.path().to_path_buf());

        let task = tag();
        let err = task.run(&mut ctx, &task.default_options()).unwrap_err();
        assert!(matches!(err, RunbookError::Precondition { .. }));
    }

    #[test]
    fn test_release_uploads_sdists_then_wheels() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("dist")).unwrap();
        std::fs::write(dir.path().join("dist/pkg-0.1.0.tar.gz"), "").unwrap();
        std::fs::write(dir.path().join("dist/pkg-0.1.0-py3-none-any.whl"), "").unwrap();

        let exec = ScriptedExecutor::new();
        let project = ProjectConfig::named("pkg");
        let mut ctx = Context::new(&exec, &project, dir.path().to_path_buf());

        let task = release();
        task.run(&mut ctx, &task.default_options()).unwrap();

        assert_eq!(
            exec.commands(),
            vec![
                "twine upload pkg-0.1.0.tar.gz",
                "twine upload pkg-0.1.0-py3-none-any.whl",
            ]
        );
    }
}
