//! Verification tasks
//!
//! `tests`, `quality` and `examples` each check one thing; `preflight`
//! only depends on them.

use std::path::Path;

use walkdir::WalkDir;

use crate::command::CommandLine;
use crate::task::Task;

use super::message_box;

pub(super) fn tests() -> Task {
    Task::new("tests", "Runs the unit tests with Nose or Pytest")
        .flag("nose", true, "Use Nose instead of Pytest")
        .body(|ctx, options| {
            let package = &ctx.project().package;
            if options.flag("nose") {
                message_box(ctx, "Running \"Nosetests\"...");
                ctx.run(
                    &CommandLine::new("nosetests")
                        .args(["--with-doctest", "--with-coverage"])
                        .arg(format!("--cover-package={}", package))
                        .arg(package.as_str()),
                )?;
            } else {
                message_box(ctx, "Running \"Pytest\"...");
                ctx.sh("pytest -W ignore")?;
            }
            Ok(())
        })
}

pub(super) fn quality() -> Task {
    Task::new(
        "quality",
        "Checks the codebase with Flake8 and lints restructuredText files with rst-lint",
    )
    .flag("flake8", true, "Check the codebase with Flake8")
    .flag("rstlint", true, "Lint README.rst with rst-lint")
    .body(|ctx, options| {
        if options.flag("flake8") {
            message_box(ctx, "Checking codebase with \"Flake8\"...");
            ctx.run(
                &CommandLine::new("flake8")
                    .arg(ctx.project().package.as_str())
                    .arg("--exclude=examples"),
            )?;
        }

        if options.flag("rstlint") {
            message_box(ctx, "Linting \"README.rst\" file...");
            ctx.sh("rst-lint README.rst")?;
        }
        Ok(())
    })
}

pub(super) fn examples() -> Task {
    Task::new("examples", "Runs the examples").body(|ctx, _| {
        message_box(ctx, "Running examples...");

        let examples = Path::new(&ctx.project().package).join("examples");
        let root = ctx.current_dir().join(&examples);
        if !root.is_dir() {
            tracing::warn!(dir = %root.display(), "no examples directory");
            return Ok(());
        }

        let scripts: Vec<_> = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "py"))
            .map(|e| examples.join(e.path().strip_prefix(&root).unwrap_or(e.path())))
            .collect();

        for script in scripts {
            ctx.run(&CommandLine::new("python").arg(script.to_string_lossy()))?;
        }
        Ok(())
    })
}

pub(super) fn preflight() -> Task {
    Task::new(
        "preflight",
        "Performs the preflight tasks, i.e. formatting, tests, quality, and examples",
    )
    .depends(["formatting", "tests", "quality", "examples"])
    .body(|ctx, _| {
        message_box(ctx, "Finishing \"Preflight\"...");
        Ok(())
    })
}
