//! Workspace hygiene: `clean` and `formatting`

use crate::command::CommandLine;
use crate::task::Task;

use super::{glob_args, message_box};

pub(super) fn clean() -> Task {
    Task::new("clean", "Cleans the project")
        .flag("docs", true, "Clean the docs build directories")
        .flag("bytecode", false, "Clean bytecode files, e.g. *.pyc")
        .body(|ctx, options| {
            message_box(ctx, "Cleaning project...");

            let mut patterns = vec!["build", "*.egg-info", "dist"];
            if options.flag("docs") {
                patterns.extend(["docs/_build", "docs/generated"]);
            }
            if options.flag("bytecode") {
                patterns.push("**/*.pyc");
            }

            for pattern in patterns {
                let targets = glob_args(ctx, pattern)?;
                ctx.run(&CommandLine::new("rm").arg("-rf").args(targets))?;
            }
            Ok(())
        })
}

pub(super) fn formatting() -> Task {
    Task::new(
        "formatting",
        "Formats the codebase with Yapf and converts unicode characters to ASCII",
    )
    .flag("yapf", false, "Format the codebase with Yapf")
    .flag("asciify", true, "Convert unicode characters to ASCII")
    .body(|ctx, options| {
        if options.flag("yapf") {
            message_box(ctx, "Formatting codebase with \"Yapf\"...");
            ctx.sh("yapf -p -i -r .")?;
        }

        if options.flag("asciify") {
            message_box(ctx, "Converting unicode characters to ASCII...");
            ctx.with_directory("utilities", |ctx| ctx.sh("./unicode_to_ascii.py"))?;
        }
        Ok(())
    })
}
