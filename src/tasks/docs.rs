//! Documentation tasks

use crate::task::Task;

use super::message_box;

/// Set while the documentation builds so the package can skip heavy imports
pub(crate) const DOCUMENTATION_BUILD_VAR: &str = "COLOUR_SCIENCE_DOCUMENTATION_BUILD";

pub(super) fn docs() -> Task {
    Task::new("docs", "Builds the documentation")
        .flag("html", true, "Build the HTML documentation")
        .flag("pdf", true, "Build the PDF documentation")
        .body(|ctx, options| {
            ctx.with_environment([(DOCUMENTATION_BUILD_VAR, "True")], |ctx| {
                ctx.with_directory("docs", |ctx| {
                    if options.flag("html") {
                        message_box(ctx, "Building \"HTML\" documentation...");
                        ctx.sh("make html")?;
                    }

                    if options.flag("pdf") {
                        message_box(ctx, "Building \"PDF\" documentation...");
                        ctx.sh("make latexpdf")?;
                    }
                    Ok(())
                })
            })
        })
}

pub(super) fn todo() -> Task {
    Task::new("todo", "Exports the TODO items").body(|ctx, _| {
        message_box(ctx, "Exporting \"TODO\" items...");
        ctx.with_directory("utilities", |ctx| ctx.sh("./export_todo.py"))?;
        Ok(())
    })
}
