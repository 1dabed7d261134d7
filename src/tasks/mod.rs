//! Built-in project tasks
//!
//! The bodies here are thin: each prints a banner and issues commands
//! through the [`Context`]. Names come from the project configuration.

mod checks;
mod docs;
mod hygiene;
mod package;
mod release;

use std::path::Path;

use console::style;

use crate::context::Context;
use crate::error::{Result, RunbookError};
use crate::registry::Registry;

const BANNER_WIDTH: usize = 79;

/// The standard project registry
pub fn builtin() -> Result<Registry> {
    let mut registry = Registry::new();
    registry
        .register(hygiene::clean())?
        .register(hygiene::formatting())?
        .register(checks::tests())?
        .register(checks::quality())?
        .register(checks::examples())?
        .register(docs::docs())?
        .register(docs::todo())?
        .register(checks::preflight())?
        .register(package::build())?
        .register(package::virtualise())?
        .register(release::tag())?
        .register(release::release())?
        .register(package::sha256())?;
    Ok(registry)
}

/// Print a framed progress message
pub(crate) fn message_box(ctx: &Context<'_>, message: &str) {
    tracing::info!("{}", message);
    if ctx.is_quiet() {
        return;
    }

    let rule = "=".repeat(BANNER_WIDTH);
    let inner = BANNER_WIDTH - 2;
    println!("{}", style(&rule).dim());
    println!("{}{}{}", style("*").dim(), " ".repeat(inner), style("*").dim());
    println!(
        "{}   {:<width$}{}",
        style("*").dim(),
        style(message).bold(),
        style("*").dim(),
        width = inner.saturating_sub(3)
    );
    println!("{}{}{}", style("*").dim(), " ".repeat(inner), style("*").dim());
    println!("{}", style(&rule).dim());
}

/// Expand a glob the way a shell would.
///
/// Matches are relative to the current directory and sorted; when nothing
/// matches the pattern itself is returned.
pub(crate) fn glob_args(ctx: &Context<'_>, pattern: &str) -> Result<Vec<String>> {
    let base = ctx.current_dir();
    // Only `pattern` may carry wildcards, never the directory it runs in.
    let escaped = glob::Pattern::escape(&base.to_string_lossy());
    let full = Path::new(&escaped).join(pattern);
    let paths = glob::glob(&full.to_string_lossy()).map_err(|source| RunbookError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matches: Vec<String> = paths
        .filter_map(|p| p.ok())
        .map(|p| match p.strip_prefix(base) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => p.to_string_lossy().into_owned(),
        })
        .collect();
    matches.sort();

    if matches.is_empty() {
        tracing::debug!(pattern, "no matches, passing pattern through");
        matches.push(pattern.to_string());
    }
    Ok(matches)
}
