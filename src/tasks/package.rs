//! Packaging: `build`, `virtualise` and `sha256`
//!
//! `virtualise` unpacks the sdist into a staging virtualenv and runs the
//! test suite against the installed package.

use crate::command::CommandLine;
use crate::task::Task;

use super::{glob_args, message_box};

/// Packages installed into the staging virtualenv, in order
const STAGING_PACKAGES: &[&str] = &["numpy==1.13.3", "-e .", "matplotlib", "nose", "mock"];

const STAGING_PIP: &str = "../staging/bin/pip";
const STAGING_NOSETESTS: &str = "../staging/bin/nosetests";

pub(super) fn build() -> Task {
    Task::new(
        "build",
        "Builds the project and runs dependency tasks, i.e. docs, todo, and preflight",
    )
    .depends(["docs", "todo", "preflight"])
    .body(|ctx, _| {
        message_box(ctx, "Building...");
        ctx.sh("python setup.py sdist")?;
        ctx.sh("python setup.py bdist_wheel --universal")?;
        Ok(())
    })
}

pub(super) fn virtualise() -> Task {
    Task::new(
        "virtualise",
        "Creates a virtual environment for the project build",
    )
    .depends(["clean", "build"])
    .flag("tests", true, "Run the tests in the virtual environment")
    .body(|ctx, options| {
        let distribution = ctx.project().distribution_name();

        ctx.with_directory("dist", |ctx| {
            let sdists = glob_args(ctx, &format!("{}-*.tar.gz", distribution))?;
            for sdist in &sdists {
                ctx.run(&CommandLine::new("tar").arg("-xvf").arg(sdist.as_str()))?;
            }
            ctx.sh("virtualenv staging")?;

            // The sdist unpacks into a directory named after the archive.
            let extracted = sdists
                .first()
                .and_then(|s| s.strip_suffix(".tar.gz"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}-*", distribution));

            ctx.with_directory(extracted, |ctx| {
                ctx.sh("pwd")?;
                for package in STAGING_PACKAGES {
                    ctx.run(&CommandLine::new(STAGING_PIP).arg("install").args(package.split(' ')))?;
                }
                if options.flag("tests") {
                    ctx.sh(STAGING_NOSETESTS)?;
                }
                Ok(())
            })
        })
    })
}

pub(super) fn sha256() -> Task {
    Task::new(
        "sha256",
        "Computes the project sdist sha256 with OpenSSL",
    )
    .body(|ctx, _| {
        message_box(ctx, "Computing \"sha256\"...");
        let distribution = ctx.project().distribution_name();

        ctx.with_directory("dist", |ctx| {
            let sdists = glob_args(ctx, &format!("{}-*.tar.gz", distribution))?;
            ctx.run(&CommandLine::new("openssl").arg("sha256").args(sdists))?;
            Ok(())
        })
    })
}
