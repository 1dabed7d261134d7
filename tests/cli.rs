//! End-to-end CLI tests using `assert_cmd`

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"
[project]
package = "colour_demosaicing"
application = "Colour - Demosaicing"

[env]
PYTHONHASHSEED = "0"
"#;

fn runbook() -> Command {
    let mut cmd = Command::cargo_bin("runbook").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("runbook.toml"), CONFIG).unwrap();
    dir
}

#[test]
fn test_help() {
    runbook()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_list_without_config() {
    let dir = TempDir::new().unwrap();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "list", "--format", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("preflight"))
        .stdout(predicate::str::contains("sha256"));
}

#[test]
fn test_list_json_with_deps() {
    let dir = TempDir::new().unwrap();

    runbook()
        .current_dir(dir.path())
        .args(["list", "--format", "json", "--deps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"depends\""))
        .stdout(predicate::str::contains("\"bytecode\": \"false\""));
}

#[test]
fn test_unknown_task_exit_code() {
    let dir = project();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "nosuchtask"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("nosuchtask"));
}

#[test]
fn test_unknown_task_option_is_usage_error() {
    let dir = project();

    runbook()
        .current_dir(dir.path())
        .args(["clean", "--html"])
        .assert()
        .code(2);
}

#[test]
fn test_task_help_lists_options() {
    runbook()
        .args(["clean", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-docs"))
        .stdout(predicate::str::contains("--bytecode"));
}

#[test]
fn test_run_requires_config() {
    let dir = TempDir::new().unwrap();

    runbook()
        .current_dir(dir.path())
        .args(["--dry-run", "clean"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("runbook.toml"));
}

#[test]
fn test_dry_run_build_prints_commands_in_order() {
    let dir = project();

    let output = runbook()
        .current_dir(dir.path())
        .args(["--no-color", "--dry-run", "build"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    let expected = [
        "make html",
        "make latexpdf",
        "./export_todo.py",
        "./unicode_to_ascii.py",
        "nosetests --with-doctest --with-coverage --cover-package=colour_demosaicing colour_demosaicing",
        "flake8 colour_demosaicing --exclude=examples",
        "rst-lint README.rst",
        "python setup.py sdist",
        "python setup.py bdist_wheel --universal",
    ];

    let mut last = 0;
    for command in expected {
        let position = stdout[last..]
            .find(command)
            .unwrap_or_else(|| panic!("`{}` missing or out of order in:\n{}", command, stdout));
        last += position + command.len();
    }
}

#[test]
fn test_dry_run_passes_task_options() {
    let dir = project();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "--dry-run", "tests", "--no-nose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pytest -W ignore"))
        .stdout(predicate::str::contains("nosetests").not());
}

#[test]
fn test_quiet_dry_run_still_prints_commands() {
    let dir = project();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "-q", "--dry-run", "todo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("./export_todo.py"))
        .stdout(predicate::str::contains("Exporting").not());
}

#[test]
fn test_global_flags_before_run_subcommand() {
    let dir = project();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "--dry-run", "run", "todo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("./export_todo.py"))
        .stdout(predicate::str::contains("./unicode_to_ascii.py"));
}

#[test]
fn test_global_flags_before_list_and_graph() {
    let dir = TempDir::new().unwrap();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available tasks"))
        .stdout(predicate::str::contains("clean"));

    runbook()
        .current_dir(dir.path())
        .args(["-q", "graph", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("preflight"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_dry_run_task_without_options_uses_defaults() {
    let dir = project();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "--dry-run", "run", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("make html"))
        .stdout(predicate::str::contains("make latexpdf"));
}

#[cfg(unix)]
#[test]
fn test_failing_command_propagates_exit_status() {
    use std::os::unix::fs::PermissionsExt;

    let dir = project();
    let utilities = dir.path().join("utilities");
    fs::create_dir(&utilities).unwrap();
    let script = utilities.join("export_todo.py");
    fs::write(&script, "#!/bin/sh\nexit 4\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "-q", "todo"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("./export_todo.py"));
}

#[test]
fn test_graph_dot() {
    runbook()
        .args(["graph", "build", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph runbook"))
        .stdout(predicate::str::contains("\"preflight\" -> \"build\""))
        .stdout(predicate::str::contains("\"tests\" -> \"preflight\""));
}

#[test]
fn test_graph_unknown_task() {
    runbook().args(["graph", "nosuchtask"]).assert().code(3);
}

#[test]
fn test_check_with_and_without_config() {
    let dir = project();
    runbook()
        .current_dir(dir.path())
        .args(["--no-color", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("13 tasks"))
        .stdout(predicate::str::contains("colour_demosaicing"));

    let empty = TempDir::new().unwrap();
    runbook()
        .current_dir(empty.path())
        .args(["--no-color", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("13 tasks"));
}

#[test]
fn test_check_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("runbook.toml"), "[project]\npackage = \"\"\n").unwrap();

    runbook()
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .code(1);
}

#[test]
fn test_init_creates_config_once() {
    let dir = TempDir::new().unwrap();

    runbook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    let written = fs::read_to_string(dir.path().join("runbook.toml")).unwrap();
    assert!(written.contains("[project]"));

    runbook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    runbook()
        .current_dir(dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    runbook()
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .success();
}
