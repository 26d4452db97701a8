// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod package;
mod source_checks;

use anyhow::{anyhow, Result};
use argh::FromArgs;
use camino::{Utf8Path, Utf8PathBuf};
use command_run::Command;
use package::Package;
use std::env;

/// Tools for bootseal.
#[derive(FromArgs, PartialEq, Debug)]
pub struct Opt {
    /// action to run
    #[argh(subcommand)]
    action: Action,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Action {
    Check(CheckAction),
    Format(FormatAction),
    Lint(LintAction),
    Test(TestAction),
}

/// Check formating, lint, source checks, and test.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "check")]
struct CheckAction {}

/// Run "cargo fmt" on all the code.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "fmt")]
struct FormatAction {
    /// don't format the code, just check if it's already formatted
    #[argh(switch)]
    check: bool,
}

/// Run "cargo clippy" on all the code.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "lint")]
struct LintAction {}

/// Run tests.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "test")]
struct TestAction {
    /// only test this package
    #[argh(option)]
    package: Option<String>,
}

fn run_check(repo_root: &Utf8Path) -> Result<()> {
    run_rustfmt(repo_root, &FormatAction { check: true })?;
    run_clippy(repo_root)?;
    source_checks::check_for_banned_patterns(repo_root)?;
    run_tests(repo_root, &TestAction { package: None })?;

    Ok(())
}

fn run_rustfmt(repo_root: &Utf8Path, action: &FormatAction) -> Result<()> {
    let mut cmd = Command::with_args("cargo", ["fmt", "--all"]);
    cmd.set_dir(repo_root);
    if action.check {
        cmd.add_args(["--", "--check"]);
    }
    cmd.run()?;

    Ok(())
}

fn run_clippy(repo_root: &Utf8Path) -> Result<()> {
    // Include the test modules, which hold the mocks and fakes.
    Command::with_args(
        "cargo",
        [
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "--deny",
            "warnings",
        ],
    )
    .set_dir(repo_root)
    .run()?;

    // The library must also build without the test-only mocks.
    Command::with_args("cargo", ["clippy", "--package", Package::Bootseal.name()])
        .set_dir(repo_root)
        .run()?;

    Ok(())
}

fn run_tests(repo_root: &Utf8Path, action: &TestAction) -> Result<()> {
    let packages: Vec<&str> = match &action.package {
        Some(name) => {
            let package = Package::all()
                .into_iter()
                .find(|p| p.name() == name.as_str())
                .ok_or_else(|| anyhow!("unknown package: {name}"))?;
            vec![package.name()]
        }
        None => Package::all().iter().map(Package::name).collect(),
    };

    for package in packages {
        Command::with_args("cargo", ["test", "--package", package])
            .set_dir(repo_root)
            .run()?;
    }

    Ok(())
}

fn get_repo_path() -> Result<Utf8PathBuf> {
    let exe_path = env::current_exe()?;
    let repo_path = exe_path
        .parent()
        .and_then(|path| path.parent())
        .and_then(|path| path.parent())
        .ok_or_else(|| anyhow!("repo path: not enough parents"))?;
    Ok(Utf8Path::from_path(repo_path)
        .ok_or_else(|| anyhow!("repo path: not utf-8"))?
        .to_path_buf())
}

fn main() -> Result<()> {
    let opt: Opt = argh::from_env();
    let repo_root = get_repo_path()?;

    match &opt.action {
        Action::Check(_) => run_check(&repo_root),
        Action::Format(action) => run_rustfmt(&repo_root, action),
        Action::Lint(_) => run_clippy(&repo_root),
        Action::Test(action) => run_tests(&repo_root, action),
    }
}
