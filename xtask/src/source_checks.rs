// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use anyhow::{bail, Result};
use camino::Utf8Path;
use command_run::Command;
use crate::package::Package;

/// Check the workspace packages for banned patterns, returning an
/// error if any unexpected occurrences are found.
///
/// Leftover debug output macros are banned everywhere. The library
/// only reports through the `log` facade, so it must not print.
pub fn check_for_banned_patterns(repo_root: &Utf8Path) -> Result<()> {
    let all_packages: Vec<&str> = Package::all().iter().map(Package::name).collect();
    check_for_banned_patterns_impl(repo_root, &all_packages, &[r"dbg!(", r"eprintln!("])?;

    check_for_banned_patterns_impl(repo_root, &[Package::Bootseal.name()], &[r"println!("])
}

fn check_for_banned_patterns_impl(
    repo_root: &Utf8Path,
    dirs: &[&str],
    banned_patterns: &[&str],
) -> Result<()> {
    let this_source_file = "xtask/src/source_checks.rs";

    for pattern in banned_patterns {
        let mut paths = find_occurrences_of_pattern(repo_root, dirs, pattern)?;

        // If the banned pattern shows up in this source file, it's OK.
        paths.retain(|p| p != this_source_file);

        if !paths.is_empty() {
            bail!("unexpected use of {}: {}", pattern, paths.join(", "));
        }
    }

    Ok(())
}

/// Find all files under `dirs` that contain `pattern`.
///
/// All paths in the repo should have utf-8 names, so the paths are
/// returned as a `Vec<String>` for convenience (as opposed to `Path` or
/// `Utf8Path`).
fn find_occurrences_of_pattern(
    repo_root: &Utf8Path,
    dirs: &[&str],
    pattern: &str,
) -> Result<Vec<String>> {
    let mut cmd = Command::with_args(
        "git",
        [
            "grep",
            // Make paths relative to the repo root.
            "--full-name",
            // Show only file paths, not the matching text.
            "--files-with-matches",
            // Match the pattern literally.
            "--fixed-strings",
            pattern,
            "--",
        ],
    );
    cmd.add_args(dirs);
    cmd.set_dir(repo_root);
    cmd.enable_capture();
    // git grep exits with 1 when nothing matches.
    cmd.disable_check();
    let output = cmd.run()?;

    match output.status.code() {
        Some(0) | Some(1) => {}
        _ => bail!("git grep failed: {}", String::from_utf8_lossy(&output.stderr)),
    }
    let stdout = std::str::from_utf8(&output.stdout)?;
    Ok(stdout.lines().map(|s| s.to_owned()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_root() -> &'static Utf8Path {
        Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
    }

    #[test]
    fn test_check_for_banned_patterns() {
        let dirs = ["bootseal", "xtask"];
        assert_eq!(
            check_for_banned_patterns_impl(repo_root(), &dirs, &["Package::Bootseal"])
                .unwrap_err()
                .to_string(),
            "unexpected use of Package::Bootseal: xtask/src/main.rs"
        );

        assert!(
            check_for_banned_patterns_impl(repo_root(), &dirs, &["ThisTextDoesNotExist"]).is_ok()
        );

        // Only the given directories are searched.
        assert!(
            check_for_banned_patterns_impl(repo_root(), &["bootseal"], &["Package::Bootseal"])
                .is_ok()
        );
    }
}
