//! Narrow git interface
//!
//! The tool only needs three operations from version control: locate the
//! repository root, list modified file paths, and stage written files.
//! Everything goes through the `git` binary.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Root of the repository containing the working directory
pub fn find_repo_root() -> Result<PathBuf> {
    let out = run_git(None, &["rev-parse", "--show-toplevel"])?;
    Ok(PathBuf::from(out.trim()))
}

/// Paths modified in the working tree, or in the index when `staged`
pub fn list_modified_paths(root: &Path, staged: bool) -> Result<Vec<PathBuf>> {
    let mut args = vec!["diff", "--name-only", "--diff-filter=ACM"];
    if staged {
        args.push("--cached");
    }

    let out = run_git(Some(root), &args)?;
    Ok(out
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| root.join(line))
        .collect())
}

/// Stage the given paths
pub fn stage(root: &Path, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }

    let mut args: Vec<String> = vec!["add".to_string(), "--".to_string()];
    args.extend(paths.iter().map(|p| p.display().to_string()));

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_git(Some(root), &arg_refs)?;
    Ok(())
}

fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = command
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
