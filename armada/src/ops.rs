//! Per-repository operations fanned out by the executor.
//!
//! Each function is a leaf: one repository (plus fixed batch arguments) in,
//! one [`TaskResult`] out. Errors from the underlying tools are folded into
//! the result and never propagate across repositories; the executor is
//! agnostic to which operation it runs.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::core::identity::RepoId;
use crate::core::task::TaskResult;
use crate::io::git::Git;
use crate::io::host::RepoHost;
use crate::io::process::run_command;

/// Literal shell command shared by every repository in a batch.
///
/// Wrapping the string keeps the arbitrary-execution capability visible at
/// call sites instead of passing bare strings around.
#[derive(Debug, Clone)]
pub struct ShellCommand(String);

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self(command.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pattern substitution applied across tracked files.
#[derive(Debug, Clone)]
pub struct EditSpec {
    pub pattern: Regex,
    pub replacement: String,
    /// Pathspec limiting which tracked files are edited.
    pub pathspec: String,
    /// Report would-be changes, then restore the working tree.
    pub dry_run: bool,
}

/// Two-level working-copy path for a repository.
pub fn repo_directory(output_root: &Path, repo: &RepoId) -> PathBuf {
    output_root.join(repo.relative_path())
}

/// Clone the repository, or reset an existing working copy to a clean
/// mirror of its remote default branch.
///
/// The reset checks out the default branch and force-deletes every other
/// local branch. The branch loss is deliberate: a synced working copy is a
/// disposable mirror, not a workspace.
pub fn sync_repository(host: &dyn RepoHost, output_root: &Path, repo: &RepoId) -> TaskResult {
    let dir = repo_directory(output_root, repo);
    if dir.is_dir() {
        debug!(%repo, "working copy exists, resetting to default branch");
        match reset_to_default_branch(host, &dir, repo) {
            Ok(summary) => TaskResult::ok(repo.clone(), summary),
            Err(err) => TaskResult::failed(repo.clone(), format!("{err:#}")),
        }
    } else {
        debug!(%repo, dir = %dir.display(), "cloning");
        match host.clone_repository(repo, &dir) {
            Ok(stdout) => {
                let mut summary = format!("cloned into {}", dir.display());
                if !stdout.trim().is_empty() {
                    summary.push('\n');
                    summary.push_str(stdout.trim());
                }
                TaskResult::ok(repo.clone(), summary)
            }
            Err(err) => TaskResult::failed(repo.clone(), format!("{err:#}")),
        }
    }
}

fn reset_to_default_branch(host: &dyn RepoHost, dir: &Path, repo: &RepoId) -> Result<String> {
    let git = Git::new(dir);
    let default_branch = host
        .default_branch(repo)
        .with_context(|| format!("resolve default branch for {repo}"))?;
    git.checkout_branch(&default_branch)?;
    let mut deleted = Vec::new();
    for branch in git.local_branches()? {
        if branch != default_branch {
            git.delete_branch(&branch)?;
            deleted.push(branch);
        }
    }
    if deleted.is_empty() {
        Ok(format!("on {default_branch}, no extra branches"))
    } else {
        Ok(format!(
            "on {default_branch}, deleted branches: {}",
            deleted.join(", ")
        ))
    }
}

/// Run the batch's literal command string in the repository directory.
pub fn run_shell(output_root: &Path, repo: &RepoId, command: &ShellCommand) -> TaskResult {
    let dir = repo_directory(output_root, repo);
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command.as_str()).current_dir(&dir);
    match run_command(cmd) {
        Ok(outcome) => TaskResult {
            repo: repo.clone(),
            success: outcome.success(),
            stdout: outcome.stdout_text(),
            stderr: outcome.stderr_text(),
        },
        Err(err) => TaskResult::failed(repo.clone(), format!("{err:#}")),
    }
}

/// Apply the substitution to every tracked file matching the pathspec.
///
/// Dry-run reports which files would change and restores the working tree,
/// leaving `git status` identical before and after. A real run leaves the
/// edits uncommitted.
pub fn apply_edit(output_root: &Path, repo: &RepoId, edit: &EditSpec) -> TaskResult {
    let dir = repo_directory(output_root, repo);
    match apply_edit_inner(&dir, edit) {
        Ok(summary) => TaskResult::ok(repo.clone(), summary),
        Err(err) => TaskResult::failed(repo.clone(), format!("{err:#}")),
    }
}

fn apply_edit_inner(dir: &Path, edit: &EditSpec) -> Result<String> {
    let git = Git::new(dir);
    for file in git.ls_files(&edit.pathspec)? {
        let path = dir.join(&file);
        // Skip files that are not valid UTF-8 text.
        let Ok(contents) = fs::read_to_string(&path) else {
            continue;
        };
        if let Cow::Owned(replaced) = edit
            .pattern
            .replace_all(&contents, edit.replacement.as_str())
        {
            fs::write(&path, replaced).with_context(|| format!("write {}", path.display()))?;
        }
    }
    let changed = git.changed_files()?;
    if edit.dry_run {
        git.restore_worktree()?;
        if changed.is_empty() {
            Ok("dry-run: no files would change".to_string())
        } else {
            Ok(format!("dry-run: would change {}", changed.join(", ")))
        }
    } else if changed.is_empty() {
        Ok("no files changed".to_string())
    } else {
        Ok(format!("changed {}", changed.join(", ")))
    }
}

/// Branch and commit the working tree, or report a no-op when it is clean.
pub fn commit_changes(output_root: &Path, repo: &RepoId, branch: &str, message: &str) -> TaskResult {
    let dir = repo_directory(output_root, repo);
    match commit_inner(&Git::new(&dir), branch, message) {
        Ok(summary) => TaskResult::ok(repo.clone(), summary),
        Err(err) => TaskResult::failed(repo.clone(), format!("{err:#}")),
    }
}

fn commit_inner(git: &Git, branch: &str, message: &str) -> Result<String> {
    if !git.has_changes()? {
        return Ok("working tree clean, nothing to commit".to_string());
    }
    git.checkout_new_branch(branch)?;
    git.add_all()?;
    git.commit(message)?;
    Ok(format!("committed on {branch}"))
}

/// Open a pull request for the current branch, or report a skip when the
/// repository still sits on its default branch.
pub fn open_pull_request(
    host: &dyn RepoHost,
    output_root: &Path,
    repo: &RepoId,
    title: &str,
    body: &str,
) -> TaskResult {
    let dir = repo_directory(output_root, repo);
    match open_pull_request_inner(host, &dir, repo, title, body) {
        Ok(summary) => TaskResult::ok(repo.clone(), summary),
        Err(err) => TaskResult::failed(repo.clone(), format!("{err:#}")),
    }
}

fn open_pull_request_inner(
    host: &dyn RepoHost,
    dir: &Path,
    repo: &RepoId,
    title: &str,
    body: &str,
) -> Result<String> {
    let git = Git::new(dir);
    let current = git.current_branch()?;
    let default_branch = host
        .default_branch(repo)
        .with_context(|| format!("resolve default branch for {repo}"))?;
    if current == default_branch {
        return Ok(format!("on default branch {default_branch}, skipped"));
    }
    let stdout = host.open_pull_request(dir, title, body)?;
    let url = stdout.trim();
    if url.is_empty() {
        Ok(format!("opened pull request from {current}"))
    } else {
        Ok(format!("opened pull request from {current}: {url}"))
    }
}

/// Discard uncommitted tracked changes, returning to the last commit.
pub fn restore_worktree(output_root: &Path, repo: &RepoId) -> TaskResult {
    let dir = repo_directory(output_root, repo);
    match Git::new(&dir).restore_worktree() {
        Ok(()) => TaskResult::ok(repo.clone(), "restored to last commit"),
        Err(err) => TaskResult::failed(repo.clone(), format!("{err:#}")),
    }
}
