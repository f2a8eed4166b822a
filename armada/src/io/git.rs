//! Version-control tool wrapper.
//!
//! A small, explicit wrapper around `git` subprocess calls in one working
//! copy. Helpers come in capture-and-inspect form: non-zero exits become
//! errors carrying trimmed stderr, which callers fold into per-repository
//! results rather than propagating across a batch.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::io::process::{ProcessOutcome, run_command};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Current branch name (errors on detached HEAD).
    pub fn current_branch(&self) -> Result<String> {
        let name = self
            .run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string();
        if name == "HEAD" {
            return Err(anyhow!("detached HEAD in {}", self.workdir.display()));
        }
        Ok(name)
    }

    /// Local branch names, short form.
    pub fn local_branches(&self) -> Result<Vec<String>> {
        let out = self.run_capture(&["branch", "--format=%(refname:short)"])?;
        Ok(non_empty_lines(&out))
    }

    pub fn checkout_branch(&self, branch: &str) -> Result<()> {
        self.run_checked(&["checkout", branch])?;
        Ok(())
    }

    /// Create and checkout a new branch at current HEAD.
    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch])?;
        Ok(())
    }

    /// Force-delete a local branch, committed or not.
    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        self.run_checked(&["branch", "-D", branch])?;
        Ok(())
    }

    /// True if the working tree differs from HEAD (untracked included).
    pub fn has_changes(&self) -> Result<bool> {
        let out = self.run_capture(&["status", "--porcelain"])?;
        Ok(!out.trim().is_empty())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_checked(&["commit", "-m", message])?;
        Ok(())
    }

    /// Tracked files matching a pathspec, repo-relative.
    pub fn ls_files(&self, pathspec: &str) -> Result<Vec<String>> {
        let out = self.run_capture(&["ls-files", "--", pathspec])?;
        Ok(non_empty_lines(&out))
    }

    /// Tracked files whose working-tree content differs from the index.
    pub fn changed_files(&self) -> Result<Vec<String>> {
        let out = self.run_capture(&["diff", "--name-only"])?;
        Ok(non_empty_lines(&out))
    }

    /// Discard uncommitted changes to tracked files.
    pub fn restore_worktree(&self) -> Result<()> {
        self.run_checked(&["checkout", "--", "."])?;
        Ok(())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let outcome = self.run_checked(args)?;
        Ok(outcome.stdout_text())
    }

    fn run_checked(&self, args: &[&str]) -> Result<ProcessOutcome> {
        let outcome = self.run(args)?;
        if !outcome.success() {
            return Err(anyhow!(
                "git {} failed in {}: {}",
                args.join(" "),
                self.workdir.display(),
                outcome.stderr_text().trim()
            ));
        }
        Ok(outcome)
    }

    fn run(&self, args: &[&str]) -> Result<ProcessOutcome> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command(cmd)
    }
}

fn non_empty_lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
