//! Hosting-provider tool wrapper.
//!
//! [`RepoHost`] is the explicit seam between per-repository operations and
//! the `gh` CLI, so tests substitute scripted hosts without spawning
//! processes. The production implementation maps each method to exactly one
//! tool invocation.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::identity::RepoId;
use crate::core::metadata::RepoMetadata;
use crate::io::process::run_command;

/// Listing page bound; callers needing more must page explicitly.
const LIST_LIMIT: &str = "100";

pub trait RepoHost: Sync {
    /// One page of every repository visible under the owner scope.
    fn list_repositories(&self, owner: &str) -> Result<Vec<RepoMetadata>>;

    /// The repository's canonical branch as reported by the provider.
    /// Never assumed to be a fixed name.
    fn default_branch(&self, repo: &RepoId) -> Result<String>;

    /// Clone into `dest`; Ok carries the tool's stdout.
    fn clone_repository(&self, repo: &RepoId, dest: &Path) -> Result<String>;

    /// Open a pull request from the current branch of `dir`; Ok carries the
    /// tool's stdout (the PR URL).
    fn open_pull_request(&self, dir: &Path, title: &str, body: &str) -> Result<String>;
}

/// Production host backed by the `gh` CLI.
pub struct GhHost;

/// JSON shape of `gh repo view --json defaultBranchRef`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhRepoView {
    default_branch_ref: GhBranchRef,
}

#[derive(Deserialize)]
struct GhBranchRef {
    name: String,
}

impl RepoHost for GhHost {
    #[instrument(skip_all, fields(owner))]
    fn list_repositories(&self, owner: &str) -> Result<Vec<RepoMetadata>> {
        let mut cmd = Command::new("gh");
        cmd.args([
            "repo",
            "list",
            owner,
            "--limit",
            LIST_LIMIT,
            "--json",
            "nameWithOwner,visibility,isFork,isEmpty,isArchived",
        ]);
        let outcome = run_command(cmd).context("run gh repo list")?;
        if !outcome.success() {
            return Err(anyhow!(
                "gh repo list {owner} failed: {}",
                outcome.stderr_text().trim()
            ));
        }
        let repos: Vec<RepoMetadata> =
            serde_json::from_slice(&outcome.stdout).context("parse gh repo list output")?;
        debug!(count = repos.len(), "listed repositories");
        Ok(repos)
    }

    fn default_branch(&self, repo: &RepoId) -> Result<String> {
        let mut cmd = Command::new("gh");
        cmd.args([
            "repo",
            "view",
            repo.full_name(),
            "--json",
            "defaultBranchRef",
        ]);
        let outcome = run_command(cmd).context("run gh repo view")?;
        if !outcome.success() {
            return Err(anyhow!(
                "gh repo view {repo} failed: {}",
                outcome.stderr_text().trim()
            ));
        }
        let view: GhRepoView = serde_json::from_slice(&outcome.stdout)
            .with_context(|| format!("parse default branch for {repo}"))?;
        Ok(view.default_branch_ref.name)
    }

    fn clone_repository(&self, repo: &RepoId, dest: &Path) -> Result<String> {
        let mut cmd = Command::new("gh");
        cmd.arg("repo").arg("clone").arg(repo.full_name()).arg(dest);
        let outcome = run_command(cmd).context("run gh repo clone")?;
        if !outcome.success() {
            return Err(anyhow!(
                "gh repo clone {repo} failed: {}",
                outcome.stderr_text().trim()
            ));
        }
        Ok(outcome.stdout_text())
    }

    fn open_pull_request(&self, dir: &Path, title: &str, body: &str) -> Result<String> {
        let mut cmd = Command::new("gh");
        cmd.args(["pr", "create", "--title", title, "--body", body])
            .current_dir(dir);
        let outcome = run_command(cmd).context("run gh pr create")?;
        if !outcome.success() {
            return Err(anyhow!(
                "gh pr create failed: {}",
                outcome.stderr_text().trim()
            ));
        }
        Ok(outcome.stdout_text())
    }
}
