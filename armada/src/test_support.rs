//! Test-only helpers: scripted hosts and disposable git repositories.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::identity::RepoId;
use crate::core::metadata::RepoMetadata;
use crate::io::host::RepoHost;

/// Build a metadata snapshot with deterministic fields.
pub fn metadata(
    full_name: &str,
    is_fork: bool,
    visibility: &str,
    is_archived: bool,
    is_empty: bool,
) -> RepoMetadata {
    RepoMetadata {
        name_with_owner: full_name.parse().expect("well-formed identity"),
        visibility: visibility.to_string(),
        is_fork,
        is_empty,
        is_archived,
    }
}

/// Initialize a git repository with one commit at `dir`.
pub fn init_repo(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    git_ok(dir, &["init", "-q", "-b", "main"])?;
    git_ok(dir, &["config", "user.email", "armada@example.com"])?;
    git_ok(dir, &["config", "user.name", "armada"])?;
    std::fs::write(dir.join("README.md"), "readme\n").context("write readme")?;
    git_ok(dir, &["add", "-A"])?;
    git_ok(dir, &["commit", "-q", "-m", "initial"])?;
    Ok(())
}

/// Run a git command in `dir`, failing on a non-zero exit.
pub fn git_ok(dir: &Path, args: &[&str]) -> Result<()> {
    git_stdout(dir, args).map(|_| ())
}

/// Run a git command in `dir` and capture stdout, failing on a non-zero exit.
pub fn git_stdout(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .context("spawn git")?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Scripted [`RepoHost`] recording calls instead of spawning `gh`.
pub struct ScriptedHost {
    pub listing: Vec<RepoMetadata>,
    pub default_branch: String,
    pub fail_clone: bool,
    pub cloned: Mutex<Vec<(RepoId, PathBuf)>>,
    pub opened_prs: Mutex<Vec<(PathBuf, String, String)>>,
}

impl ScriptedHost {
    pub fn new(default_branch: &str) -> Self {
        Self {
            listing: Vec::new(),
            default_branch: default_branch.to_string(),
            fail_clone: false,
            cloned: Mutex::new(Vec::new()),
            opened_prs: Mutex::new(Vec::new()),
        }
    }
}

impl RepoHost for ScriptedHost {
    fn list_repositories(&self, _owner: &str) -> Result<Vec<RepoMetadata>> {
        Ok(self.listing.clone())
    }

    fn default_branch(&self, _repo: &RepoId) -> Result<String> {
        Ok(self.default_branch.clone())
    }

    fn clone_repository(&self, repo: &RepoId, dest: &Path) -> Result<String> {
        if self.fail_clone {
            bail!("clone refused by scripted host");
        }
        std::fs::create_dir_all(dest).context("create clone target")?;
        self.cloned
            .lock()
            .map_err(|_| anyhow!("cloned lock poisoned"))?
            .push((repo.clone(), dest.to_path_buf()));
        Ok(format!("cloned {repo}"))
    }

    fn open_pull_request(&self, dir: &Path, title: &str, body: &str) -> Result<String> {
        self.opened_prs
            .lock()
            .map_err(|_| anyhow!("opened_prs lock poisoned"))?
            .push((dir.to_path_buf(), title.to_string(), body.to_string()));
        Ok("https://example.invalid/pr/1".to_string())
    }
}
