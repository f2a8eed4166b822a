//! One-directional reconciliation of the output root against a target set.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::identity::RepoId;

/// Removals attempted by one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<RemovalFailure>,
}

#[derive(Debug)]
pub struct RemovalFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Remove every two-level directory under `output_root` that does not map to
/// a target identity.
///
/// Strictly one-directional: never creates directories (that is the
/// executor's job) and never removes a directory mapping to a target, even
/// if the target's remote metadata changed. Each removal is independent; a
/// failure is recorded for that path and the pass continues.
pub fn reconcile(output_root: &Path, targets: &[RepoId]) -> Result<ReconcileReport> {
    let target_paths: BTreeSet<PathBuf> = targets
        .iter()
        .map(|id| output_root.join(id.relative_path()))
        .collect();

    let mut report = ReconcileReport::default();
    for actual in list_repo_directories(output_root)? {
        if target_paths.contains(&actual) {
            continue;
        }
        match fs::remove_dir_all(&actual) {
            Ok(()) => {
                debug!(path = %actual.display(), "removed extra directory");
                report.removed.push(actual);
            }
            Err(err) => {
                warn!(path = %actual.display(), %err, "failed to remove extra directory");
                report.failed.push(RemovalFailure {
                    path: actual,
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(report)
}

/// Enumerate the output root exactly two directory levels deep (owner, then
/// repository), recomputed fresh on every call so it cannot drift.
fn list_repo_directories(output_root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    if !output_root.is_dir() {
        return Ok(dirs);
    }
    for owner_entry in fs::read_dir(output_root)
        .with_context(|| format!("list output root {}", output_root.display()))?
    {
        let owner_path = owner_entry
            .with_context(|| format!("list output root {}", output_root.display()))?
            .path();
        if !owner_path.is_dir() {
            continue;
        }
        for repo_entry in fs::read_dir(&owner_path)
            .with_context(|| format!("list owner directory {}", owner_path.display()))?
        {
            let repo_path = repo_entry
                .with_context(|| format!("list owner directory {}", owner_path.display()))?
                .path();
            if repo_path.is_dir() {
                dirs.push(repo_path);
            }
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<RepoId> {
        names.iter().map(|name| name.parse().expect("id")).collect()
    }

    #[test]
    fn removes_exactly_the_directories_outside_the_target_set() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("a/r1")).expect("mkdir");
        fs::create_dir_all(root.join("a/r2")).expect("mkdir");

        let report = reconcile(root, &ids(&["a/r1"])).expect("reconcile");
        assert_eq!(report.removed, vec![root.join("a/r2")]);
        assert!(report.failed.is_empty());
        assert!(root.join("a/r1").is_dir());
        assert!(!root.join("a/r2").exists());
    }

    #[test]
    fn second_pass_with_the_same_targets_removes_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("a/r1")).expect("mkdir");
        fs::create_dir_all(root.join("b/r2")).expect("mkdir");

        let targets = ids(&["a/r1"]);
        let first = reconcile(root, &targets).expect("first");
        assert_eq!(first.removed.len(), 1);
        let second = reconcile(root, &targets).expect("second");
        assert!(second.removed.is_empty());
        assert!(second.failed.is_empty());
    }

    #[test]
    fn missing_output_root_yields_an_empty_report() {
        let temp = tempfile::tempdir().expect("tempdir");
        let report = reconcile(&temp.path().join("absent"), &ids(&["a/r1"])).expect("reconcile");
        assert!(report.removed.is_empty());
    }

    #[test]
    fn plain_files_at_either_level_are_left_alone() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("a")).expect("mkdir");
        fs::write(root.join("stray.txt"), "x").expect("write");
        fs::write(root.join("a/stray.txt"), "x").expect("write");

        let report = reconcile(root, &[]).expect("reconcile");
        assert!(report.removed.is_empty());
        assert!(root.join("stray.txt").exists());
        assert!(root.join("a/stray.txt").exists());
    }
}
