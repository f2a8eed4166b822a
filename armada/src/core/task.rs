//! Per-repository task outcomes.

use crate::core::identity::RepoId;

/// Outcome of one operation on one repository.
///
/// Immutable once produced and never retried. Skips and no-ops are
/// successes whose stdout says what was skipped; a failure carries the
/// captured (or synthesized) error text in stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub repo: RepoId,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl TaskResult {
    pub fn ok(repo: RepoId, stdout: impl Into<String>) -> Self {
        Self {
            repo,
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(repo: RepoId, stderr: impl Into<String>) -> Self {
        Self {
            repo,
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}
