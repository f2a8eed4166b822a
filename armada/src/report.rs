//! Aggregate reporting for batch runs.

use std::fmt;

use crate::core::identity::RepoId;
use crate::core::task::TaskResult;

/// Attempted/succeeded/failed rollup of one batch, with the identity and
/// captured error text of every failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<(RepoId, String)>,
}

impl BatchSummary {
    pub fn from_results(results: &[TaskResult]) -> Self {
        let failures = results
            .iter()
            .filter(|result| !result.success)
            .map(|result| (result.repo.clone(), result.stderr.trim().to_string()))
            .collect::<Vec<_>>();
        Self {
            attempted: results.len(),
            succeeded: results.len() - failures.len(),
            failures,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted {}, succeeded {}, failed {}",
            self.attempted,
            self.succeeded,
            self.failures.len()
        )?;
        for (repo, error) in &self.failures {
            write!(f, "\n  failed {repo}: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_lists_every_failure() {
        let ok: RepoId = "o/a".parse().expect("id");
        let bad: RepoId = "o/b".parse().expect("id");
        let results = vec![
            TaskResult::ok(ok, "done"),
            TaskResult::failed(bad.clone(), "no remote\n"),
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failures, vec![(bad, "no remote".to_string())]);
        assert!(summary.has_failures());

        let rendered = summary.to_string();
        assert!(rendered.contains("attempted 2, succeeded 1, failed 1"));
        assert!(rendered.contains("failed o/b: no remote"));
    }

    #[test]
    fn a_clean_batch_has_no_failures() {
        let repo: RepoId = "o/a".parse().expect("id");
        let summary = BatchSummary::from_results(&[TaskResult::ok(repo, "")]);
        assert!(!summary.has_failures());
        assert_eq!(summary.to_string(), "attempted 1, succeeded 1, failed 0");
    }
}
