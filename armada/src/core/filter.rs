//! Inclusion policy narrowing a discovery snapshot to sync targets.

use regex::Regex;

use crate::core::identity::RepoId;
use crate::core::metadata::RepoMetadata;

/// Which discovered repositories become targets.
///
/// Predicates are AND-combined; a repository must pass every enabled one.
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    pub include_forks: bool,
    pub include_private: bool,
    pub include_archived: bool,
    /// Keep only full names matching this pattern.
    pub include: Option<Regex>,
    /// Drop full names matching this pattern.
    pub exclude: Option<Regex>,
}

/// Apply the policy to a discovery snapshot.
///
/// Flag predicates run first, then the unconditional empty-repository drop
/// (nothing to clone), then the pattern checks over the already-narrowed
/// set. Pure function of its inputs.
pub fn filter_repositories(discovered: &[RepoMetadata], policy: &FilterPolicy) -> Vec<RepoId> {
    discovered
        .iter()
        .filter(|repo| policy.include_forks || !repo.is_fork)
        .filter(|repo| policy.include_private || !repo.is_private())
        .filter(|repo| policy.include_archived || !repo.is_archived)
        .filter(|repo| !repo.is_empty)
        .filter(|repo| {
            policy
                .include
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(repo.name_with_owner.full_name()))
        })
        .filter(|repo| {
            policy
                .exclude
                .as_ref()
                .is_none_or(|pattern| !pattern.is_match(repo.name_with_owner.full_name()))
        })
        .map(|repo| repo.name_with_owner.clone())
        .collect()
}
