//! Repository identity: the canonical `owner/name` key.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Canonical `owner/name` key for one repository.
///
/// Every persisted sequence and every local directory mapping is keyed by
/// this value; equality is structural on the full name. Parsing rejects
/// anything that is not exactly `owner/name` with non-empty halves, so a
/// `RepoId` that exists is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    full_name: String,
}

impl RepoId {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn owner(&self) -> &str {
        self.full_name.split_once('/').map_or("", |(owner, _)| owner)
    }

    pub fn name(&self) -> &str {
        self.full_name.split_once('/').map_or("", |(_, name)| name)
    }

    /// Two-level relative path (`owner/name`) under an output root.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(self.owner()).join(self.name())
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    full_name: trimmed.to_string(),
                })
            }
            _ => Err(anyhow!(
                "invalid repository identity '{value}' (expected owner/name)"
            )),
        }
    }
}

impl TryFrom<String> for RepoId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.full_name
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_and_name() {
        let id: RepoId = "octo/api".parse().expect("parse");
        assert_eq!(id.owner(), "octo");
        assert_eq!(id.name(), "api");
        assert_eq!(id.full_name(), "octo/api");
        assert_eq!(id.relative_path(), PathBuf::from("octo/api"));
    }

    #[test]
    fn rejects_malformed_identities() {
        for bad in ["", "octo", "/api", "octo/", "octo/api/extra"] {
            assert!(bad.parse::<RepoId>().is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn serde_round_trips_as_plain_string() {
        let id: RepoId = "octo/api".parse().expect("parse");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"octo/api\"");
        let back: RepoId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn deserializing_malformed_identity_fails() {
        let err = serde_json::from_str::<RepoId>("\"not-a-repo\"");
        assert!(err.is_err());
    }
}
