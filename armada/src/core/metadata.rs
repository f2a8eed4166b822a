//! Repository metadata snapshots from the hosting provider.

use serde::Deserialize;

use crate::core::identity::RepoId;

/// One repository as reported by the host tool's listing call.
///
/// A snapshot is refreshed in full on every discovery run and never
/// persisted, so it cannot drift or be partially merged with stale data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMetadata {
    pub name_with_owner: RepoId,
    pub visibility: String,
    pub is_fork: bool,
    pub is_empty: bool,
    pub is_archived: bool,
}

impl RepoMetadata {
    /// The host tool has emitted both `private` and `PRIVATE` across versions.
    pub fn is_private(&self) -> bool {
        self.visibility.eq_ignore_ascii_case("private")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_documented_listing_fields() {
        let json = r#"{
            "nameWithOwner": "octo/api",
            "visibility": "PRIVATE",
            "isFork": false,
            "isEmpty": false,
            "isArchived": true
        }"#;
        let meta: RepoMetadata = serde_json::from_str(json).expect("parse");
        assert_eq!(meta.name_with_owner.full_name(), "octo/api");
        assert!(meta.is_private());
        assert!(meta.is_archived);
    }

    #[test]
    fn visibility_check_is_case_insensitive() {
        for visibility in ["private", "PRIVATE"] {
            let meta = RepoMetadata {
                name_with_owner: "octo/api".parse().expect("id"),
                visibility: visibility.to_string(),
                is_fork: false,
                is_empty: false,
                is_archived: false,
            };
            assert!(meta.is_private());
        }
    }
}
