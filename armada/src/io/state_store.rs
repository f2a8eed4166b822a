//! Selection load/save with schema + invariant validation.
//!
//! The state file is the only record of cloned/modified membership, so a
//! file that exists but fails to parse or validate is fatal and never
//! auto-repaired: silently resetting it would lose that history.

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::selection::Selection;

const SELECTION_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/selection/v1.schema.json"
));

/// Load the persisted selection, creating one on first run.
///
/// On first run the scope comes from `seed_owner` (the config file), falling
/// back to one interactive prompt on stdin. An empty answer is a fatal
/// missing-scope error. The fresh selection is saved immediately so the next
/// run is non-interactive.
pub fn load_or_init(path: &Path, seed_owner: Option<&str>) -> Result<Selection> {
    if path.exists() {
        return load(path);
    }
    let owner = match seed_owner {
        Some(owner) => owner.trim().to_string(),
        None => prompt_owner()?,
    };
    if owner.is_empty() {
        return Err(anyhow!("missing discovery scope: no owner configured"));
    }
    let selection = Selection::new(owner);
    save(path, &selection)?;
    Ok(selection)
}

/// Load and validate the selection from disk (schema + invariants).
pub fn load(path: &Path) -> Result<Selection> {
    debug!(path = %path.display(), "loading selection");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read state {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("state file {} is corrupt", path.display()))?;
    validate_schema(&value).with_context(|| format!("state file {} is corrupt", path.display()))?;
    let selection: Selection = serde_json::from_value(value)
        .with_context(|| format!("deserialize state {}", path.display()))?;
    selection
        .validate()
        .with_context(|| format!("state file {} is corrupt", path.display()))?;
    Ok(selection)
}

/// Atomically write the whole selection (temp file + rename).
///
/// Every save writes the full record; there are no partial-field updates.
pub fn save(path: &Path, selection: &Selection) -> Result<()> {
    selection.validate().context("refusing to save invalid state")?;
    debug!(path = %path.display(), owner = %selection.owner, "writing selection");
    let mut buf = serde_json::to_string_pretty(selection)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn validate_schema(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(SELECTION_SCHEMA).context("parse embedded schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if messages.is_empty() {
        return Ok(());
    }
    Err(anyhow!(
        "schema validation failed: {}",
        messages.join("; ")
    ))
}

fn prompt_owner() -> Result<String> {
    print!("Owner or organization to manage: ");
    std::io::stdout().flush().context("flush prompt")?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read owner from stdin")?;
    Ok(line.trim().to_string())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace state {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::RepoId;

    fn ids(names: &[&str]) -> Vec<RepoId> {
        names.iter().map(|name| name.parse().expect("id")).collect()
    }

    #[test]
    fn save_then_load_round_trips_all_sequences_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");

        let mut selection = Selection::new("octo");
        selection.set_discovered(ids(&["octo/b", "octo/a", "octo/c"]));
        selection.set_filtered(ids(&["octo/b", "octo/c"]));
        selection.set_cloned(ids(&["octo/c"]));
        selection.modified = ids(&["octo/b"]);

        save(&path, &selection).expect("save");
        let loaded = load(&path).expect("load");
        assert_eq!(loaded, selection);
    }

    #[test]
    fn load_or_init_seeds_owner_and_persists() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        let selection = load_or_init(&path, Some("octo")).expect("init");
        assert_eq!(selection.owner, "octo");
        assert!(path.exists());
        assert_eq!(load(&path).expect("reload"), selection);
    }

    #[test]
    fn unparseable_state_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        fs::write(&path, "not json").expect("write");
        let err = load(&path).expect_err("corrupt");
        assert!(err.to_string().contains("corrupt"));
    }

    #[test]
    fn schema_violations_are_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        // owner must be a non-empty string; cloned items must be owner/name.
        fs::write(
            &path,
            r#"{"owner": "", "discovered": [], "filtered": [], "cloned": ["nope"], "modified": []}"#,
        )
        .expect("write");
        assert!(load(&path).is_err());
    }

    #[test]
    fn invariant_violations_are_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        // filtered not a subset of discovered.
        fs::write(
            &path,
            r#"{"owner": "octo", "discovered": [], "filtered": ["octo/a"], "cloned": [], "modified": []}"#,
        )
        .expect("write");
        let err = load(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("not in discovered"));
    }
}
