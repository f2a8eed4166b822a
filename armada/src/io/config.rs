//! Armada configuration stored at `.armada/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::filter::FilterPolicy;

/// Run configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values; present-but-bad
/// values fail fast rather than silently narrowing the scope to nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Owner/organization scope used to seed first-run state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Root under which working copies live, two levels deep (`owner/name`).
    pub output_directory: String,

    pub include_forks: bool,
    pub include_private: bool,
    pub include_archived: bool,

    /// Keep only full names matching this pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// Drop full names matching this pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Worker cap for batch commands; 0 means available parallelism.
    pub max_parallelism: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: None,
            output_directory: "repos".to_string(),
            include_forks: false,
            include_private: true,
            include_archived: false,
            include: None,
            exclude: None,
            max_parallelism: 0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.output_directory.trim().is_empty() {
            bail!("output_directory must not be empty");
        }
        if let Some(owner) = &self.owner
            && owner.trim().is_empty()
        {
            bail!("owner, when set, must not be empty");
        }
        self.policy().map(|_| ())
    }

    /// Compile the inclusion policy once per run.
    pub fn policy(&self) -> Result<FilterPolicy> {
        Ok(FilterPolicy {
            include_forks: self.include_forks,
            include_private: self.include_private,
            include_archived: self.include_archived,
            include: compile_pattern(self.include.as_deref()).context("compile include pattern")?,
            exclude: compile_pattern(self.exclude.as_deref()).context("compile exclude pattern")?,
        })
    }
}

fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>, regex::Error> {
    pattern.map(Regex::new).transpose()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `Config::default()`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &Config) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = Config {
            owner: Some("octo".to_string()),
            include: Some("api".to_string()),
            max_parallelism: 4,
            ..Config::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn empty_output_directory_fails_fast() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "output_directory = \"\"\n").expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn invalid_pattern_fails_fast() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "include = \"[\"\n").expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn policy_compiles_the_configured_patterns() {
        let cfg = Config {
            include: Some("^octo/".to_string()),
            exclude: Some("-archive$".to_string()),
            ..Config::default()
        };
        let policy = cfg.policy().expect("policy");
        assert!(policy.include.expect("include").is_match("octo/api"));
        assert!(policy.exclude.expect("exclude").is_match("octo/api-archive"));
    }
}
