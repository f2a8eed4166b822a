//! Canonical on-disk layout under a working root.

use std::path::{Path, PathBuf};

/// All armada-owned paths for a working root.
#[derive(Debug, Clone)]
pub struct ArmadaPaths {
    pub root: PathBuf,
    pub armada_dir: PathBuf,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
}

impl ArmadaPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let armada_dir = root.join(".armada");
        Self {
            config_path: armada_dir.join("config.toml"),
            state_path: armada_dir.join("state.json"),
            armada_dir,
            root,
        }
    }

    /// Output root for working copies, resolved against the working root.
    pub fn output_root(&self, output_directory: &str) -> PathBuf {
        let configured = Path::new(output_directory);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.root.join(configured)
        }
    }
}
