//! Run configuration read from `.codeatlas.yaml`.
//!
//! ```yaml
//! docs_dir: docs
//! exclude:
//!   - docs/**
//!   - third_party/**
//! git_timeout_secs: 30
//! max_file_bytes: 1048576
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};
use crate::indexer::analyzer::DEFAULT_MAX_FILE_BYTES;
use crate::selection::ExclusionPolicy;

/// Name of the per-repository config file
pub const CONFIG_FILENAME: &str = ".codeatlas.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Documentation root, relative to the repository.
    pub docs_dir: String,

    /// Glob deny-list; matching files are never documented.
    pub exclude: Vec<String>,

    pub git_timeout_secs: u64,

    /// Files larger than this are skipped for import extraction.
    pub max_file_bytes: u64,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            docs_dir: "docs".to_string(),
            exclude: [
                "docs/**",
                "site/**",
                "target/**",
                "build/**",
                "dist/**",
                "node_modules/**",
                "vendor/**",
                ".git/**",
                "__pycache__/**",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            git_timeout_secs: 30,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl AtlasConfig {
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AtlasConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads an explicit config file; a missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AtlasError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Reads `<root>/.codeatlas.yaml` when present, defaults otherwise.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILENAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    pub fn exclusion_policy(&self) -> Result<ExclusionPolicy> {
        ExclusionPolicy::new(&self.exclude)
    }

    fn validate(&self) -> Result<()> {
        if self.docs_dir.trim().is_empty() {
            return Err(AtlasError::Config("docs_dir must not be empty".to_string()));
        }
        if self.git_timeout_secs == 0 {
            return Err(AtlasError::Config("git_timeout_secs must be positive".to_string()));
        }
        self.exclusion_policy()?;
        Ok(())
    }
}
