//! Runtime configuration.

use std::fs;
use std::path::{Path, PathBuf};

use safe_tree_kernel::ModuleConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for the `safe-tree` binary, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Parent directory of all session directories.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Snapshot every N events; 0 disables snapshots.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u64,

    /// Only used when the session log is empty.
    #[serde(default)]
    pub module: ModuleConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_session_id() -> String {
    "default".to_string()
}

fn default_snapshot_interval() -> u64 {
    100
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            session_id: default_session_id(),
            snapshot_interval: default_snapshot_interval(),
            module: ModuleConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let id_ok = !self.session_id.is_empty()
            && self
                .session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !id_ok {
            return Err(ConfigError::Invalid(format!(
                "session_id {:?} must be non-empty ASCII alphanumerics, '-' or '_'",
                self.session_id
            )));
        }
        let m = &self.module;
        if m.default_depth_tree_limit == 0 || m.default_depth_tree_limit > m.max_depth_tree_limit {
            return Err(ConfigError::Invalid(format!(
                "default_depth_tree_limit {} must be in 1..={}",
                m.default_depth_tree_limit, m.max_depth_tree_limit
            )));
        }
        Ok(())
    }

    pub fn session_dir(&self) -> PathBuf {
        self.data_dir.join(&self.session_id)
    }
}
