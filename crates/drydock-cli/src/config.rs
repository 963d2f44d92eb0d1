//! drydock.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use drydock_assign::DEFAULT_MAX_ATTEMPTS;

/// Default location of the state database directory.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/drydock";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DrydockConfig {
    /// Directory holding the state database.
    pub data_dir: Option<PathBuf>,
    /// Retry budget for attach/detach under contention.
    pub max_attach_attempts: Option<usize>,
}

impl DrydockConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DrydockConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The configured data directory, or the default.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    /// The configured retry budget, or the coordinator default.
    pub fn max_attach_attempts(&self) -> usize {
        self.max_attach_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }
}
