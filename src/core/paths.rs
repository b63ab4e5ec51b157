//! Data root detection.

use std::path::PathBuf;

use super::config::{Config, ResolvedPaths};

/// Environment variable for data root configuration
pub const HOME_ENV: &str = "JOBMATCH_HOME";

/// Data root plus its loaded configuration
pub struct DataPaths {
    pub paths: ResolvedPaths,
    pub config: Config,
}

impl DataPaths {
    /// Create from environment variable or current directory.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self::from_root(get_data_root()?))
    }

    pub fn from_root(root: PathBuf) -> Self {
        let config = Config::load(&root);
        Self::from_root_with_config(root, config)
    }

    pub fn from_root_with_config(root: PathBuf, config: Config) -> Self {
        let paths = config.resolve_paths(&root);
        Self { paths, config }
    }
}

/// Priority: JOBMATCH_HOME env var > current directory
pub fn get_data_root() -> std::io::Result<PathBuf> {
    if let Ok(path) = std::env::var(HOME_ENV) {
        let root = PathBuf::from(&path);
        if root.exists() {
            return Ok(root);
        }
        tracing::warn!(
            "{} is set to '{}' but path does not exist. Falling back to current directory.",
            HOME_ENV,
            path
        );
    }
    std::env::current_dir()
}
