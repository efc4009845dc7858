/// Runtime configuration
///
/// Both index files live in one data directory, relative to the process
/// working directory unless overridden. The paths are fixed once the
/// program starts.

use std::env;
use std::path::PathBuf;

use crate::state::store::JsonStore;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "PHOTO_RENAMER_DATA_DIR";

/// Environment variable holding the log filter
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub tag_index_file: String,
    pub photo_index_file: String,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            tag_index_file: "tag_index.json".to_string(),
            photo_index_file: "photo_index.json".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overridden by the environment
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }
        config
    }

    pub fn tag_index_path(&self) -> PathBuf {
        self.data_dir.join(&self.tag_index_file)
    }

    pub fn photo_index_path(&self) -> PathBuf {
        self.data_dir.join(&self.photo_index_file)
    }

    pub fn open_store(&self) -> JsonStore {
        JsonStore::new(self.tag_index_path(), self.photo_index_path())
    }
}
