//! SQLite connection configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path used to request an in-memory database
pub const MEMORY_PATH: &str = ":memory:";

/// Connection settings for [`SqlitePool`](crate::SqlitePool)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// Enable write-ahead logging
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Enforce foreign key constraints
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
    /// How long to wait on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,
    /// Page cache size; negative values are KiB
    #[serde(default = "default_cache_size")]
    pub cache_size: i64,
    /// Memory-mapped I/O size in bytes, 0 disables it
    #[serde(default)]
    pub mmap_size: u64,
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_cache_size() -> i64 {
    -64000
}

impl SqliteConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// In-memory database, used by tests
    pub fn memory() -> Self {
        Self {
            wal_mode: false,
            ..Self::new(MEMORY_PATH)
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("burrow.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: default_busy_timeout_ms(),
            cache_size: default_cache_size(),
            mmap_size: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config() {
        let config = SqliteConfig::memory();
        assert!(config.is_memory());
        assert!(!config.wal_mode);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SqliteConfig = serde_json::from_str(r#"{"path": "a.db"}"#).unwrap();
        assert_eq!(config, SqliteConfig::new("a.db"));
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, 5000);
    }
}
