//! Document store configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration for the local document store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the `RocksDB` database.
    #[serde(default = "StoreConfig::default_data_dir")]
    pub data_dir: PathBuf,
}

impl StoreConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("./tripmate-data")
    }

    /// Configuration for a database under `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The database directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_data_dir() {
        assert_eq!(
            StoreConfig::default().data_dir(),
            Path::new("./tripmate-data")
        );
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./tripmate-data"));

        let config: StoreConfig =
            serde_json::from_str(r#"{"data_dir": "/var/lib/tripmate"}"#).unwrap();
        assert_eq!(config.data_dir(), Path::new("/var/lib/tripmate"));
    }
}
