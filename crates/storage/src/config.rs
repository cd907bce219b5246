#![forbid(unsafe_code)]

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG_NAME: &str = "tracklog.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_file: String,
    pub busy_timeout_ms: u64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Named points at which a write aborts, e.g. `after_change_insert:2`.
    pub failpoints: Option<Vec<String>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_file: "tracklog.db".to_string(),
            busy_timeout_ms: 5_000,
            default_page_size: 50,
            max_page_size: 500,
            failpoints: None,
        }
    }
}

impl StoreConfig {
    /// Reads `tracklog.json` from `storage_dir`, writing the defaults there
    /// first when the file does not exist.
    pub fn load_or_init(storage_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(storage_dir)?;
        let config_path = storage_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            let config: StoreConfig = serde_json::from_str(&raw)?;
            config.validate()?;
            return Ok(config);
        }
        let config = StoreConfig::default();
        fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let file = self.database_file.trim();
        if file.is_empty() {
            return Err(StoreError::Config("database_file must not be empty".to_string()));
        }
        if Path::new(file).components().count() != 1 {
            return Err(StoreError::Config(
                "database_file must be a bare file name".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(StoreError::Config("max_page_size must be positive".to_string()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(StoreError::Config(
                "default_page_size must be between 1 and max_page_size".to_string(),
            ));
        }
        Ok(())
    }
}
