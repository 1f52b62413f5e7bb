//! Order store selection

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Which order store backs the service
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Flat JSON document with Spanish status vocabulary
    #[default]
    File,
    /// PostgreSQL with English status vocabulary
    Postgres,
    /// Process memory; development and tests only
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path of the orders document for the file backend
    #[serde(default = "default_orders_file")]
    pub orders_file: PathBuf,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == StorageBackend::File && self.orders_file.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("NERIN__STORAGE__ORDERS_FILE"));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            orders_file: default_orders_file(),
        }
    }
}

fn default_orders_file() -> PathBuf {
    PathBuf::from("data/orders.json")
}
