use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where downloaded media and the catalog file live.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
}

impl StorageConfig {
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog_file: default_catalog_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tmp")
}

fn default_catalog_file() -> String {
    "infos.json".to_string()
}
