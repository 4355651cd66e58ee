use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{Result, StacError};
use crate::model::CATALOG_FILE_NAME;

pub const DEFAULT_CATALOG_ID: &str = "root";
pub const DEFAULT_CATALOG_TITLE: &str = "Geospatial Data Catalog";
pub const DEFAULT_CATALOG_DESCRIPTION: &str = "Comprehensive catalog of geospatial datasets";

/// What `add_dataset` does when the collection id is already linked from the
/// root catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Rewrite the collection and keep a single child link.
    #[default]
    Replace,
    /// Rewrite the collection and append another child link.
    Append,
    /// Fail with `CollectionExists` before reading any raster.
    Reject,
}

/// Settings for one catalog directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub catalog_dir: PathBuf,
    pub catalog_id: String,
    pub title: String,
    pub description: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from("stac_catalog"),
            catalog_id: DEFAULT_CATALOG_ID.to_string(),
            title: DEFAULT_CATALOG_TITLE.to_string(),
            description: DEFAULT_CATALOG_DESCRIPTION.to_string(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl CatalogConfig {
    pub fn new(catalog_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog_dir: catalog_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| StacError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| StacError::json(path, e))
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_dir.join(CATALOG_FILE_NAME)
    }
}
