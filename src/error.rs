use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, StacError>;

#[derive(thiserror::Error, Debug)]
pub enum StacError {
    #[error("Failed to read raster {path}: {reason}")]
    RasterRead { path: String, reason: String },

    #[error("Failed to extract source files from {path}: {reason}")]
    SourceExtraction { path: String, reason: String },

    #[error("Root catalog not found: {}", .0.display())]
    CatalogNotFound(PathBuf),

    #[error("Invalid dataset descriptor: {0}")]
    InvalidDatasetDescriptor(String),

    #[error("Collection `{0}` already exists in the catalog")]
    CollectionExists(String),

    #[error("Collection `{0}` not found in the catalog")]
    CollectionNotFound(String),

    #[error("Item `{item_id}` not found in collection `{collection_id}`")]
    ItemNotFound {
        collection_id: String,
        item_id: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StacError {
    pub(crate) fn raster_read(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::RasterRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn source_extraction(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceExtraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Raster read failures only affect the item being built.
    pub fn is_raster_read(&self) -> bool {
        matches!(self, Self::RasterRead { .. })
    }
}
