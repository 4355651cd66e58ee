pub mod builder;
pub mod catalog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod media_type;
pub mod model;
pub mod processor;
pub mod raster;
pub mod writer;

pub use catalog::{BatchReport, CatalogManager};
pub use config::{CatalogConfig, DuplicatePolicy};
pub use dataset::{DatasetDescriptor, DatasetSpec, ItemMode};
pub use error::{Result, StacError};
pub use model::{AdditionalProperties, Catalog, Collection, Item};
pub use processor::{DatasetProcessor, ProcessedDataset};
pub use raster::{GdalInspector, MemoryInspector, RasterInfo, RasterInspector};
pub use writer::CatalogWriter;
