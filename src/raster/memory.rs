use std::collections::HashMap;

use super::{RasterInfo, RasterInspector};
use crate::error::{Result, StacError};

/// Inspector answering from metadata registered up front.
///
/// Useful when raster metadata is already known (e.g. from an index) and for
/// building catalogs without touching the rasters themselves.
#[derive(Debug, Default, Clone)]
pub struct MemoryInspector {
    rasters: HashMap<String, RasterInfo>,
    sources: HashMap<String, Vec<String>>,
}

impl MemoryInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raster(mut self, path: impl Into<String>, info: RasterInfo) -> Self {
        self.rasters.insert(path.into(), info);
        self
    }

    pub fn with_sources<S: Into<String>>(
        mut self,
        path: impl Into<String>,
        sources: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sources
            .insert(path.into(), sources.into_iter().map(Into::into).collect());
        self
    }
}

impl RasterInspector for MemoryInspector {
    fn inspect(&self, path: &str) -> Result<RasterInfo> {
        self.rasters
            .get(path)
            .cloned()
            .ok_or_else(|| StacError::raster_read(path, "no metadata registered"))
    }

    fn sources(&self, path: &str) -> Result<Vec<String>> {
        self.sources
            .get(path)
            .cloned()
            .ok_or_else(|| StacError::source_extraction(path, "no source list registered"))
    }
}
