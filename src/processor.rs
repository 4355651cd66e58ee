use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::builder::{self, ItemIdentity, SOURCES_ASSET};
use crate::dataset::{DatasetDescriptor, ItemMode};
use crate::error::{Result, StacError};
use crate::model::{Collection, Item, Link};
use crate::raster::{RasterInfo, RasterInspector, RasterLocation};

/// A Collection with its Items, linked and ready to be written.
#[derive(Debug, Clone)]
pub struct ProcessedDataset {
    pub collection: Collection,
    /// Keyed by item id. Processing order is kept in the collection's links.
    pub items: BTreeMap<String, Item>,
}

/// Turns a dataset descriptor into a Collection and its Items.
pub struct DatasetProcessor<I> {
    inspector: I,
}

impl<I: RasterInspector> DatasetProcessor<I> {
    pub fn new(inspector: I) -> Self {
        Self { inspector }
    }

    pub fn process(&self, descriptor: &DatasetDescriptor) -> Result<ProcessedDataset> {
        let info = self.inspector.inspect(descriptor.path())?;
        let collection = builder::build_collection(descriptor, &info);

        let mode = descriptor.item_mode();
        info!(
            "Processing {} into collection {} ({:?} mode)",
            descriptor.path(),
            descriptor.collection_id(),
            mode
        );
        let items = match mode {
            ItemMode::Single => vec![self.composite_item(descriptor, &info)],
            ItemMode::PerFile => self.per_file_items(descriptor)?,
        };

        let mut processed = ProcessedDataset {
            collection,
            items: BTreeMap::new(),
        };
        for (item, title) in items {
            processed
                .collection
                .links
                .push(Link::item(&item.id).with_title(title));
            processed.items.insert(item.id.clone(), item);
        }
        processed
            .collection
            .fit_extent(processed.items.values().map(|item| item.bbox));
        Ok(processed)
    }

    /// The reference raster was already read for the collection, so its
    /// metadata is reused here.
    fn composite_item(&self, descriptor: &DatasetDescriptor, info: &RasterInfo) -> (Item, String) {
        let location = descriptor.location();
        let mut item = builder::build_item_from_info(
            descriptor,
            descriptor.path(),
            ItemIdentity::composite(descriptor.collection_id(), location),
            info,
        );

        match self.inspector.sources(descriptor.path()) {
            Ok(sources) => {
                debug!("{} lists {} source files", descriptor.path(), sources.len());
                item.assets
                    .insert(SOURCES_ASSET.to_string(), builder::sources_asset(sources));
            }
            Err(e) => warn!("Omitting sources asset for {}: {}", descriptor.path(), e),
        }
        (item, location.file_name())
    }

    fn per_file_items(&self, descriptor: &DatasetDescriptor) -> Result<Vec<(Item, String)>> {
        let sources = if descriptor.is_composite() {
            self.inspector.sources(descriptor.path())?
        } else {
            vec![descriptor.path().to_string()]
        };
        if sources.is_empty() {
            return Err(StacError::source_extraction(
                descriptor.path(),
                "composite raster lists no source files",
            ));
        }

        let mut items = Vec::with_capacity(sources.len());
        let mut last_error = None;
        for source in &sources {
            match builder::build_item(descriptor, source, ItemIdentity::Random, &self.inspector) {
                Ok(item) => items.push((item, RasterLocation::parse(source).file_name())),
                Err(e) if e.is_raster_read() => {
                    warn!("Skipping {}: {}", source, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) if items.is_empty() => Err(e),
            _ => {
                info!("Built {} of {} items", items.len(), sources.len());
                Ok(items)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::MemoryInspector;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashSet;

    fn tile(xmin: f64, ymax: f64) -> RasterInfo {
        let mut info = RasterInfo::from_transform([xmin, 1.0, 0.0, ymax, 0.0, -1.0], 2, 2);
        info.epsg = Some(4326);
        info.crs = Some("EPSG:4326".to_string());
        info
    }

    fn mosaic_inspector() -> MemoryInspector {
        MemoryInspector::new()
            .with_raster("/data/mosaic.vrt", tile(0.0, 2.0))
            .with_raster("/data/a.tif", tile(0.0, 2.0))
            .with_raster("/data/b.tif", tile(2.0, 2.0))
            .with_raster("/data/c.tif", tile(4.0, 2.0))
            .with_sources("/data/mosaic.vrt", ["/data/a.tif", "/data/b.tif", "/data/c.tif"])
    }

    #[test]
    fn test_single_item_mode() {
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .build()
            .unwrap();
        let processed = DatasetProcessor::new(mosaic_inspector())
            .process(&descriptor)
            .unwrap();

        assert_eq!(processed.items.len(), 1);
        let item = &processed.items["usgs-dem-mosaic-mosaic-vrt"];
        assert_eq!(
            item.assets["data"].media_type.as_deref(),
            Some("application/x-vrt")
        );
        let sources = &item.assets[SOURCES_ASSET];
        assert_eq!(sources.href.as_slice().len(), 3);
        assert_eq!(sources.roles, vec!["source-data"]);

        let links: Vec<_> = processed.collection.item_links().collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "usgs-dem-mosaic-mosaic-vrt.json");
        assert_eq!(links[0].title.as_deref(), Some("mosaic.vrt"));
        assert_eq!(links[0].media_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_single_item_without_sources() {
        let inspector = MemoryInspector::new().with_raster("/data/mosaic.vrt", tile(0.0, 2.0));
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .build()
            .unwrap();
        let processed = DatasetProcessor::new(inspector).process(&descriptor).unwrap();
        let item = &processed.items["usgs-dem-mosaic-mosaic-vrt"];
        assert!(!item.assets.contains_key(SOURCES_ASSET));
        assert!(item.assets.contains_key("data"));
    }

    #[test]
    fn test_per_file_mode() {
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .use_composite_as_item(false)
            .build()
            .unwrap();
        let processed = DatasetProcessor::new(mosaic_inspector())
            .process(&descriptor)
            .unwrap();

        assert_eq!(processed.items.len(), 3);
        let hrefs: HashSet<_> = processed
            .collection
            .item_links()
            .map(|link| link.href.clone())
            .collect();
        assert_eq!(hrefs.len(), 3);
        assert_eq!(processed.collection.item_ids().len(), 3);

        let titles: Vec<_> = processed
            .collection
            .item_links()
            .filter_map(|link| link.title.clone())
            .collect();
        assert_eq!(titles, vec!["a.tif", "b.tif", "c.tif"]);

        for item in processed.items.values() {
            assert!(!item.assets.contains_key(SOURCES_ASSET));
            assert_eq!(
                item.assets["data"].media_type.as_deref(),
                Some("image/tiff; application=geotiff")
            );
        }
        // union of the three tiles, wider than the reference raster
        assert_eq!(
            processed.collection.extent.spatial.bbox,
            vec![[0.0, 0.0, 6.0, 2.0]]
        );
    }

    #[test]
    fn test_extent_covers_readable_items_only() {
        let inspector = MemoryInspector::new()
            .with_raster("/data/mosaic.vrt", tile(0.0, 2.0))
            .with_raster("/data/a.tif", tile(0.0, 2.0))
            .with_raster("/data/c.tif", tile(4.0, 4.0))
            .with_sources("/data/mosaic.vrt", ["/data/a.tif", "/data/gone.tif", "/data/c.tif"]);
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .use_composite_as_item(false)
            .build()
            .unwrap();
        let processed = DatasetProcessor::new(inspector).process(&descriptor).unwrap();
        assert_eq!(
            processed.collection.extent.spatial.bbox,
            vec![[0.0, 0.0, 6.0, 4.0]]
        );
    }

    /// Counts `inspect` calls per path.
    struct CountingInspector {
        inner: MemoryInspector,
        calls: RefCell<Vec<String>>,
    }

    impl RasterInspector for CountingInspector {
        fn inspect(&self, path: &str) -> Result<RasterInfo> {
            self.calls.borrow_mut().push(path.to_string());
            self.inner.inspect(path)
        }

        fn sources(&self, path: &str) -> Result<Vec<String>> {
            self.inner.sources(path)
        }
    }

    #[test]
    fn test_single_item_reads_reference_once() {
        let inspector = CountingInspector {
            inner: mosaic_inspector(),
            calls: RefCell::new(Vec::new()),
        };
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .build()
            .unwrap();
        let processed = DatasetProcessor::new(&inspector).process(&descriptor).unwrap();
        assert_eq!(processed.items.len(), 1);
        assert_eq!(*inspector.calls.borrow(), vec!["/data/mosaic.vrt"]);
    }

    #[test]
    fn test_plain_raster_is_one_item() {
        let descriptor = DatasetDescriptor::builder("/data/b.tif", "NOAA")
            .property("priority", 2)
            .build()
            .unwrap();
        let processed = DatasetProcessor::new(mosaic_inspector())
            .process(&descriptor)
            .unwrap();
        assert_eq!(processed.items.len(), 1);
        let item = processed.items.values().next().unwrap();
        assert_eq!(item.bbox, [2.0, 0.0, 4.0, 2.0]);
        assert_eq!(item.properties["priority"], json!(2));
    }

    #[test]
    fn test_unreadable_source_is_skipped() {
        let inspector = MemoryInspector::new()
            .with_raster("/data/mosaic.vrt", tile(0.0, 2.0))
            .with_raster("/data/a.tif", tile(0.0, 2.0))
            .with_sources("/data/mosaic.vrt", ["/data/a.tif", "/data/gone.tif"]);
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .use_composite_as_item(false)
            .build()
            .unwrap();
        let processed = DatasetProcessor::new(inspector).process(&descriptor).unwrap();
        assert_eq!(processed.items.len(), 1);
        assert_eq!(processed.collection.item_links().count(), 1);
    }

    #[test]
    fn test_all_sources_unreadable() {
        let inspector = MemoryInspector::new()
            .with_raster("/data/mosaic.vrt", tile(0.0, 2.0))
            .with_sources("/data/mosaic.vrt", ["/data/x.tif", "/data/y.tif"]);
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .use_composite_as_item(false)
            .build()
            .unwrap();
        let err = DatasetProcessor::new(inspector)
            .process(&descriptor)
            .unwrap_err();
        match err {
            StacError::RasterRead { path, .. } => assert_eq!(path, "/data/y.tif"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_per_file_needs_sources() {
        let inspector = MemoryInspector::new().with_raster("/data/mosaic.vrt", tile(0.0, 2.0));
        let descriptor = DatasetDescriptor::builder("/data/mosaic.vrt", "USGS")
            .use_composite_as_item(false)
            .build()
            .unwrap();
        let err = DatasetProcessor::new(&inspector)
            .process(&descriptor)
            .unwrap_err();
        assert!(matches!(err, StacError::SourceExtraction { .. }));

        let inspector = inspector.with_sources("/data/mosaic.vrt", Vec::<String>::new());
        let err = DatasetProcessor::new(inspector)
            .process(&descriptor)
            .unwrap_err();
        assert!(matches!(err, StacError::SourceExtraction { .. }));
    }

    #[test]
    fn test_unreadable_reference_raster() {
        let descriptor = DatasetDescriptor::builder("/data/none.vrt", "USGS")
            .build()
            .unwrap();
        let err = DatasetProcessor::new(mosaic_inspector())
            .process(&descriptor)
            .unwrap_err();
        assert!(err.is_raster_read());
    }
}
