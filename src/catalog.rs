//! Loading and incrementally updating a catalog directory.
//!
//! The root `catalog.json` is either absent or present. [`CatalogManager::init`]
//! creates it; every other operation requires it and fails with
//! [`StacError::CatalogNotFound`] otherwise.

use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::builder;
use crate::config::{CatalogConfig, DuplicatePolicy};
use crate::dataset::DatasetDescriptor;
use crate::error::{Result, StacError};
use crate::model::{
    collection_file_name, item_file_name, AdditionalProperties, Catalog, Collection, Item, Link,
};
use crate::processor::{DatasetProcessor, ProcessedDataset};
use crate::raster::{GdalInspector, RasterInspector};
use crate::writer::{read_json, CatalogWriter};

/// Outcome of [`CatalogManager::add_datasets`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Collection ids written, in input order.
    pub added: Vec<String>,
    /// `(dataset path, error)` for every dataset that failed.
    pub failed: Vec<(String, StacError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CatalogManager<I = GdalInspector> {
    config: CatalogConfig,
    processor: DatasetProcessor<I>,
    writer: CatalogWriter,
}

impl CatalogManager<GdalInspector> {
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_inspector(config, GdalInspector::new())
    }
}

impl<I: RasterInspector> CatalogManager<I> {
    pub fn with_inspector(config: CatalogConfig, inspector: I) -> Self {
        Self {
            config,
            processor: DatasetProcessor::new(inspector),
            writer: CatalogWriter::new(),
        }
    }

    fn dir(&self) -> &Path {
        &self.config.catalog_dir
    }

    pub fn exists(&self) -> bool {
        self.config.catalog_path().is_file()
    }

    /// Writes a fresh root catalog with no links. An existing catalog is left
    /// untouched and returned as loaded.
    pub fn init(&self) -> Result<Catalog> {
        if self.exists() {
            warn!(
                "Catalog already exists at {}, leaving it as is",
                self.config.catalog_path().display()
            );
            return self.load();
        }
        let catalog = builder::build_catalog(&self.config);
        self.writer.write_catalog(self.dir(), &catalog)?;
        info!("Initialized catalog {} in {}", catalog.id, self.dir().display());
        Ok(catalog)
    }

    pub fn load(&self) -> Result<Catalog> {
        let path = self.config.catalog_path();
        if !path.is_file() {
            return Err(StacError::CatalogNotFound(path));
        }
        read_json(&path)
    }

    pub fn set_metadata(&self, title: Option<&str>, description: Option<&str>) -> Result<Catalog> {
        let mut catalog = self.load()?;
        if let Some(title) = title {
            catalog.title = Some(title.to_string());
        }
        if let Some(description) = description {
            catalog.description = description.to_string();
        }
        self.writer.write_catalog(self.dir(), &catalog)?;
        Ok(catalog)
    }

    /// Builds the dataset's Collection and Items, links the Collection from
    /// the root catalog and writes everything.
    pub fn add_dataset(&self, descriptor: &DatasetDescriptor) -> Result<ProcessedDataset> {
        let mut catalog = self.load()?;
        let collection_id = descriptor.collection_id();
        let existing = catalog.child_position(collection_id);

        let policy = self.config.duplicate_policy;
        if existing.is_some() && policy == DuplicatePolicy::Reject {
            return Err(StacError::CollectionExists(collection_id.to_string()));
        }
        // item ids of the collection being replaced, for cleanup after the write
        let stale_items = match existing {
            Some(_) if policy == DuplicatePolicy::Replace => {
                self.owned_item_ids(collection_id, self.previous_item_ids(collection_id))
            }
            _ => Vec::new(),
        };

        let processed = self.processor.process(descriptor)?;

        let link = Link::child(collection_id).with_title(descriptor.title());
        match (existing, policy) {
            (Some(index), DuplicatePolicy::Replace) => catalog.links[index] = link,
            _ => catalog.links.push(link),
        }

        self.writer.write(
            self.dir(),
            &catalog,
            &processed.collection,
            &processed.items,
        )?;

        let stale: Vec<&str> = stale_items
            .iter()
            .map(String::as_str)
            .filter(|id| !processed.items.contains_key(*id))
            .collect();
        if !stale.is_empty() {
            info!(
                "Removing {} item files left over from the previous {}",
                stale.len(),
                collection_id
            );
            for id in stale {
                self.writer.remove_item_file(self.dir(), id)?;
            }
        }

        Ok(processed)
    }

    /// Adds each dataset in turn. A failing dataset is recorded and the
    /// batch moves on.
    pub fn add_datasets(&self, descriptors: &[DatasetDescriptor]) -> BatchReport {
        let mut report = BatchReport::default();
        for descriptor in descriptors {
            match self.add_dataset(descriptor) {
                Ok(processed) => report.added.push(processed.collection.id),
                Err(e) => {
                    warn!("Failed to add {}: {}", descriptor.path(), e);
                    report.failed.push((descriptor.path().to_string(), e));
                }
            }
        }
        info!(
            "Added {} datasets, {} failed",
            report.added.len(),
            report.failed.len()
        );
        report
    }

    /// Collection ids linked from the root catalog, in link order.
    pub fn collection_ids(&self) -> Result<Vec<String>> {
        let catalog = self.load()?;
        let mut seen = HashSet::new();
        Ok(catalog
            .child_links()
            .filter_map(|link| {
                let name = link.href.rsplit('/').next()?;
                name.strip_suffix("-collection.json").map(str::to_string)
            })
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }

    pub fn load_collection(&self, collection_id: &str) -> Result<Collection> {
        let catalog = self.load()?;
        if catalog.child_position(collection_id).is_none() {
            return Err(StacError::CollectionNotFound(collection_id.to_string()));
        }
        read_json(&self.dir().join(collection_file_name(collection_id)))
    }

    pub fn load_items(&self, collection_id: &str) -> Result<Vec<Item>> {
        let collection = self.load_collection(collection_id)?;
        collection
            .item_ids()
            .iter()
            .map(|id| read_json(&self.dir().join(item_file_name(id))))
            .collect()
    }

    pub fn load_item(&self, collection_id: &str, item_id: &str) -> Result<Item> {
        let collection = self.load_collection(collection_id)?;
        if !collection.item_ids().iter().any(|id| id == item_id) {
            return Err(item_not_found(collection_id, item_id));
        }
        read_json(&self.dir().join(item_file_name(item_id)))
    }

    /// Unlinks a collection from the root catalog and deletes its files.
    pub fn remove_collection(&self, collection_id: &str) -> Result<()> {
        let mut catalog = self.load()?;
        if catalog.child_position(collection_id).is_none() {
            return Err(StacError::CollectionNotFound(collection_id.to_string()));
        }
        let item_ids = self.owned_item_ids(collection_id, self.previous_item_ids(collection_id));

        while let Some(index) = catalog.child_position(collection_id) {
            catalog.links.remove(index);
        }
        self.writer.write_catalog(self.dir(), &catalog)?;
        self.writer.remove_collection_files(
            self.dir(),
            collection_id,
            item_ids.iter().map(String::as_str),
        )?;
        info!("Removed collection {}", collection_id);
        Ok(())
    }

    /// Unlinks one item from its collection, deletes its file and shrinks the
    /// collection extent to the remaining items.
    pub fn remove_item(&self, collection_id: &str, item_id: &str) -> Result<()> {
        let mut collection = self.load_collection(collection_id)?;
        let href = item_file_name(item_id);
        let before = collection.links.len();
        collection
            .links
            .retain(|link| !(link.is_item() && link.href.rsplit('/').next() == Some(href.as_str())));
        if collection.links.len() == before {
            return Err(item_not_found(collection_id, item_id));
        }
        self.fit_extent(&mut collection)?;
        self.writer.write_collection(self.dir(), &collection)?;
        self.writer.remove_item_file(self.dir(), item_id)
    }

    /// Recomputes the collection's spatial extent from its items on disk.
    /// A collection without items keeps its extent.
    pub fn update_collection_extent(&self, collection_id: &str) -> Result<Collection> {
        let mut collection = self.load_collection(collection_id)?;
        self.fit_extent(&mut collection)?;
        self.writer.write_collection(self.dir(), &collection)?;
        Ok(collection)
    }

    fn fit_extent(&self, collection: &mut Collection) -> Result<()> {
        let bboxes = collection
            .item_ids()
            .iter()
            .map(|id| read_json::<Item>(&self.dir().join(item_file_name(id))).map(|item| item.bbox))
            .collect::<Result<Vec<_>>>()?;
        if collection.fit_extent(bboxes) {
            info!(
                "Extent of {} is now {:?}",
                collection.id, collection.extent.spatial.bbox
            );
        }
        Ok(())
    }

    pub fn update_item_properties(
        &self,
        collection_id: &str,
        item_id: &str,
        properties: &AdditionalProperties,
    ) -> Result<Item> {
        let mut item = self.load_item(collection_id, item_id)?;
        properties.merge_into(&mut item.properties);
        self.save_item(item)
    }

    pub fn remove_item_properties(
        &self,
        collection_id: &str,
        item_id: &str,
        keys: &[&str],
    ) -> Result<Item> {
        let mut item = self.load_item(collection_id, item_id)?;
        for key in keys {
            item.properties.remove(*key);
        }
        self.save_item(item)
    }

    /// Merges `properties` into every item of the collection. Returns the
    /// number of items updated.
    pub fn update_collection_items_properties(
        &self,
        collection_id: &str,
        properties: &AdditionalProperties,
    ) -> Result<usize> {
        self.update_collection_items_properties_where(collection_id, properties, |_| true)
    }

    /// Like [`Self::update_collection_items_properties`], limited to the
    /// items `filter` accepts.
    pub fn update_collection_items_properties_where<F>(
        &self,
        collection_id: &str,
        properties: &AdditionalProperties,
        filter: F,
    ) -> Result<usize>
    where
        F: Fn(&Item) -> bool,
    {
        let mut updated = 0;
        for mut item in self.load_items(collection_id)? {
            if !filter(&item) {
                continue;
            }
            properties.merge_into(&mut item.properties);
            self.save_item(item)?;
            updated += 1;
        }
        info!("Updated properties of {} items in {}", updated, collection_id);
        Ok(updated)
    }

    /// Removes `keys` from the properties of every item `filter` accepts.
    pub fn remove_collection_items_properties<F>(
        &self,
        collection_id: &str,
        keys: &[&str],
        filter: F,
    ) -> Result<usize>
    where
        F: Fn(&Item) -> bool,
    {
        let mut updated = 0;
        for mut item in self.load_items(collection_id)? {
            if !filter(&item) {
                continue;
            }
            for key in keys {
                item.properties.remove(*key);
            }
            self.save_item(item)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Keeps the ids whose file still belongs to `collection_id`. Item files
    /// share one directory, so a file may have been rewritten by another
    /// collection since it was linked.
    fn owned_item_ids(&self, collection_id: &str, item_ids: Vec<String>) -> Vec<String> {
        item_ids
            .into_iter()
            .filter(|id| {
                let path = self.dir().join(item_file_name(id));
                if !path.exists() {
                    return false;
                }
                match read_json::<Item>(&path) {
                    Ok(item) if item.collection.as_deref() == Some(collection_id) => true,
                    Ok(item) => {
                        warn!(
                            "Keeping {}: it belongs to collection {:?}, not {}",
                            path.display(),
                            item.collection,
                            collection_id
                        );
                        false
                    }
                    Err(e) => {
                        warn!("Keeping unreadable {}: {}", path.display(), e);
                        false
                    }
                }
            })
            .collect()
    }

    fn save_item(&self, mut item: Item) -> Result<Item> {
        item.properties
            .insert("updated".to_string(), Value::String(builder::timestamp()));
        self.writer.write_item(self.dir(), &item)?;
        Ok(item)
    }

    /// Item ids of a collection already on disk; empty when it cannot be read.
    fn previous_item_ids(&self, collection_id: &str) -> Vec<String> {
        let path = self.dir().join(collection_file_name(collection_id));
        match read_json::<Collection>(&path) {
            Ok(collection) => collection.item_ids(),
            Err(e) => {
                warn!("Could not read previous {}: {}", collection_id, e);
                Vec::new()
            }
        }
    }
}

fn item_not_found(collection_id: &str, item_id: &str) -> StacError {
    StacError::ItemNotFound {
        collection_id: collection_id.to_string(),
        item_id: item_id.to_string(),
    }
}
