use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, StacError};
use crate::model::{collection_file_name, item_file_name, Catalog, Collection, Item, CATALOG_FILE_NAME};

/// Persists catalogs as flat directories of pretty-printed JSON files.
///
/// Files are written one after another; a failure part way through leaves
/// the files already written in place.
#[derive(Debug, Default)]
pub struct CatalogWriter {}

impl CatalogWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(
        &self,
        dir: &Path,
        catalog: &Catalog,
        collection: &Collection,
        items: &BTreeMap<String, Item>,
    ) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| StacError::io(dir, e))?;

        self.write_catalog(dir, catalog)?;
        self.write_collection(dir, collection)?;
        for item in items.values() {
            self.write_item(dir, item)?;
        }

        info!(
            "Wrote collection {} with {} items to {}",
            collection.id,
            items.len(),
            dir.display()
        );
        Ok(())
    }

    pub fn write_catalog(&self, dir: &Path, catalog: &Catalog) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| StacError::io(dir, e))?;
        write_json(&dir.join(CATALOG_FILE_NAME), catalog)
    }

    pub fn write_collection(&self, dir: &Path, collection: &Collection) -> Result<()> {
        write_json(&dir.join(collection_file_name(&collection.id)), collection)
    }

    pub fn write_item(&self, dir: &Path, item: &Item) -> Result<()> {
        write_json(&dir.join(item_file_name(&item.id)), item)
    }

    /// Deletes an item file; a missing file is not an error.
    pub fn remove_item_file(&self, dir: &Path, item_id: &str) -> Result<()> {
        remove_if_exists(&dir.join(item_file_name(item_id)))
    }

    /// Deletes a collection file and the given item files. Missing files are
    /// skipped.
    pub fn remove_collection_files<'a>(
        &self,
        dir: &Path,
        collection_id: &str,
        item_ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for item_id in item_ids {
            self.remove_item_file(dir, item_id)?;
        }
        remove_if_exists(&dir.join(collection_file_name(collection_id)))
    }
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| StacError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| StacError::json(path, e))?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|e| StacError::io(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| StacError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| StacError::json(path, e))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StacError::io(path, e)),
    }
}
