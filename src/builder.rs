//! Construction of Catalog, Collection and Item values.
//!
//! Builders never touch the catalog directory. Apart from the raster
//! inspector passed to [`build_item`], the only hidden input is the clock.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::dataset::DatasetDescriptor;
use crate::error::Result;
use crate::media_type;
use crate::model::{
    Asset, Catalog, Collection, Extent, Geometry, Item, Link, OneOrMany, SpatialExtent,
    TemporalExtent, PROJECTION_EXTENSION, RASTER_EXTENSION, STAC_VERSION,
};
use crate::raster::{RasterInfo, RasterInspector, RasterLocation};

pub const DATA_ASSET: &str = "data";
pub const SOURCES_ASSET: &str = "sources";
pub const DEFAULT_LICENSE: &str = "proprietary";

/// How an Item gets its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemIdentity {
    Fixed(String),
    /// Fresh UUID v4.
    Random,
}

impl ItemIdentity {
    /// `<collection_id>-<stem>-vrt`, the id of an Item standing for a whole
    /// composite raster. Item files share one directory, so the collection id
    /// keeps same-named mosaics of different collections apart.
    pub fn composite(collection_id: &str, location: &RasterLocation) -> Self {
        Self::Fixed(format!("{collection_id}-{}-vrt", location.file_stem()))
    }

    fn resolve(self) -> String {
        match self {
            Self::Fixed(id) => id,
            Self::Random => Uuid::new_v4().to_string(),
        }
    }
}

/// RFC 3339 UTC timestamp with a `Z` suffix.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn build_catalog(config: &CatalogConfig) -> Catalog {
    let mut catalog = Catalog::new(&config.catalog_id, &config.description);
    catalog.title = Some(config.title.clone());
    catalog
}

pub fn build_collection(descriptor: &DatasetDescriptor, info: &RasterInfo) -> Collection {
    let dataset_type = descriptor.dataset_type();
    let mut summaries = Map::new();
    summaries.insert(format!("{dataset_type}:type"), json!([dataset_type]));
    summaries.insert(
        format!("{dataset_type}:resolution"),
        json!([info.resolution]),
    );

    Collection {
        object_type: "Collection".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: Vec::new(),
        id: descriptor.collection_id().to_string(),
        title: Some(descriptor.title().to_string()),
        description: descriptor.description().to_string(),
        license: DEFAULT_LICENSE.to_string(),
        providers: vec![descriptor.provider()],
        extent: Extent {
            spatial: SpatialExtent {
                bbox: vec![info.bbox],
                crs: info.crs.clone(),
            },
            temporal: TemporalExtent {
                interval: vec![[Some(timestamp()), None]],
            },
        },
        summaries,
        links: Vec::new(),
        extra: Map::new(),
    }
}

/// Builds the Item for the raster at `path`, queried through `inspector`.
///
/// The descriptor's additional properties are merged last, so they override
/// any generated property with the same key.
pub fn build_item<I: RasterInspector + ?Sized>(
    descriptor: &DatasetDescriptor,
    path: &str,
    identity: ItemIdentity,
    inspector: &I,
) -> Result<Item> {
    let info = inspector.inspect(path)?;
    Ok(build_item_from_info(descriptor, path, identity, &info))
}

/// Same as [`build_item`] for a raster whose metadata was already read.
pub fn build_item_from_info(
    descriptor: &DatasetDescriptor,
    path: &str,
    identity: ItemIdentity,
    info: &RasterInfo,
) -> Item {
    let location = RasterLocation::parse(path);
    let now = timestamp();
    let dataset_type = descriptor.dataset_type();

    let mut properties = Map::new();
    properties.insert("datetime".to_string(), json!(now));
    properties.insert("created".to_string(), json!(now));
    properties.insert("updated".to_string(), json!(now));
    properties.insert(format!("{dataset_type}:type"), json!(dataset_type));
    properties.insert(
        format!("{dataset_type}:resolution"),
        json!(info.resolution),
    );
    insert_projection(&mut properties, info);
    descriptor.properties().merge_into(&mut properties);

    let mut assets = BTreeMap::new();
    assets.insert(DATA_ASSET.to_string(), data_asset(&location, info));

    let collection_id = descriptor.collection_id();
    Item {
        object_type: "Feature".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: vec![
            PROJECTION_EXTENSION.to_string(),
            RASTER_EXTENSION.to_string(),
        ],
        id: identity.resolve(),
        collection: Some(collection_id.to_string()),
        geometry: Geometry::envelope(info.bbox),
        bbox: info.bbox,
        properties,
        assets,
        links: vec![Link::collection(collection_id)],
        extra: Map::new(),
    }
}

/// Asset listing the files a composite raster is made of.
pub fn sources_asset(sources: Vec<String>) -> Asset {
    let href = sources
        .iter()
        .map(|source| RasterLocation::parse(source).href())
        .collect();
    Asset {
        href: OneOrMany::Many(href),
        media_type: Some(media_type::GEOTIFF.to_string()),
        title: Some("Source rasters".to_string()),
        description: None,
        roles: vec!["source-data".to_string()],
        extra: Map::new(),
    }
}

fn data_asset(location: &RasterLocation, info: &RasterInfo) -> Asset {
    let file_name = location.file_name();
    let media_type = media_type::from_path(&file_name).unwrap_or(media_type::GEOTIFF);

    let mut band = Map::new();
    if let Some(nodata) = info.nodata {
        band.insert("nodata".to_string(), json!(nodata));
    }
    band.insert("spatial_resolution".to_string(), json!(info.resolution));
    band.insert("unit".to_string(), json!("meter"));

    let mut extra = Map::new();
    extra.insert("raster:bands".to_string(), Value::Array(vec![Value::Object(band)]));

    Asset {
        href: OneOrMany::One(location.href()),
        media_type: Some(media_type.to_string()),
        title: Some(file_name),
        description: None,
        roles: vec!["data".to_string()],
        extra,
    }
}

fn insert_projection(properties: &mut Map<String, Value>, info: &RasterInfo) {
    match (info.epsg, &info.crs) {
        (Some(code), _) => {
            properties.insert("proj:epsg".to_string(), json!(code));
        }
        (None, Some(wkt)) => {
            properties.insert("proj:wkt2".to_string(), json!(wkt));
        }
        (None, None) => {
            properties.insert("proj:epsg".to_string(), Value::Null);
        }
    }
    let (rows, cols) = info.shape;
    properties.insert("proj:shape".to_string(), json!([rows, cols]));
    // GDAL geotransform -> affine coefficients [a, b, c, d, e, f]
    let gt = info.transform;
    properties.insert(
        "proj:transform".to_string(),
        json!([gt[1], gt[2], gt[0], gt[4], gt[5], gt[3]]),
    );
    properties.insert("proj:bbox".to_string(), json!(info.bbox));
}
