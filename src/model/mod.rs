//! STAC 1.0.0 Catalog, Collection and Item documents.
//!
//! Field order in the structs is the key order of the written JSON. Fields
//! this crate does not model are kept in `extra` so that loading and saving a
//! document written by another tool does not drop them.

pub mod one_or_many;
pub mod properties;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::media_type;

pub use one_or_many::OneOrMany;
pub use properties::AdditionalProperties;

pub const STAC_VERSION: &str = "1.0.0";
pub const CATALOG_FILE_NAME: &str = "catalog.json";
pub const PROJECTION_EXTENSION: &str =
    "https://stac-extensions.github.io/projection/v1.1.0/schema.json";
pub const RASTER_EXTENSION: &str = "https://stac-extensions.github.io/raster/v1.1.0/schema.json";

pub fn collection_file_name(collection_id: &str) -> String {
    format!("{collection_id}-collection.json")
}

pub fn item_file_name(item_id: &str) -> String {
    format!("{item_id}.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: Some(media_type::JSON.to_string()),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Catalog -> Collection.
    pub fn child(collection_id: &str) -> Self {
        Self::new("child", collection_file_name(collection_id))
    }

    /// Collection -> Item.
    pub fn item(item_id: &str) -> Self {
        Self::new("item", item_file_name(item_id))
    }

    /// Item -> owning Collection.
    pub fn collection(collection_id: &str) -> Self {
        Self::new("collection", collection_file_name(collection_id))
    }

    pub fn is_child(&self) -> bool {
        self.rel == "child"
    }

    pub fn is_item(&self) -> bool {
        self.rel == "item"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "type")]
    pub object_type: String,
    pub stac_version: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Catalog {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            object_type: "Catalog".to_string(),
            stac_version: STAC_VERSION.to_string(),
            id: id.into(),
            title: None,
            description: description.into(),
            links: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Index of the child link pointing at `collection_id`'s file.
    pub fn child_position(&self, collection_id: &str) -> Option<usize> {
        let href = collection_file_name(collection_id);
        self.links
            .iter()
            .position(|link| link.is_child() && link_targets(&link.href, &href))
    }

    pub fn child_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.is_child())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    /// Open ends are `null`.
    pub interval: Vec<[Option<String>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

impl Extent {
    /// Union of all spatial bboxes, if any.
    pub fn union_bbox(bboxes: impl IntoIterator<Item = [f64; 4]>) -> Option<[f64; 4]> {
        bboxes.into_iter().reduce(|acc, b| {
            [
                acc[0].min(b[0]),
                acc[1].min(b[1]),
                acc[2].max(b[2]),
                acc[3].max(b[3]),
            ]
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub object_type: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub license: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<Provider>,
    pub extent: Extent,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub summaries: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Collection {
    /// Narrows or widens the spatial extent to the union of `bboxes`. An
    /// empty iterator leaves the extent untouched.
    pub fn fit_extent(&mut self, bboxes: impl IntoIterator<Item = [f64; 4]>) -> bool {
        match Extent::union_bbox(bboxes) {
            Some(bbox) => {
                self.extent.spatial.bbox = vec![bbox];
                true
            }
            None => false,
        }
    }

    pub fn item_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.is_item())
    }

    /// Item ids in link order, read back from `<item_id>.json` hrefs.
    pub fn item_ids(&self) -> Vec<String> {
        self.item_links()
            .filter_map(|link| {
                let name = link.href.rsplit('/').next()?;
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    /// Closed envelope ring of `[xmin, ymin, xmax, ymax]`.
    pub fn envelope(bbox: [f64; 4]) -> Self {
        let [xmin, ymin, xmax, ymax] = bbox;
        Geometry::Polygon {
            coordinates: vec![vec![
                [xmin, ymin],
                [xmin, ymax],
                [xmax, ymax],
                [xmax, ymin],
                [xmin, ymin],
            ]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: OneOrMany<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub object_type: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub geometry: Geometry,
    pub bbox: [f64; 4],
    pub properties: Map<String, Value>,
    pub assets: BTreeMap<String, Asset>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn link_targets(href: &str, file_name: &str) -> bool {
    href == file_name || href.strip_prefix("./") == Some(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_shapes() {
        let child = Link::child("usgs-3dep-dem").with_title("USGS 3DEP");
        assert_eq!(
            serde_json::to_value(&child).unwrap(),
            json!({
                "rel": "child",
                "href": "usgs-3dep-dem-collection.json",
                "type": "application/json",
                "title": "USGS 3DEP"
            })
        );
        assert_eq!(Link::item("abc").href, "abc.json");
    }

    #[test]
    fn test_catalog_json_shape() {
        let catalog = Catalog::new("root", "desc");
        let value = serde_json::to_value(&catalog).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Catalog",
                "stac_version": "1.0.0",
                "id": "root",
                "description": "desc",
                "links": []
            })
        );
    }

    #[test]
    fn test_catalog_keeps_unknown_fields() {
        let text = r#"{
            "type": "Catalog",
            "stac_version": "1.0.0",
            "id": "root",
            "description": "desc",
            "links": [{"rel": "self", "href": "./catalog.json"}],
            "stac_extensions": []
        }"#;
        let catalog: Catalog = serde_json::from_str(text).unwrap();
        assert_eq!(catalog.links[0].media_type, None);
        assert!(catalog.extra.contains_key("stac_extensions"));
        let again = serde_json::to_value(&catalog).unwrap();
        assert_eq!(again["stac_extensions"], json!([]));
    }

    #[test]
    fn test_child_position_accepts_dot_slash() {
        let mut catalog = Catalog::new("root", "desc");
        catalog
            .links
            .push(Link::new("child", "./a-collection.json"));
        catalog.links.push(Link::child("b"));
        assert_eq!(catalog.child_position("a"), Some(0));
        assert_eq!(catalog.child_position("b"), Some(1));
        assert_eq!(catalog.child_position("c"), None);
        assert_eq!(catalog.child_links().count(), 2);
    }

    #[test]
    fn test_envelope_is_closed() {
        let Geometry::Polygon { coordinates } = Geometry::envelope([-109.0, 37.0, -102.0, 41.0]);
        let ring = &coordinates[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[2], [-102.0, 41.0]);
    }

    #[test]
    fn test_geometry_json() {
        let value = serde_json::to_value(Geometry::envelope([0.0, 0.0, 1.0, 1.0])).unwrap();
        assert_eq!(value["type"], json!("Polygon"));
        assert_eq!(value["coordinates"][0][1], json!([0.0, 1.0]));
    }

    #[test]
    fn test_union_bbox() {
        assert_eq!(
            Extent::union_bbox([[0.0, 0.0, 1.0, 1.0], [-1.0, 0.5, 0.5, 2.0]]),
            Some([-1.0, 0.0, 1.0, 2.0])
        );
        assert_eq!(Extent::union_bbox(std::iter::empty()), None);
    }
}
