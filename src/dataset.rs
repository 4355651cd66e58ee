use serde::{Deserialize, Serialize};

use crate::error::{Result, StacError};
use crate::media_type;
use crate::model::{AdditionalProperties, Provider};
use crate::raster::RasterLocation;

pub const DEFAULT_DATASET_TYPE: &str = "dem";
pub const DEFAULT_PROVIDER_ROLES: [&str; 2] = ["producer", "processor"];

/// How a dataset maps onto STAC Items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemMode {
    /// One Item for the composite raster, sources listed as an asset.
    Single,
    /// One Item per underlying raster file.
    PerFile,
}

/// Caller input for one dataset, with every derivable field optional.
///
/// Deserialisable so batch inputs can be read from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSpec {
    pub path: String,
    pub provider_name: String,
    pub provider_url: Option<String>,
    pub provider_roles: Option<Vec<String>>,
    pub collection_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub dataset_type: Option<String>,
    #[serde(alias = "use_vrt_as_item")]
    pub use_composite_as_item: Option<bool>,
    pub properties: AdditionalProperties,
}

impl DatasetSpec {
    pub fn new(path: impl Into<String>, provider_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            provider_name: provider_name.into(),
            ..Default::default()
        }
    }

    pub fn provider_url(mut self, url: impl Into<String>) -> Self {
        self.provider_url = Some(url.into());
        self
    }

    pub fn provider_roles<S: Into<String>>(mut self, roles: impl IntoIterator<Item = S>) -> Self {
        self.provider_roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn collection_id(mut self, id: impl Into<String>) -> Self {
        self.collection_id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn dataset_type(mut self, dataset_type: impl Into<String>) -> Self {
        self.dataset_type = Some(dataset_type.into());
        self
    }

    pub fn use_composite_as_item(mut self, enabled: bool) -> Self {
        self.use_composite_as_item = Some(enabled);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn properties(mut self, properties: AdditionalProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Validates the input and fills derived defaults. No raster I/O happens
    /// here, so a bad descriptor fails before anything is read or written.
    pub fn build(self) -> Result<DatasetDescriptor> {
        let path = self.path.trim().to_string();
        if path.is_empty() {
            return Err(invalid("path must not be empty"));
        }
        let provider_name = self.provider_name.trim().to_string();
        if provider_name.is_empty() {
            return Err(invalid("provider_name must not be empty"));
        }

        let dataset_type = self
            .dataset_type
            .unwrap_or_else(|| DEFAULT_DATASET_TYPE.to_string());
        if dataset_type.is_empty() || dataset_type.contains(':') {
            return Err(invalid(format!(
                "dataset_type `{dataset_type}` must be non-empty and contain no ':'"
            )));
        }

        let location = RasterLocation::parse(&path);
        let collection_id = match self.collection_id {
            Some(id) => id,
            None => format!(
                "{}-{}-{}",
                provider_name.to_lowercase(),
                dataset_type,
                location.file_stem()
            ),
        };
        if collection_id.is_empty() || collection_id.contains(['/', '\\']) {
            return Err(invalid(format!(
                "collection_id `{collection_id}` cannot be used as a file name"
            )));
        }

        let title = self.title.unwrap_or_else(|| {
            format!("{provider_name} {} dataset", dataset_type.to_uppercase())
        });
        let description = self
            .description
            .unwrap_or_else(|| format!("Dataset provided by {provider_name}"));
        let provider_roles = self
            .provider_roles
            .unwrap_or_else(|| DEFAULT_PROVIDER_ROLES.map(String::from).to_vec());

        Ok(DatasetDescriptor {
            path,
            location,
            provider_name,
            provider_url: self.provider_url,
            provider_roles,
            collection_id,
            title,
            description,
            dataset_type,
            use_composite_as_item: self.use_composite_as_item.unwrap_or(true),
            properties: self.properties,
        })
    }
}

fn invalid(reason: impl Into<String>) -> StacError {
    StacError::InvalidDatasetDescriptor(reason.into())
}

/// Validated, immutable description of one dataset to catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    path: String,
    location: RasterLocation,
    provider_name: String,
    provider_url: Option<String>,
    provider_roles: Vec<String>,
    collection_id: String,
    title: String,
    description: String,
    dataset_type: String,
    use_composite_as_item: bool,
    properties: AdditionalProperties,
}

impl DatasetDescriptor {
    pub fn builder(path: impl Into<String>, provider_name: impl Into<String>) -> DatasetSpec {
        DatasetSpec::new(path, provider_name)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn location(&self) -> &RasterLocation {
        &self.location
    }

    pub fn provider(&self) -> Provider {
        Provider {
            name: self.provider_name.clone(),
            roles: self.provider_roles.clone(),
            url: self.provider_url.clone(),
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dataset_type(&self) -> &str {
        &self.dataset_type
    }

    pub fn properties(&self) -> &AdditionalProperties {
        &self.properties
    }

    /// Whether the path names a composite (VRT) raster.
    pub fn is_composite(&self) -> bool {
        media_type::from_path(&self.location.file_name()) == Some(media_type::VRT)
    }

    pub fn item_mode(&self) -> ItemMode {
        if self.use_composite_as_item && self.is_composite() {
            ItemMode::Single
        } else {
            ItemMode::PerFile
        }
    }
}
