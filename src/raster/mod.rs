pub mod location;
pub mod memory;
pub mod vrt;

use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, Metadata};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, StacError};

pub use location::RasterLocation;
pub use memory::MemoryInspector;

/// Geospatial summary of a raster, in its native CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    /// `[xmin, ymin, xmax, ymax]`
    pub bbox: [f64; 4],
    /// `EPSG:<code>` when the CRS carries an EPSG authority, WKT otherwise.
    pub crs: Option<String>,
    pub epsg: Option<u32>,
    /// Pixel width in CRS units.
    pub resolution: f64,
    /// `(rows, cols)`
    pub shape: (usize, usize),
    pub transform: [f64; 6],
    pub nodata: Option<f64>,
}

impl RasterInfo {
    pub fn from_transform(transform: [f64; 6], cols: usize, rows: usize) -> Self {
        Self {
            bbox: extent_from_transform(&transform, cols, rows),
            crs: None,
            epsg: None,
            resolution: transform[1].abs(),
            shape: (rows, cols),
            transform,
            nodata: None,
        }
    }
}

/// Reads raster metadata. GDAL backs the default implementation.
pub trait RasterInspector {
    fn inspect(&self, path: &str) -> Result<RasterInfo>;

    /// Underlying files of a composite raster such as a VRT mosaic.
    fn sources(&self, path: &str) -> Result<Vec<String>>;
}

impl<T: RasterInspector + ?Sized> RasterInspector for &T {
    fn inspect(&self, path: &str) -> Result<RasterInfo> {
        (**self).inspect(path)
    }

    fn sources(&self, path: &str) -> Result<Vec<String>> {
        (**self).sources(path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GdalInspector;

impl GdalInspector {
    pub fn new() -> Self {
        Self
    }
}

impl RasterInspector for GdalInspector {
    fn inspect(&self, path: &str) -> Result<RasterInfo> {
        let location = RasterLocation::parse(path);
        let dataset =
            Dataset::open(location.gdal_path()).map_err(|e| StacError::raster_read(path, e))?;

        let transform = dataset
            .geo_transform()
            .map_err(|e| StacError::raster_read(path, format!("no geotransform: {e}")))?;
        let (cols, rows) = dataset.raster_size();
        if cols == 0 || rows == 0 {
            return Err(StacError::raster_read(path, "raster has an empty extent"));
        }

        let mut info = RasterInfo::from_transform(transform, cols, rows);

        if let Ok(srs) = dataset.spatial_ref() {
            info.epsg = epsg_code(&srs);
            info.crs = match info.epsg {
                Some(code) => Some(format!("EPSG:{code}")),
                None => srs.to_wkt().ok().filter(|wkt| !wkt.is_empty()),
            };
        }

        if dataset.raster_count() > 0 {
            info.nodata = dataset
                .rasterband(1)
                .map_err(|e| StacError::raster_read(path, e))?
                .no_data_value();
        }

        debug!(
            "Inspected {}: bbox={:?}, crs={:?}, resolution={}",
            path, info.bbox, info.crs, info.resolution
        );
        Ok(info)
    }

    fn sources(&self, path: &str) -> Result<Vec<String>> {
        let location = RasterLocation::parse(path);
        if let Some(local) = location.local_path() {
            return vrt::source_files(local);
        }
        // remote descriptors are fetched through GDAL's virtual file systems
        let dataset = Dataset::open(location.gdal_path())
            .map_err(|e| StacError::source_extraction(path, e))?;
        dataset_source_files(&dataset, &location.href())
    }
}

/// Source files of a VRT dataset opened by GDAL, read from its serialized
/// `xml:VRT` metadata. Relative references resolve against `vrt_href`.
pub fn dataset_source_files(dataset: &Dataset, vrt_href: &str) -> Result<Vec<String>> {
    let xml = dataset
        .metadata_domain("xml:VRT")
        .and_then(|lines| lines.into_iter().next())
        .ok_or_else(|| StacError::source_extraction(vrt_href, "dataset is not a VRT"))?;
    vrt::parse_source_files(&xml, Path::new(vrt_href))
}

/// Axis-aligned extent covering the four pixel-grid corners.
pub fn extent_from_transform(transform: &[f64; 6], cols: usize, rows: usize) -> [f64; 4] {
    let (cols, rows) = (cols as f64, rows as f64);
    let corner = |px: f64, py: f64| {
        (
            transform[0] + px * transform[1] + py * transform[2],
            transform[3] + px * transform[4] + py * transform[5],
        )
    };
    let corners = [
        corner(0.0, 0.0),
        corner(cols, 0.0),
        corner(0.0, rows),
        corner(cols, rows),
    ];

    let mut bbox = [
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    ];
    for (x, y) in corners {
        bbox[0] = bbox[0].min(x);
        bbox[1] = bbox[1].min(y);
        bbox[2] = bbox[2].max(x);
        bbox[3] = bbox[3].max(y);
    }
    bbox
}

/// EPSG code of the CRS itself. Authorities of nested elements such as
/// units or datums are ignored.
pub fn epsg_code(srs: &SpatialRef) -> Option<u32> {
    let name = srs.auth_name()?;
    if !name.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    u32::try_from(srs.auth_code().ok()?).ok()
}
