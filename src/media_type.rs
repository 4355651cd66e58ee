use std::path::Path;

pub const JSON: &str = "application/json";
pub const GEOTIFF: &str = "image/tiff; application=geotiff";
pub const COG: &str = "image/tiff; application=geotiff; profile=cloud-optimized";
pub const VRT: &str = "application/x-vrt";

const EXTENSION_MEDIA_TYPES: &[(&str, &str)] = &[
    ("cog", COG),
    ("fgb", "application/vnd.flatgeobuf"),
    ("geojson", "application/geo+json"),
    ("gpkg", "application/geopackage+sqlite3"),
    ("geotiff", GEOTIFF),
    ("tiff", GEOTIFF),
    ("tif", GEOTIFF),
    ("vrt", VRT),
    ("hdf", "application/x-hdf"),
    ("h5", "application/x-hdf5"),
    ("html", "text/html"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jp2", "image/jp2"),
    ("json", JSON),
    ("parquet", "application/x-parquet"),
    ("png", "image/png"),
    ("txt", "text/plain"),
    ("kml", "application/vnd.google-earth.kml+xml"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("zarr", "application/vnd+zarr"),
    ("nc", "application/netcdf"),
];

/// Infers the media type of a file from its extension (case-insensitive).
pub fn from_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_MEDIA_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, media_type)| *media_type)
}
