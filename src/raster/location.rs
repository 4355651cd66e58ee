use std::path::{Path, PathBuf};

/// Where a raster lives, as given by the caller (local path or URI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterLocation {
    /// Local filesystem path
    Local(PathBuf),
    /// S3 URL (<s3://bucket/key>)
    S3 { bucket: String, key: String },
    /// HTTP(S) URL
    Http(String),
}

impl RasterLocation {
    /// Also accepts GDAL's `/vsicurl/` and `/vsis3/` forms, which show up in
    /// VRT descriptors read through GDAL.
    pub fn parse(path: &str) -> Self {
        if let Some(url) = path.strip_prefix("/vsicurl/") {
            return Self::Http(url.to_string());
        }
        let path = match path.strip_prefix("/vsis3/") {
            Some(rest) => return Self::parse(&format!("s3://{rest}")),
            None => path,
        };
        if path.starts_with("http://") || path.starts_with("https://") {
            return Self::Http(path.to_string());
        }
        if let Some(rest) = path.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            return Self::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            };
        }
        Self::Local(PathBuf::from(path))
    }

    /// Path handed to GDAL, using the virtual file systems for remote rasters.
    pub fn gdal_path(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::S3 { bucket, key } => format!("/vsis3/{bucket}/{key}"),
            Self::Http(url) => format!("/vsicurl/{url}"),
        }
    }

    /// Asset href: absolute for local files, the original URI otherwise.
    pub fn href(&self) -> String {
        match self {
            Self::Local(path) => std::path::absolute(path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string(),
            Self::S3 { bucket, key } => format!("s3://{bucket}/{key}"),
            Self::Http(url) => url.clone(),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            _ => None,
        }
    }

    /// Final path segment, query string stripped for URLs.
    pub fn file_name(&self) -> String {
        let raw = match self {
            Self::Local(path) => {
                return path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
            }
            Self::S3 { key, .. } => key.as_str(),
            Self::Http(url) => url.split(['?', '#']).next().unwrap_or(url),
        };
        raw.rsplit('/').next().unwrap_or(raw).to_string()
    }

    /// File name without its last extension.
    pub fn file_stem(&self) -> String {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local() {
        let location = RasterLocation::parse("/data/dem/n37w109.tif");
        assert_eq!(
            location,
            RasterLocation::Local(PathBuf::from("/data/dem/n37w109.tif"))
        );
        assert_eq!(location.gdal_path(), "/data/dem/n37w109.tif");
        assert_eq!(location.href(), "/data/dem/n37w109.tif");
        assert_eq!(location.file_name(), "n37w109.tif");
        assert_eq!(location.file_stem(), "n37w109");
    }

    #[test]
    fn test_relative_local_href_is_absolute() {
        let location = RasterLocation::parse("dem/tile.tif");
        assert!(Path::new(&location.href()).is_absolute());
    }

    #[test]
    fn test_parse_http() {
        let url = "https://prd-tnm.s3.amazonaws.com/StagedProducts/Elevation/1/TIFF/USGS_Seamless_DEM_1.vrt?x=1";
        let location = RasterLocation::parse(url);
        assert_eq!(location.gdal_path(), format!("/vsicurl/{url}"));
        assert_eq!(location.href(), url);
        assert_eq!(location.file_name(), "USGS_Seamless_DEM_1.vrt");
        assert_eq!(location.file_stem(), "USGS_Seamless_DEM_1");
        assert!(location.local_path().is_none());
    }

    #[test]
    fn test_parse_s3() {
        let location = RasterLocation::parse("s3://bucket/dem/tiles/a.tif");
        assert_eq!(
            location,
            RasterLocation::S3 {
                bucket: "bucket".to_string(),
                key: "dem/tiles/a.tif".to_string(),
            }
        );
        assert_eq!(location.gdal_path(), "/vsis3/bucket/dem/tiles/a.tif");
        assert_eq!(location.file_name(), "a.tif");
    }

    #[test]
    fn test_parse_gdal_virtual_paths() {
        let location = RasterLocation::parse("/vsis3/bucket/dem/a.tif");
        assert_eq!(location.href(), "s3://bucket/dem/a.tif");
        assert_eq!(location.gdal_path(), "/vsis3/bucket/dem/a.tif");

        let location = RasterLocation::parse("/vsicurl/https://example.com/dem/b.tif");
        assert_eq!(location, RasterLocation::Http("https://example.com/dem/b.tif".to_string()));
        assert_eq!(location.file_name(), "b.tif");
    }
}
