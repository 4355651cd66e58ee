//! Source file listing for GDAL virtual rasters (VRT).
//!
//! A VRT is an XML descriptor that mosaics other rasters without copying
//! their pixels. Plain mosaics reference each input through
//! `<SourceFilename>`, warped VRTs through `<SourceDataset>`. Both carry a
//! `relativeToVRT` attribute telling whether the path is relative to the
//! directory of the descriptor.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, StacError};

/// Lists the rasters referenced by the VRT at `vrt_path`.
///
/// Paths are returned in document order without duplicates. Relative
/// references are resolved against the VRT's directory, and the VRT itself is
/// never part of the list.
pub fn source_files(vrt_path: &Path) -> Result<Vec<String>> {
    let xml = fs::read_to_string(vrt_path)
        .map_err(|e| StacError::source_extraction(vrt_path.display().to_string(), e))?;
    parse_source_files(&xml, vrt_path)
}

pub fn parse_source_files(xml: &str, vrt_path: &Path) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let base_dir = vrt_path.parent().unwrap_or_else(|| Path::new(""));
    let mut sources: Vec<String> = Vec::new();
    // (relativeToVRT, text) of the source element being read
    let mut current: Option<(bool, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| StacError::source_extraction(vrt_path.display().to_string(), e))?;

        match event {
            Event::Start(element) if is_source_element(&element) => {
                current = Some((is_relative(&element), String::new()));
            }
            Event::Text(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    let value = text.unescape().map_err(|e| {
                        StacError::source_extraction(vrt_path.display().to_string(), e)
                    })?;
                    buf.push_str(&value);
                }
            }
            Event::End(element)
                if matches!(
                    element.local_name().as_ref(),
                    b"SourceFilename" | b"SourceDataset"
                ) =>
            {
                if let Some((relative, name)) = current.take() {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    let resolved = if relative {
                        base_dir.join(name).display().to_string()
                    } else {
                        name.to_string()
                    };
                    if Path::new(&resolved) != vrt_path && !sources.contains(&resolved) {
                        debug!("VRT source: {}", resolved);
                        sources.push(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sources)
}

fn is_source_element(element: &BytesStart) -> bool {
    matches!(
        element.local_name().as_ref(),
        b"SourceFilename" | b"SourceDataset"
    )
}

fn is_relative(element: &BytesStart) -> bool {
    element
        .try_get_attribute("relativeToVRT")
        .ok()
        .flatten()
        .map(|attr| attr.value.as_ref() == b"1")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MOSAIC_VRT: &str = r#"<VRTDataset rasterXSize="7" rasterYSize="4">
  <SRS>EPSG:4326</SRS>
  <GeoTransform>-109, 1, 0, 41, 0, -1</GeoTransform>
  <VRTRasterBand dataType="Float32" band="1">
    <SimpleSource>
      <SourceFilename relativeToVRT="1">tiles/a.tif</SourceFilename>
      <SourceBand>1</SourceBand>
    </SimpleSource>
    <ComplexSource>
      <SourceFilename relativeToVRT="0">/abs/b.tif</SourceFilename>
      <SourceBand>1</SourceBand>
    </ComplexSource>
    <SimpleSource>
      <SourceFilename relativeToVRT="1">tiles/a.tif</SourceFilename>
      <SourceBand>1</SourceBand>
    </SimpleSource>
  </VRTRasterBand>
  <VRTRasterBand dataType="Float32" band="2">
    <SimpleSource>
      <SourceFilename>/vsicurl/https://example.com/c.tif</SourceFilename>
    </SimpleSource>
  </VRTRasterBand>
</VRTDataset>"#;

    #[test]
    fn test_parse_mosaic_sources() {
        let sources = parse_source_files(MOSAIC_VRT, Path::new("/data/dem/mosaic.vrt")).unwrap();
        assert_eq!(
            sources,
            vec![
                "/data/dem/tiles/a.tif".to_string(),
                "/abs/b.tif".to_string(),
                "/vsicurl/https://example.com/c.tif".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_warped_source() {
        let xml = r#"<VRTDataset subClass="VRTWarpedDataset" rasterXSize="10" rasterYSize="10">
  <GDALWarpOptions>
    <SourceDataset relativeToVRT="1">source.tif</SourceDataset>
  </GDALWarpOptions>
</VRTDataset>"#;
        let sources = parse_source_files(xml, Path::new("/data/warped.vrt")).unwrap();
        assert_eq!(sources, vec!["/data/source.tif".to_string()]);
    }

    #[test]
    fn test_self_reference_is_skipped() {
        let xml = r#"<VRTDataset>
  <VRTRasterBand band="1">
    <SimpleSource><SourceFilename relativeToVRT="1">mosaic.vrt</SourceFilename></SimpleSource>
    <SimpleSource><SourceFilename relativeToVRT="1">tile.tif</SourceFilename></SimpleSource>
  </VRTRasterBand>
</VRTDataset>"#;
        let sources = parse_source_files(xml, Path::new("/data/mosaic.vrt")).unwrap();
        assert_eq!(sources, vec!["/data/tile.tif".to_string()]);
    }

    #[test]
    fn test_escaped_names() {
        let xml = r#"<VRTDataset><SourceFilename>/data/a&amp;b.tif</SourceFilename></VRTDataset>"#;
        let sources = parse_source_files(xml, Path::new("/data/m.vrt")).unwrap();
        assert_eq!(sources, vec!["/data/a&b.tif".to_string()]);
    }

    #[test]
    fn test_source_files_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = source_files(&temp_dir.path().join("missing.vrt")).unwrap_err();
        assert!(matches!(err, StacError::SourceExtraction { .. }));
    }

    #[test]
    fn test_source_files_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let vrt_path = temp_dir.path().join("mosaic.vrt");
        fs::write(&vrt_path, MOSAIC_VRT).unwrap();

        let sources = source_files(&vrt_path).unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(
            sources[0],
            temp_dir.path().join("tiles/a.tif").display().to_string()
        );
    }
}
