use crate::types::{BoundingBox, GeocodeError, GeocodeResult};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::Path;

/// The parts of a Sentinel-1 product annotation the geocoder needs.
/// This represents the root <product> element directly
#[derive(Debug, Deserialize)]
pub struct AnnotationRoot {
    #[serde(rename = "swathTiming", default)]
    pub swath_timing: Option<SwathTiming>,
    #[serde(rename = "geolocationGrid", default)]
    pub geolocation_grid: Option<GeolocationGrid>,
}

#[derive(Debug, Deserialize)]
pub struct SwathTiming {
    #[serde(rename = "burstList")]
    pub burst_list: BurstList,
}

#[derive(Debug, Deserialize)]
pub struct BurstList {
    #[serde(rename = "@count")]
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGrid {
    #[serde(rename = "geolocationGridPointList")]
    pub point_list: GeolocationGridPointList,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGridPointList {
    #[serde(rename = "geolocationGridPoint", default)]
    pub points: Vec<GeolocationGridPoint>,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGridPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl AnnotationRoot {
    pub fn parse(xml: &str) -> GeocodeResult<Self> {
        from_str(xml).map_err(|e| GeocodeError::XmlParsing(format!("Failed to parse annotation: {}", e)))
    }

    pub fn read<P: AsRef<Path>>(path: P) -> GeocodeResult<Self> {
        let path = path.as_ref();
        log::debug!("Reading annotation {}", path.display());
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml).map_err(|e| match e {
            GeocodeError::XmlParsing(msg) => GeocodeError::XmlParsing(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Number of bursts in the swath; zero for products without bursts
    pub fn burst_count(&self) -> usize {
        self.swath_timing.as_ref().map(|t| t.burst_list.count).unwrap_or(0)
    }

    pub fn grid_points(&self) -> &[GeolocationGridPoint] {
        self.geolocation_grid
            .as_ref()
            .map(|g| g.point_list.points.as_slice())
            .unwrap_or(&[])
    }
}

/// Geographic footprint covering the geolocation grids of all given annotations
pub fn bounding_box<P: AsRef<Path>>(annotations: &[P]) -> GeocodeResult<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;

    for path in annotations {
        let root = AnnotationRoot::read(path)?;
        for point in root.grid_points() {
            let b = bbox.get_or_insert(BoundingBox::new(
                point.latitude,
                point.latitude,
                point.longitude,
                point.longitude,
            ));
            b.min_lat = b.min_lat.min(point.latitude);
            b.max_lat = b.max_lat.max(point.latitude);
            b.min_lon = b.min_lon.min(point.longitude);
            b.max_lon = b.max_lon.max(point.longitude);
        }
    }

    bbox.ok_or_else(|| {
        GeocodeError::Metadata("no geolocation grid points in granule annotations".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNOTATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<product>
  <adsHeader><missionId>S1A</missionId></adsHeader>
  <swathTiming>
    <linesPerBurst>1503</linesPerBurst>
    <burstList count="9">
      <burst><azimuthTime>2020-01-03T17:08:15.000000</azimuthTime></burst>
    </burstList>
  </swathTiming>
  <geolocationGrid>
    <geolocationGridPointList count="3">
      <geolocationGridPoint><line>0</line><pixel>0</pixel><latitude>45.1</latitude><longitude>12.5</longitude><height>0</height></geolocationGridPoint>
      <geolocationGridPoint><line>0</line><pixel>100</pixel><latitude>45.3</latitude><longitude>11.2</longitude><height>0</height></geolocationGridPoint>
      <geolocationGridPoint><line>100</line><pixel>0</pixel><latitude>46.9</latitude><longitude>12.0</longitude><height>0</height></geolocationGridPoint>
    </geolocationGridPointList>
  </geolocationGrid>
</product>"#;

    #[test]
    fn test_burst_count_and_grid() {
        let root = AnnotationRoot::parse(ANNOTATION).unwrap();
        assert_eq!(root.burst_count(), 9);
        assert_eq!(root.grid_points().len(), 3);
    }

    #[test]
    fn test_bounding_box_from_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("s1a-iw1-slc-vv-001.xml");
        std::fs::write(&path, ANNOTATION).unwrap();

        let bbox = bounding_box(&[path]).unwrap();
        assert_eq!(bbox.min_lat, 45.1);
        assert_eq!(bbox.max_lat, 46.9);
        assert_eq!(bbox.min_lon, 11.2);
        assert_eq!(bbox.max_lon, 12.5);
    }

    #[test]
    fn test_missing_sections() {
        let root = AnnotationRoot::parse("<product><adsHeader/></product>").unwrap();
        assert_eq!(root.burst_count(), 0);
        assert!(root.grid_points().is_empty());
        assert!(bounding_box::<&Path>(&[]).is_err());
    }
}
