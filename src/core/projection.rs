use crate::types::{BoundingBox, GeocodeError, GeocodeResult};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use serde::{Deserialize, Serialize};

/// UTM hemisphere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// Hemisphere from the mean latitude; the equator itself counts as north
    pub fn from_mean_lat(mean_lat: f64) -> Self {
        if mean_lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }

    /// WGS84 / UTM EPSG code (326zz north, 327zz south)
    pub fn epsg(&self, zone: u8) -> u32 {
        match self {
            Hemisphere::North => 32600 + zone as u32,
            Hemisphere::South => 32700 + zone as u32,
        }
    }

    pub fn false_northing(&self) -> f64 {
        match self {
            Hemisphere::North => 0.0,
            Hemisphere::South => 10_000_000.0,
        }
    }
}

/// Target projection and projected extent of a granule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    pub utm_zone: u8,
    pub hemisphere: Hemisphere,
    pub false_northing: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ProjectionSpec {
    pub fn epsg(&self) -> u32 {
        self.hemisphere.epsg(self.utm_zone)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// Geographic to UTM point transformation
pub trait GeoTransformer {
    /// Transform `(lon, lat)` pairs into `(easting, northing)` in the given UTM zone
    fn geo_to_utm(
        &self,
        zone: u8,
        hemisphere: Hemisphere,
        points: &[(f64, f64)],
    ) -> GeocodeResult<Vec<(f64, f64)>>;
}

/// GDAL/OSR backed transformer
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalTransformer;

impl GeoTransformer for GdalTransformer {
    fn geo_to_utm(
        &self,
        zone: u8,
        hemisphere: Hemisphere,
        points: &[(f64, f64)],
    ) -> GeocodeResult<Vec<(f64, f64)>> {
        let epsg = hemisphere.epsg(zone);
        let to_projection_error =
            |e: gdal::errors::GdalError| GeocodeError::Projection(format!("EPSG:{}: {}", epsg, e));

        let source = SpatialRef::from_epsg(4326).map_err(to_projection_error)?;
        let target = SpatialRef::from_epsg(epsg).map_err(to_projection_error)?;
        let transform = CoordTransform::new(&source, &target).map_err(to_projection_error)?;

        // EPSG:4326 uses authority axis order: latitude first
        let mut xs: Vec<f64> = points.iter().map(|&(_, lat)| lat).collect();
        let mut ys: Vec<f64> = points.iter().map(|&(lon, _)| lon).collect();
        let mut zs: [f64; 0] = [];
        transform
            .transform_coords(&mut xs, &mut ys, &mut zs)
            .map_err(to_projection_error)?;

        Ok(xs.into_iter().zip(ys).collect())
    }
}

/// Standard 6 degree UTM zone of the box center longitude.
///
/// A longitude pair more than 180 degrees apart is taken to wrap the antimeridian;
/// otherwise the ordering of the pair does not matter.
pub fn utm_zone(lon_a: f64, lon_b: f64) -> u8 {
    let (lo, hi) = if lon_a <= lon_b { (lon_a, lon_b) } else { (lon_b, lon_a) };
    let mut center = if hi - lo > 180.0 {
        (hi + lo + 360.0) / 2.0
    } else {
        (hi + lo) / 2.0
    };
    while center >= 180.0 {
        center -= 360.0;
    }
    while center < -180.0 {
        center += 360.0;
    }
    let zone = ((center + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// Resolves the output projection of a granule from its geographic footprint
pub struct ProjectionResolver<T: GeoTransformer> {
    transformer: T,
}

impl ProjectionResolver<GdalTransformer> {
    pub fn gdal() -> Self {
        Self::new(GdalTransformer)
    }
}

impl<T: GeoTransformer> ProjectionResolver<T> {
    pub fn new(transformer: T) -> Self {
        Self { transformer }
    }

    pub fn resolve(&self, bbox: &BoundingBox) -> GeocodeResult<ProjectionSpec> {
        validate_bbox(bbox)?;

        let zone = utm_zone(bbox.min_lon, bbox.max_lon);
        let hemisphere = Hemisphere::from_mean_lat(bbox.mean_lat());
        log::debug!(
            "Input coordinates: {} {} {} {} -> EPSG:{}",
            bbox.max_lat, bbox.min_lat, bbox.max_lon, bbox.min_lon,
            hemisphere.epsg(zone)
        );

        // A geographic rectangle is not a rectangle in UTM, so every corner counts
        let corners = [
            (bbox.max_lon, bbox.min_lat),
            (bbox.min_lon, bbox.min_lat),
            (bbox.max_lon, bbox.max_lat),
            (bbox.min_lon, bbox.max_lat),
        ];
        let projected = self.transformer.geo_to_utm(zone, hemisphere, &corners)?;
        if projected.len() != corners.len() {
            return Err(GeocodeError::Projection(format!(
                "expected {} transformed corners, got {}",
                corners.len(),
                projected.len()
            )));
        }
        for (x, y) in &projected {
            log::debug!("Output coordinate: {} {}", x, y);
            if !x.is_finite() || !y.is_finite() {
                return Err(GeocodeError::Projection(format!(
                    "corner transformed to non-finite coordinate ({}, {})",
                    x, y
                )));
            }
        }

        let x_min = projected.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let x_max = projected.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let y_min = projected.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let y_max = projected.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        if x_min == x_max || y_min == y_max {
            return Err(GeocodeError::Projection(format!(
                "degenerate projected extent x [{}, {}] y [{}, {}]",
                x_min, x_max, y_min, y_max
            )));
        }

        Ok(ProjectionSpec {
            utm_zone: zone,
            hemisphere,
            false_northing: hemisphere.false_northing(),
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }
}

fn validate_bbox(bbox: &BoundingBox) -> GeocodeResult<()> {
    let values = [bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(GeocodeError::Projection(format!("non-finite bounding box {:?}", bbox)));
    }
    if bbox.min_lat > bbox.max_lat {
        return Err(GeocodeError::Projection(format!(
            "minimum latitude {} above maximum latitude {}",
            bbox.min_lat, bbox.max_lat
        )));
    }
    if bbox.min_lat < -90.0 || bbox.max_lat > 90.0 {
        return Err(GeocodeError::Projection(format!(
            "latitude outside [-90, 90]: {:?}",
            bbox
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sinusoidal-style stand-in: easting shrinks with latitude like a real UTM grid
    struct ConvergingTransformer;

    impl GeoTransformer for ConvergingTransformer {
        fn geo_to_utm(
            &self,
            zone: u8,
            _hemisphere: Hemisphere,
            points: &[(f64, f64)],
        ) -> GeocodeResult<Vec<(f64, f64)>> {
            let central = -183.0 + 6.0 * zone as f64;
            Ok(points
                .iter()
                .map(|&(lon, lat)| {
                    let x = 500_000.0 + (lon - central) * 111_320.0 * lat.to_radians().cos();
                    (x, lat * 110_574.0)
                })
                .collect())
        }
    }

    struct FailingTransformer;

    impl GeoTransformer for FailingTransformer {
        fn geo_to_utm(&self, zone: u8, _: Hemisphere, _: &[(f64, f64)]) -> GeocodeResult<Vec<(f64, f64)>> {
            Err(GeocodeError::Projection(format!("unsupported zone {}", zone)))
        }
    }

    #[test]
    fn test_utm_zone_rule() {
        assert_eq!(utm_zone(-180.0, -179.0), 1);
        assert_eq!(utm_zone(12.0, 14.0), 33);
        assert_eq!(utm_zone(14.0, 12.0), 33);
        assert_eq!(utm_zone(-150.5, -147.0), 6);
        assert_eq!(utm_zone(179.0, 179.9), 60);
        // straddles the antimeridian, center at 180 -> zone 1
        assert_eq!(utm_zone(179.0, -179.0), 1);
        assert_eq!(utm_zone(-179.0, 179.0), 1);
    }

    #[test]
    fn test_hemisphere_by_mean_latitude() {
        let resolver = ProjectionResolver::new(ConvergingTransformer);
        let north = resolver.resolve(&BoundingBox::new(1.0, -0.5, 13.0, 12.0)).unwrap();
        assert_eq!(north.hemisphere, Hemisphere::North);
        assert_eq!(north.false_northing, 0.0);
        assert_eq!(north.epsg(), 32633);

        let south = resolver.resolve(&BoundingBox::new(0.5, -1.0, 13.0, 12.0)).unwrap();
        assert_eq!(south.hemisphere, Hemisphere::South);
        assert_eq!(south.false_northing, 10_000_000.0);
        assert_eq!(south.epsg(), 32733);
    }

    #[test]
    fn test_four_corner_envelope() {
        // box straddling the zone 32/33 boundary at 12E
        let bbox = BoundingBox::new(50.0, 40.0, 14.0, 8.0);
        let resolver = ProjectionResolver::new(ConvergingTransformer);
        let spec = resolver.resolve(&bbox).unwrap();

        let two = ConvergingTransformer
            .geo_to_utm(spec.utm_zone, spec.hemisphere, &[(bbox.min_lon, bbox.min_lat), (bbox.max_lon, bbox.max_lat)])
            .unwrap();
        let two_x_min = two[0].0.min(two[1].0);
        let two_x_max = two[0].0.max(two[1].0);

        assert!(spec.x_min <= two_x_min);
        assert!(spec.x_max > two_x_max);
    }

    #[test]
    fn test_degenerate_and_invalid_boxes() {
        let resolver = ProjectionResolver::new(ConvergingTransformer);
        assert!(matches!(
            resolver.resolve(&BoundingBox::new(45.0, 45.0, 13.0, 12.0)),
            Err(GeocodeError::Projection(_))
        ));
        assert!(matches!(
            resolver.resolve(&BoundingBox::new(40.0, 45.0, 13.0, 12.0)),
            Err(GeocodeError::Projection(_))
        ));
        assert!(resolver.resolve(&BoundingBox::new(95.0, 45.0, 13.0, 12.0)).is_err());
    }

    #[test]
    fn test_transform_failure_is_projection_error() {
        let resolver = ProjectionResolver::new(FailingTransformer);
        assert!(matches!(
            resolver.resolve(&BoundingBox::new(46.0, 45.0, 13.0, 12.0)),
            Err(GeocodeError::Projection(_))
        ));
    }
}
