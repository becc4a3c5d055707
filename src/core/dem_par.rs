use crate::config::SampleType;
use crate::core::projection::ProjectionSpec;
use crate::types::{GeocodeError, GeocodeResult};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Output grid description consumed by the toolchain's `create_dem_par`
#[derive(Debug, Clone, PartialEq)]
pub struct DemParameters {
    pub projection: &'static str,
    pub datum: &'static str,
    pub zone: u8,
    pub false_northing: f64,
    pub basename: String,
    pub sample_type: SampleType,
    pub x_size: u64,
    pub y_size: u64,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    /// Upper-left corner as (northing, easting)
    pub origin: (f64, f64),
}

impl DemParameters {
    pub fn build(
        basename: &str,
        sample_type: SampleType,
        pixel_size: f64,
        spec: &ProjectionSpec,
    ) -> GeocodeResult<Self> {
        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Err(GeocodeError::Config(format!(
                "pixel size must be positive, got {}",
                pixel_size
            )));
        }

        // Truncate, never round: the toolchain expects whole samples inside the extent
        let x_size = ((spec.x_max - spec.x_min) / pixel_size).abs().floor() as u64;
        let y_size = ((spec.y_max - spec.y_min) / pixel_size).abs().floor() as u64;

        log::debug!(
            "Output coordinates: {} {} {} {} -> {}x{} samples",
            spec.y_min, spec.y_max, spec.x_min, spec.x_max, x_size, y_size
        );

        Ok(Self {
            projection: "UTM",
            datum: "WGS84",
            zone: spec.utm_zone,
            false_northing: spec.false_northing,
            basename: basename.to_string(),
            sample_type,
            x_size,
            y_size,
            pixel_size_x: -pixel_size,
            pixel_size_y: pixel_size,
            origin: (spec.y_max, spec.x_min),
        })
    }

    /// Serialize in the line order `create_dem_par` reads its answers in.
    ///
    /// The order is an external contract; the lone `1`, `0.0` and `1.0` lines are
    /// answers to prompts the toolchain asks and must stay where they are.
    pub fn to_par_input(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.projection);
        let _ = writeln!(out, "{}", self.datum);
        let _ = writeln!(out, "1");
        let _ = writeln!(out, "{}", self.zone);
        let _ = writeln!(out, "{}", fmt_float(self.false_northing));
        let _ = writeln!(out, "{}", self.basename);
        let _ = writeln!(out, "{}", self.sample_type.code());
        let _ = writeln!(out, "0.0");
        let _ = writeln!(out, "1.0");
        let _ = writeln!(out, "{}", self.x_size);
        let _ = writeln!(out, "{}", self.y_size);
        let _ = writeln!(out, "{} {}", fmt_float(self.pixel_size_x), fmt_float(self.pixel_size_y));
        let _ = writeln!(out, "{} {}", fmt_float(self.origin.0), fmt_float(self.origin.1));
        out
    }

    /// Write `{basename}_dem_par.in` into `dir` and return its path
    pub fn write_par_input(&self, dir: &Path) -> GeocodeResult<PathBuf> {
        let path = dir.join(format!("{}_dem_par.in", self.basename));
        std::fs::write(&path, self.to_par_input())?;
        log::debug!("Wrote DEM parameter input {}", path.display());
        Ok(path)
    }
}

/// Shortest round-trip decimal with a mandatory fractional part (`30.0`, not `30`)
fn fmt_float(value: f64) -> String {
    format!("{:?}", value)
}
