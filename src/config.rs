use crate::types::{ChannelRole, GeocodeError, GeocodeResult, Polarization, PowerScale};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Samples blanked at the start and end of each raster line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMargins {
    pub left: usize,
    pub right: usize,
}

impl EdgeMargins {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }
}

impl Default for EdgeMargins {
    fn default() -> Self {
        Self { left: 20, right: 20 }
    }
}

/// Sample type written into the DEM parameter description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    Float32,
    Int16,
}

impl SampleType {
    /// Type code understood by the toolchain
    pub fn code(&self) -> &'static str {
        match self {
            SampleType::Float32 => "REAL*4",
            SampleType::Int16 => "INTEGER*2",
        }
    }
}

/// File-name patterns locating channel files inside a granule.
///
/// `{pol}` is replaced by the lower-case channel tag. Patterns are matched against
/// file names only; the directory they live in is fixed by the SAFE layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPatterns {
    pub measurement: String,
    pub annotation: String,
    pub calibration: String,
    pub noise: String,
}

impl Default for ChannelPatterns {
    fn default() -> Self {
        Self {
            measurement: r"^.*{pol}.*\.tiff$".to_string(),
            annotation: r"^.*{pol}.*\.xml$".to_string(),
            calibration: r"^calibration-.*{pol}.*\.xml$".to_string(),
            noise: r"^noise-.*{pol}.*\.xml$".to_string(),
        }
    }
}

impl ChannelPatterns {
    /// Expand a pattern for one channel
    pub fn expand(pattern: &str, pol: Polarization) -> String {
        pattern.replace("{pol}", pol.tag())
    }
}

/// Configuration of a geocoding run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeConfig {
    /// Output pixel size in meters
    pub pixel_size: f64,
    /// Assumed terrain height in meters
    pub terrain_height: f64,
    pub power_scale: PowerScale,
    /// Build an RGB composite when a cross channel is present
    pub color_composite: bool,
    pub primary_margins: EdgeMargins,
    pub cross_margins: EdgeMargins,
    pub dem_sample_type: SampleType,
    pub patterns: ChannelPatterns,
    /// Custom XML metadata template; the bundled one is used when unset
    pub metadata_template: Option<PathBuf>,
    pub product_dir: String,
    /// Run the external precision orbit fetch before processing
    pub fetch_orbits: bool,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            pixel_size: 30.0,
            terrain_height: 0.0,
            power_scale: PowerScale::Sigma0,
            color_composite: true,
            primary_margins: EdgeMargins::default(),
            cross_margins: EdgeMargins::default(),
            dem_sample_type: SampleType::Float32,
            patterns: ChannelPatterns::default(),
            metadata_template: None,
            product_dir: "PRODUCT".to_string(),
            fetch_orbits: true,
        }
    }
}

impl GeocodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pixel_size(mut self, pixel_size: f64) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    pub fn with_terrain_height(mut self, height: f64) -> Self {
        self.terrain_height = height;
        self
    }

    pub fn with_gamma0(mut self, gamma0: bool) -> Self {
        self.power_scale = if gamma0 { PowerScale::Gamma0 } else { PowerScale::Sigma0 };
        self
    }

    pub fn with_color_composite(mut self, enabled: bool) -> Self {
        self.color_composite = enabled;
        self
    }

    pub fn with_margins(mut self, primary: EdgeMargins, cross: EdgeMargins) -> Self {
        self.primary_margins = primary;
        self.cross_margins = cross;
        self
    }

    pub fn with_metadata_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.metadata_template = Some(template.into());
        self
    }

    pub fn with_orbit_fetch(mut self, enabled: bool) -> Self {
        self.fetch_orbits = enabled;
        self
    }

    pub fn margins_for(&self, role: ChannelRole) -> EdgeMargins {
        match role {
            ChannelRole::Primary => self.primary_margins,
            ChannelRole::Cross => self.cross_margins,
        }
    }

    pub fn validate(&self) -> GeocodeResult<()> {
        if !self.pixel_size.is_finite() || self.pixel_size <= 0.0 {
            return Err(GeocodeError::Config(format!(
                "pixel size must be positive, got {}",
                self.pixel_size
            )));
        }
        if !self.terrain_height.is_finite() {
            return Err(GeocodeError::Config(format!(
                "terrain height must be finite, got {}",
                self.terrain_height
            )));
        }
        if self.product_dir.is_empty() {
            return Err(GeocodeError::Config("product directory name is empty".to_string()));
        }
        Ok(())
    }
}
