use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Polarization channels for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl Polarization {
    pub const ALL: [Polarization; 4] = [
        Polarization::VV,
        Polarization::VH,
        Polarization::HH,
        Polarization::HV,
    ];

    /// Lower-case tag used in file names (`vv`, `vh`, `hh`, `hv`)
    pub fn tag(&self) -> &'static str {
        match self {
            Polarization::VV => "vv",
            Polarization::VH => "vh",
            Polarization::HV => "hv",
            Polarization::HH => "hh",
        }
    }

    /// Cross-polarized partner of a co-polarized channel
    pub fn cross_partner(&self) -> Option<Polarization> {
        match self {
            Polarization::VV => Some(Polarization::VH),
            Polarization::HH => Some(Polarization::HV),
            _ => None,
        }
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

impl std::str::FromStr for Polarization {
    type Err = GeocodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            _ => Err(GeocodeError::Config(format!("Invalid polarization: {}", s))),
        }
    }
}

/// Sentinel-1 product type, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GranuleType {
    /// Ground Range Detected
    Grd,
    /// Single Look Complex
    Slc,
}

impl GranuleType {
    /// Any path mentioning "GRD" is a GRD product; everything else is treated as SLC.
    pub fn from_path(path: &str) -> Self {
        if path.contains("GRD") {
            GranuleType::Grd
        } else {
            GranuleType::Slc
        }
    }
}

impl std::fmt::Display for GranuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GranuleType::Grd => write!(f, "GRD"),
            GranuleType::Slc => write!(f, "SLC"),
        }
    }
}

/// Radiometric normalization of the output backscatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerScale {
    Sigma0,
    Gamma0,
}

impl std::fmt::Display for PowerScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerScale::Sigma0 => write!(f, "sigma0"),
            PowerScale::Gamma0 => write!(f, "gamma0"),
        }
    }
}

/// Role a channel plays in the product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelRole {
    Primary,
    Cross,
}

/// Geospatial bounding box in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(max_lat: f64, min_lat: f64, max_lon: f64, min_lon: f64) -> Self {
        Self { min_lon, max_lon, min_lat, max_lat }
    }

    pub fn mean_lat(&self) -> f64 {
        (self.min_lat + self.max_lat) / 2.0
    }
}

/// Which channel rasters were found in a granule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInventory {
    pub vv: bool,
    pub vh: bool,
    pub hh: bool,
    pub hv: bool,
}

impl ChannelInventory {
    pub fn contains(&self, pol: Polarization) -> bool {
        match pol {
            Polarization::VV => self.vv,
            Polarization::VH => self.vh,
            Polarization::HH => self.hh,
            Polarization::HV => self.hv,
        }
    }

    pub fn set(&mut self, pol: Polarization, present: bool) {
        match pol {
            Polarization::VV => self.vv = present,
            Polarization::VH => self.vh = present,
            Polarization::HH => self.hh = present,
            Polarization::HV => self.hv = present,
        }
    }

    /// Primary channel of the run. VV wins if a granule somehow carries both families.
    pub fn primary(&self) -> Option<Polarization> {
        if self.vv {
            Some(Polarization::VV)
        } else if self.hh {
            Some(Polarization::HH)
        } else {
            None
        }
    }

    /// Cross channel paired with the primary, if present
    pub fn cross(&self) -> Option<Polarization> {
        self.primary()
            .and_then(|p| p.cross_partner())
            .filter(|c| self.contains(*c))
    }

    /// Channels present in the granule that the run will not process
    pub fn ignored(&self) -> Vec<Polarization> {
        let primary = self.primary();
        let cross = self.cross();
        [Polarization::VV, Polarization::VH, Polarization::HH, Polarization::HV]
            .into_iter()
            .filter(|p| self.contains(*p) && Some(*p) != primary && Some(*p) != cross)
            .collect()
    }
}

/// Error types for geocoding runs
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input {} does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No recognized polarization channels in {}", .0.display())]
    NoPolarization(PathBuf),

    #[error("Toolchain failure during {stage}: `{command}` ({reason})")]
    Toolchain {
        stage: String,
        command: String,
        reason: String,
    },

    #[error("Unable to apply precision state vectors: {0}")]
    OrbitCorrection(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),
}

/// Result type for geocoding operations
pub type GeocodeResult<T> = Result<T, GeocodeError>;
