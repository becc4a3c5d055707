use crate::types::{GeocodeError, GeocodeResult, GranuleType};

/// Range to azimuth oversampling of Sentinel-1 IW SLC data
pub const SLC_RANGE_OVERSAMPLING: u32 = 5;

/// Nominal spacing the look factor is measured against, in meters
const NOMINAL_SPACING: f64 = 10.0;

/// Look counts derived from the requested output pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookFactors {
    pub look_factor: u32,
    pub range_looks: u32,
    pub azimuth_looks: u32,
}

impl LookFactors {
    pub fn from_pixel_size(pixel_size: f64, granule_type: GranuleType) -> GeocodeResult<Self> {
        let look_factor = look_factor(pixel_size)?;
        let range_looks = match granule_type {
            GranuleType::Grd => look_factor,
            GranuleType::Slc => SLC_RANGE_OVERSAMPLING * look_factor,
        };
        Ok(Self {
            look_factor,
            range_looks,
            azimuth_looks: look_factor,
        })
    }

    /// GRD data at (or below) nominal spacing is carried forward without multilooking
    pub fn needs_multilook(&self) -> bool {
        self.look_factor > 1
    }
}

/// `floor(pixel_size / 10 + 0.5)`, never below one look
pub fn look_factor(pixel_size: f64) -> GeocodeResult<u32> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(GeocodeError::Config(format!(
            "pixel size must be positive, got {}",
            pixel_size
        )));
    }
    let factor = (pixel_size / NOMINAL_SPACING + 0.5).floor();
    Ok(factor.max(1.0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_factor() {
        assert_eq!(look_factor(10.0).unwrap(), 1);
        assert_eq!(look_factor(25.0).unwrap(), 3);
        assert_eq!(look_factor(4.0).unwrap(), 1);
        assert_eq!(look_factor(30.0).unwrap(), 3);
        assert_eq!(look_factor(14.9).unwrap(), 1);
        assert_eq!(look_factor(15.0).unwrap(), 2);
        assert!(look_factor(0.0).is_err());
    }

    #[test]
    fn test_slc_looks() {
        let looks = LookFactors::from_pixel_size(30.0, GranuleType::Slc).unwrap();
        assert_eq!(looks.range_looks, 15);
        assert_eq!(looks.azimuth_looks, 3);

        let looks = LookFactors::from_pixel_size(10.0, GranuleType::Grd).unwrap();
        assert!(!looks.needs_multilook());
        assert_eq!(looks.range_looks, 1);
    }
}
