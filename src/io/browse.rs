use crate::types::{GeocodeError, GeocodeResult};
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager};
use ndarray::{s, Array2};
use std::path::{Path, PathBuf};

/// Browse imagery, overview and colour composite rendering
pub trait BrowseRenderer {
    /// Browse PNGs of one channel geotiff, written next to `basename`
    fn render_browse(&self, geotiff: &Path, basename: &Path) -> GeocodeResult<Vec<PathBuf>>;

    /// Packaged KMZ overview of a channel geotiff
    fn render_overview(&self, geotiff: &Path, kmz: &Path) -> GeocodeResult<PathBuf>;

    /// RGB composite of a primary and a cross channel (geotiff plus browse PNGs)
    fn render_color_composite(
        &self,
        primary: &Path,
        cross: &Path,
        basename: &Path,
    ) -> GeocodeResult<Vec<PathBuf>>;
}

/// Power image to amplitude; zero (no data) stays zero
pub fn power_to_amplitude(power: &Array2<f32>) -> Array2<f32> {
    power.mapv(|v| if v > 0.0 && v.is_finite() { v.sqrt() } else { 0.0 })
}

/// Scale to bytes over mean +/- `sigmas` standard deviations of the valid pixels.
///
/// Valid pixels land in 1..=255 so that 0 remains the no-data value.
pub fn sigma_scale(data: &Array2<f32>, sigmas: f64) -> Array2<u8> {
    let valid: Vec<f64> = data
        .iter()
        .filter(|v| **v != 0.0 && v.is_finite())
        .map(|&v| v as f64)
        .collect();
    if valid.is_empty() {
        return Array2::zeros(data.dim());
    }

    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let std = (valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let min = valid.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = valid.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let lo = (mean - sigmas * std).max(min);
    let hi = (mean + sigmas * std).min(max);
    let range = hi - lo;

    data.mapv(|v| {
        if v == 0.0 || !v.is_finite() {
            0
        } else if range <= 0.0 {
            255
        } else {
            let t = ((v as f64 - lo) / range).clamp(0.0, 1.0);
            (1.0 + t * 254.0).round() as u8
        }
    })
}

/// Nearest-neighbour decimation so the image is at most `max_width` wide
pub fn decimate<T: Clone>(data: &Array2<T>, max_width: usize) -> (Array2<T>, usize) {
    let (_, cols) = data.dim();
    let step = if max_width == 0 { 1 } else { ((cols + max_width - 1) / max_width).max(1) };
    if step == 1 {
        return (data.clone(), 1);
    }
    let step_i = step as isize;
    (data.slice(s![..;step_i, ..;step_i]).to_owned(), step)
}

/// A raster band with its georeferencing
struct GeoRaster {
    data: Array2<f32>,
    geo_transform: [f64; 6],
    projection: String,
}

/// GDAL backed renderer producing PNG browses (with `.aux.xml`), KMZ and RGB geotiffs
#[derive(Debug, Clone)]
pub struct GdalBrowseRenderer {
    pub small_width: usize,
    pub large_width: usize,
    pub sigmas: f64,
}

impl Default for GdalBrowseRenderer {
    fn default() -> Self {
        Self {
            small_width: 1024,
            large_width: 2048,
            sigmas: 2.0,
        }
    }
}

impl GdalBrowseRenderer {
    fn read_raster(path: &Path) -> GeocodeResult<GeoRaster> {
        log::debug!("Reading {}", path.display());
        let dataset = Dataset::open(path)?;
        let geo_transform = dataset.geo_transform()?;
        let projection = dataset.projection();
        let (width, height) = dataset.raster_size();

        let band = dataset.rasterband(1)?;
        let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
        let data = Array2::from_shape_vec((height, width), buffer.data)
            .map_err(|e| GeocodeError::InvalidFormat(format!("Failed to reshape {}: {}", path.display(), e)))?;

        Ok(GeoRaster { data, geo_transform, projection })
    }

    /// Byte bands in an in-memory dataset, ready to be copied into any driver
    fn memory_dataset(
        bands: &[&Array2<u8>],
        geo_transform: [f64; 6],
        projection: &str,
    ) -> GeocodeResult<Dataset> {
        let (height, width) = bands[0].dim();
        let driver = DriverManager::get_driver_by_name("MEM")?;
        let mut dataset = driver.create_with_band_type::<u8, _>(
            "",
            width as isize,
            height as isize,
            bands.len() as isize,
        )?;
        dataset.set_geo_transform(&geo_transform)?;
        dataset.set_projection(projection)?;

        for (i, band_data) in bands.iter().enumerate() {
            let mut band = dataset.rasterband(i as isize + 1)?;
            let buffer = Buffer::new((width, height), band_data.iter().cloned().collect());
            band.write((0, 0), (width, height), &buffer)?;
            band.set_no_data_value(Some(0.0))?;
        }
        Ok(dataset)
    }

    fn write_copy(source: &Dataset, driver_name: &str, path: &Path) -> GeocodeResult<PathBuf> {
        let driver = DriverManager::get_driver_by_name(driver_name)?;
        source.create_copy(&driver, path, &[])?;
        log::info!("Wrote {}", path.display());
        Ok(path.to_path_buf())
    }

    /// `{basename}.png` and `{basename}_large.png` plus their `.aux.xml` sidecars
    fn write_browse_pair(
        &self,
        bands: &[&Array2<u8>],
        geo_transform: [f64; 6],
        projection: &str,
        basename: &Path,
    ) -> GeocodeResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (suffix, max_width) in [("", self.small_width), ("_large", self.large_width)] {
            let decimated: Vec<(Array2<u8>, usize)> =
                bands.iter().map(|b| decimate(b, max_width)).collect();
            let step = decimated[0].1 as f64;
            let mut gt = geo_transform;
            gt[1] *= step;
            gt[5] *= step;

            let refs: Vec<&Array2<u8>> = decimated.iter().map(|(b, _)| b).collect();
            let mem = Self::memory_dataset(&refs, gt, projection)?;
            let png = with_suffix(basename, &format!("{}.png", suffix));
            written.push(Self::write_copy(&mem, "PNG", &png)?);

            let aux = with_suffix(basename, &format!("{}.png.aux.xml", suffix));
            if aux.exists() {
                written.push(aux);
            }
        }
        Ok(written)
    }

    fn scaled_amplitude(&self, raster: &GeoRaster) -> Array2<u8> {
        sigma_scale(&power_to_amplitude(&raster.data), self.sigmas)
    }
}

impl BrowseRenderer for GdalBrowseRenderer {
    fn render_browse(&self, geotiff: &Path, basename: &Path) -> GeocodeResult<Vec<PathBuf>> {
        let raster = Self::read_raster(geotiff)?;
        let scaled = self.scaled_amplitude(&raster);
        self.write_browse_pair(&[&scaled], raster.geo_transform, &raster.projection, basename)
    }

    fn render_overview(&self, geotiff: &Path, kmz: &Path) -> GeocodeResult<PathBuf> {
        let raster = Self::read_raster(geotiff)?;
        let scaled = self.scaled_amplitude(&raster);
        let (decimated, step) = decimate(&scaled, self.large_width);
        let mut gt = raster.geo_transform;
        gt[1] *= step as f64;
        gt[5] *= step as f64;
        let mem = Self::memory_dataset(&[&decimated], gt, &raster.projection)?;
        Self::write_copy(&mem, "KMLSUPEROVERLAY", kmz)
    }

    fn render_color_composite(
        &self,
        primary: &Path,
        cross: &Path,
        basename: &Path,
    ) -> GeocodeResult<Vec<PathBuf>> {
        let co = Self::read_raster(primary)?;
        let cx = Self::read_raster(cross)?;
        if co.data.dim() != cx.data.dim() {
            return Err(GeocodeError::InvalidFormat(format!(
                "cannot composite {} {:?} with {} {:?}",
                primary.display(),
                co.data.dim(),
                cross.display(),
                cx.data.dim()
            )));
        }

        let red = self.scaled_amplitude(&co);
        let green = self.scaled_amplitude(&cx);
        let bands = [&red, &green, &red];

        let mem = Self::memory_dataset(&bands, co.geo_transform, &co.projection)?;
        let mut written = vec![Self::write_copy(&mem, "GTiff", &with_suffix(basename, ".tif"))?];
        written.extend(self.write_browse_pair(&bands, co.geo_transform, &co.projection, basename)?);
        Ok(written)
    }
}

/// `basename` with `suffix` appended to its last component
pub fn with_suffix(basename: &Path, suffix: &str) -> PathBuf {
    let mut name = basename.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
