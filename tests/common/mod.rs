//! Shared fixtures: a recording fake toolchain, stub renderers and fake SAFE granules
#![allow(dead_code)]

use s1geocode::core::projection::{GeoTransformer, Hemisphere};
use s1geocode::io::browse::{with_suffix, BrowseRenderer};
use s1geocode::io::toolchain::{Invocation, ToolFailure, Toolchain};
use s1geocode::GeocodeResult;
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const GRD_NAME: &str = "S1A_IW_GRDH_1SDV_20200103T170815_20200103T170842_030639_0382D5_DADE.SAFE";
pub const SLC_NAME: &str = "S1A_IW_SLC__1SDV_20200103T170815_20200103T170842_030639_0382D5_DADE.SAFE";

pub const RASTER_WIDTH: usize = 8;
pub const RASTER_LINES: usize = 4;

/// One line of every fabricated raster
pub const RASTER_LINE: [f32; RASTER_WIDTH] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0];

/// A recorded toolchain call
#[derive(Debug, Clone)]
pub struct Call {
    pub cwd: PathBuf,
    pub invocation: Invocation,
}

/// Toolchain double: records every call and fabricates the files each command would write
#[derive(Default)]
pub struct FakeToolchain {
    calls: RefCell<Vec<Call>>,
    failing: HashSet<String>,
    /// Orbit file written by the orbit fetch helper
    pub orbit_file: Option<String>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self {
            orbit_file: Some("S1A_OPER_AUX_POEORB_OPOD_20200123T121500_V20200102T225942_20200104T005942.EOF".to_string()),
            ..Default::default()
        }
    }

    pub fn failing(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.invocation.program.clone()).collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.invocation.to_string()).collect()
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.invocation.program == program).count()
    }

    fn fabricate(&self, cwd: &Path, invocation: &Invocation) -> std::io::Result<()> {
        let args = &invocation.args;
        let par = |i: usize| write_par(&cwd.join(&args[i]));
        let raster = |i: usize| write_raster(&cwd.join(&args[i]));
        let blank = |i: usize| std::fs::write(cwd.join(&args[i]), b"");

        match invocation.program.as_str() {
            "create_dem_par" => par(0),
            "get_orb.py" => match &self.orbit_file {
                Some(name) => std::fs::write(cwd.join(name), b"<Earth_Explorer_File/>"),
                None => Ok(()),
            },
            "par_S1_GRD" => par(4).and(raster(5)),
            "multi_look_MLI" | "multi_look" => raster(2).and(par(3)),
            "radcal_MLI" => raster(3),
            "gec_map" => par(4).and(blank(5)),
            "geocode_back" => raster(3),
            "data2geotiff" => blank(3),
            "par_S1_SLC" => par(4).and(raster(5)).and(blank(6)),
            "SLC_mosaic_S1_TOPS" => raster(1).and(par(2)),
            _ => Ok(()),
        }
    }
}

impl Toolchain for FakeToolchain {
    fn execute(&self, cwd: &Path, invocation: &Invocation) -> Result<(), ToolFailure> {
        self.calls.borrow_mut().push(Call {
            cwd: cwd.to_path_buf(),
            invocation: invocation.clone(),
        });
        if self.failing.contains(&invocation.program) {
            return Err(ToolFailure::Exit(Some(1)));
        }
        self.fabricate(cwd, invocation)?;
        Ok(())
    }
}

pub fn write_par(path: &Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        format!(
            "title:     fake\nrange_samples:   {}\nazimuth_lines:   {}\nwidth:   {}\nimage_format:  FLOAT\n",
            RASTER_WIDTH, RASTER_LINES, RASTER_WIDTH
        ),
    )
}

/// Big-endian float32 raster of identical lines
pub fn write_raster(path: &Path) -> std::io::Result<()> {
    let mut bytes = Vec::with_capacity(RASTER_WIDTH * RASTER_LINES * 4);
    for _ in 0..RASTER_LINES {
        for v in RASTER_LINE {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
    }
    std::fs::write(path, bytes)
}

pub fn read_raster(path: &Path) -> Vec<f32> {
    std::fs::read(path)
        .unwrap()
        .chunks_exact(4)
        .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Planar stand-in for the UTM projection
pub struct PlanarTransformer;

impl GeoTransformer for PlanarTransformer {
    fn geo_to_utm(
        &self,
        _zone: u8,
        hemisphere: Hemisphere,
        points: &[(f64, f64)],
    ) -> GeocodeResult<Vec<(f64, f64)>> {
        Ok(points
            .iter()
            .map(|&(lon, lat)| {
                let easting = 500_000.0 + (lon - 12.0) * 78_000.0 + lat * 150.0;
                let northing = lat * 111_000.0 + hemisphere.false_northing();
                (easting, northing)
            })
            .collect())
    }
}

/// Renderer that only touches the files a real one would write
#[derive(Default)]
pub struct StubRenderer;

impl BrowseRenderer for StubRenderer {
    fn render_browse(&self, _geotiff: &Path, basename: &Path) -> GeocodeResult<Vec<PathBuf>> {
        let files = vec![with_suffix(basename, ".png"), with_suffix(basename, "_large.png")];
        for f in &files {
            std::fs::write(f, b"png")?;
        }
        Ok(files)
    }

    fn render_overview(&self, _geotiff: &Path, kmz: &Path) -> GeocodeResult<PathBuf> {
        std::fs::write(kmz, b"kmz")?;
        Ok(kmz.to_path_buf())
    }

    fn render_color_composite(
        &self,
        _primary: &Path,
        _cross: &Path,
        basename: &Path,
    ) -> GeocodeResult<Vec<PathBuf>> {
        let files = vec![
            with_suffix(basename, ".tif"),
            with_suffix(basename, ".png"),
            with_suffix(basename, "_large.png"),
        ];
        for f in &files {
            std::fs::write(f, b"rgb")?;
        }
        Ok(files)
    }
}

fn annotation_xml(bursts: usize, lat0: f64, lon0: f64) -> String {
    let mut points = String::new();
    for (dl, dp) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
        points.push_str(&format!(
            "<geolocationGridPoint><latitude>{}</latitude><longitude>{}</longitude><height>0</height></geolocationGridPoint>",
            lat0 + dl,
            lon0 + dp
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<product>
  <swathTiming><linesPerBurst>1500</linesPerBurst><burstList count="{}"></burstList></swathTiming>
  <geolocationGrid><geolocationGridPointList count="4">{}</geolocationGridPointList></geolocationGrid>
</product>"#,
        bursts, points
    )
}

fn write_channel(safe: &Path, stem: &str, annotation: &str) {
    let calibration_dir = safe.join("annotation").join("calibration");
    std::fs::create_dir_all(&calibration_dir).unwrap();
    std::fs::create_dir_all(safe.join("measurement")).unwrap();
    std::fs::write(safe.join("measurement").join(format!("{}.tiff", stem)), b"II*\0").unwrap();
    std::fs::write(safe.join("annotation").join(format!("{}.xml", stem)), annotation).unwrap();
    std::fs::write(calibration_dir.join(format!("calibration-{}.xml", stem)), "<calibration/>").unwrap();
    std::fs::write(calibration_dir.join(format!("noise-{}.xml", stem)), "<noise/>").unwrap();
}

/// Fake GRD granule with the given channels (`"vv"`, `"vh"`, ...)
pub fn make_grd(root: &Path, pols: &[&str]) -> PathBuf {
    let safe = root.join(GRD_NAME);
    std::fs::create_dir_all(&safe).unwrap();
    for (i, pol) in pols.iter().enumerate() {
        let stem = format!(
            "s1a-iw-grd-{}-20200103t170815-20200103t170842-030639-0382d5-{:03}",
            pol,
            i + 1
        );
        write_channel(&safe, &stem, &annotation_xml(0, 45.0, 12.0));
    }
    safe
}

/// Fake IW SLC granule with three sub-swaths per channel; sub-swath `n` has `n + 8` bursts
pub fn make_slc(root: &Path, pols: &[&str]) -> PathBuf {
    let safe = root.join(SLC_NAME);
    std::fs::create_dir_all(&safe).unwrap();
    for (i, pol) in pols.iter().enumerate() {
        for swath in 1..=3usize {
            let stem = format!(
                "s1a-iw{}-slc-{}-20200103t170815-20200103t170842-030639-0382d5-{:03}",
                swath,
                pol,
                i * 3 + swath
            );
            let lon0 = 11.0 + swath as f64 * 0.5;
            write_channel(&safe, &stem, &annotation_xml(swath + 8, 45.0, lon0));
        }
    }
    safe
}
