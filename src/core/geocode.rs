//! End-to-end geocoding of one Sentinel-1 granule.
//!
//! Ties the projection resolver, the DEM parameter builder, the per-channel
//! pipeline and product packaging together around one working directory.

use crate::config::GeocodeConfig;
use crate::core::dem_par::DemParameters;
use crate::core::pipeline::{ChannelOutput, PolarizationPipeline};
use crate::core::projection::{GdalTransformer, GeoTransformer, ProjectionResolver, ProjectionSpec};
use crate::io::annotation;
use crate::io::browse::{BrowseRenderer, GdalBrowseRenderer};
use crate::io::granule::Granule;
use crate::io::orbit::OrbitReader;
use crate::io::product::ProductAssembler;
use crate::io::toolchain::{GammaToolchain, Invocation, Toolchain, WorkDir};
use crate::types::{GeocodeError, GeocodeResult, GranuleType, Polarization};
use std::path::{Path, PathBuf};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct GeocodeReport {
    pub granule_type: GranuleType,
    pub projection: ProjectionSpec,
    pub product_dir: PathBuf,
    pub outputs: Vec<ChannelOutput>,
    pub cross: Option<Polarization>,
    /// Everything packaged into the product directory
    pub files: Vec<PathBuf>,
}

/// Geocodes Sentinel-1 granules with an external toolchain
pub struct SentinelGeocoder<T: Toolchain, G: GeoTransformer, R: BrowseRenderer> {
    config: GeocodeConfig,
    toolchain: T,
    resolver: ProjectionResolver<G>,
    renderer: R,
}

impl SentinelGeocoder<GammaToolchain, GdalTransformer, GdalBrowseRenderer> {
    /// Toolchain from `PATH`, GDAL projections and GDAL browse rendering
    pub fn with_defaults(config: GeocodeConfig) -> Self {
        Self::new(config, GammaToolchain, GdalTransformer, GdalBrowseRenderer::default())
    }
}

impl<T: Toolchain, G: GeoTransformer, R: BrowseRenderer> SentinelGeocoder<T, G, R> {
    pub fn new(config: GeocodeConfig, toolchain: T, transformer: G, renderer: R) -> Self {
        Self {
            config,
            toolchain,
            resolver: ProjectionResolver::new(transformer),
            renderer,
        }
    }

    /// Geocode `infile` (a `.SAFE` directory or `.zip`) into `{outfile}_*` products.
    ///
    /// All intermediate files are written to `workdir`; the packaged product ends up in
    /// `workdir/{product_dir}`.
    pub fn geocode(&self, infile: &Path, outfile: &str, workdir: &Path) -> GeocodeResult<GeocodeReport> {
        self.config.validate()?;
        if outfile.is_empty() {
            return Err(GeocodeError::Config("output name is empty".to_string()));
        }

        let workdir = WorkDir::new(workdir)?;
        let granule = Granule::open(infile, &workdir)?;

        let inventory = granule.inventory(&self.config.patterns)?;
        if inventory.primary().is_none() {
            log::error!("Unable to determine polarization of {}", granule.name());
            return Err(GeocodeError::NoPolarization(granule.path().to_path_buf()));
        }
        for pol in inventory.ignored() {
            log::warn!("Ignoring {} channel of {}", pol, granule.name());
        }

        let bbox = annotation::bounding_box(&granule.annotation_files()?)?;
        log::info!(
            "Bounding box: lat {} to {}, lon {} to {}",
            bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon
        );
        let projection = self.resolver.resolve(&bbox)?;
        log::info!(
            "Output projection EPSG:{} ({:.1} x {:.1} m)",
            projection.epsg(),
            projection.width(),
            projection.height()
        );

        let area_map = format!("{}_area_map", outfile);
        let dem_par = DemParameters::build(
            &area_map,
            self.config.dem_sample_type,
            self.config.pixel_size,
            &projection,
        )?;
        dem_par.write_par_input(workdir.root())?;
        workdir.run(
            &self.toolchain,
            "DEM parameters",
            Invocation::new("create_dem_par")
                .arg(format!("{}.par", area_map))
                .stdin_from(format!("{}_dem_par.in", area_map)),
        )?;

        if self.config.fetch_orbits {
            OrbitReader::fetch(&self.toolchain, &workdir, granule.path());
        }

        let run = PolarizationPipeline::new(&self.toolchain, &workdir, &self.config, outfile)
            .run(&granule, &inventory)?;

        let year_acquired = granule.acquisition_year().unwrap_or_else(|e| {
            log::warn!("{}", e);
            String::new()
        });
        let product = ProductAssembler::new(&self.config, &self.renderer, &workdir)
            .assemble(outfile, &run, &year_acquired)?;

        log::info!("Done!!!");
        Ok(GeocodeReport {
            granule_type: run.granule_type,
            projection,
            product_dir: product.dir,
            outputs: run.outputs,
            cross: run.cross,
            files: product.files,
        })
    }
}

/// Geocode with the default collaborators
pub fn geocode_sentinel(
    infile: &Path,
    outfile: &str,
    workdir: &Path,
    config: GeocodeConfig,
) -> GeocodeResult<GeocodeReport> {
    SentinelGeocoder::with_defaults(config).geocode(infile, outfile, workdir)
}
