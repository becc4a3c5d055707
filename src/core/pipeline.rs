use crate::config::GeocodeConfig;
use crate::core::edge_blank::{blank_raw_file, ByteOrder};
use crate::core::multilook::LookFactors;
use crate::io::annotation::AnnotationRoot;
use crate::io::granule::Granule;
use crate::io::orbit::OrbitReader;
use crate::io::par_file::ParFile;
use crate::io::toolchain::{Invocation, Toolchain, WorkDir};
use crate::types::{
    ChannelInventory, ChannelRole, GeocodeError, GeocodeResult, GranuleType, Polarization, PowerScale,
};
use std::fmt;

/// Processing state of one channel. Channels only ever move forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelStage {
    Detected,
    Ingested,
    OrbitCorrected,
    MultiLooked,
    PowerConverted,
    EdgeBlanked,
    LookupBuilt,
    BackGeocoded,
    FormatConverted,
}

impl fmt::Display for ChannelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelStage::Detected => "detection",
            ChannelStage::Ingested => "ingestion",
            ChannelStage::OrbitCorrected => "orbit correction",
            ChannelStage::MultiLooked => "multilooking",
            ChannelStage::PowerConverted => "power conversion",
            ChannelStage::EdgeBlanked => "edge blanking",
            ChannelStage::LookupBuilt => "lookup table",
            ChannelStage::BackGeocoded => "back geocoding",
            ChannelStage::FormatConverted => "format conversion",
        };
        write!(f, "{}", name)
    }
}

/// Working file names of one channel, relative to the working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFileNames {
    pub grd: String,
    pub mgrd: String,
    pub utm: String,
    pub geotiff: String,
}

impl ChannelFileNames {
    pub fn new(outfile: &str, pol: Polarization) -> Self {
        let tag = pol.tag();
        Self {
            grd: format!("{}.{}.grd", outfile, tag),
            mgrd: format!("{}.{}.mgrd", outfile, tag),
            utm: format!("{}.{}.utm", outfile, tag),
            geotiff: format!("{}_{}.tif", outfile, tag),
        }
    }
}

/// One polarization channel on its way through the pipeline
#[derive(Debug, Clone)]
pub struct PolarizationChannel {
    pub polarization: Polarization,
    pub role: ChannelRole,
    pub looks: LookFactors,
    pub files: ChannelFileNames,
    history: Vec<ChannelStage>,
}

impl PolarizationChannel {
    pub fn new(outfile: &str, polarization: Polarization, role: ChannelRole, looks: LookFactors) -> Self {
        Self {
            polarization,
            role,
            looks,
            files: ChannelFileNames::new(outfile, polarization),
            history: vec![ChannelStage::Detected],
        }
    }

    pub fn stage(&self) -> ChannelStage {
        *self.history.last().unwrap_or(&ChannelStage::Detected)
    }

    pub fn history(&self) -> &[ChannelStage] {
        &self.history
    }

    fn advance(&mut self, next: ChannelStage) -> GeocodeResult<()> {
        let current = self.stage();
        if next <= current {
            return Err(GeocodeError::Config(format!(
                "{} channel cannot go from {} back to {}",
                self.polarization, current, next
            )));
        }
        log::debug!("{}: {} -> {}", self.polarization, current, next);
        self.history.push(next);
        Ok(())
    }
}

/// A finished channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutput {
    pub polarization: Polarization,
    pub role: ChannelRole,
    /// Geotiff name inside the working directory
    pub geotiff: String,
    pub history: Vec<ChannelStage>,
}

/// Result of running every detected channel
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub granule_type: GranuleType,
    pub looks: LookFactors,
    pub outputs: Vec<ChannelOutput>,
    /// Cross channel that was processed; drives the colour composite
    pub cross: Option<Polarization>,
}

impl PipelineRun {
    pub fn primary(&self) -> Option<&ChannelOutput> {
        self.outputs.iter().find(|o| o.role == ChannelRole::Primary)
    }

    pub fn cross_output(&self) -> Option<&ChannelOutput> {
        self.outputs.iter().find(|o| o.role == ChannelRole::Cross)
    }
}

/// Sequences the toolchain calls of every polarization channel of a granule.
///
/// The primary channel is always processed first: SLC cross channels reuse the
/// burst table written while ingesting the primary.
pub struct PolarizationPipeline<'a, T: Toolchain + ?Sized> {
    toolchain: &'a T,
    workdir: &'a WorkDir,
    config: &'a GeocodeConfig,
    outfile: String,
    burst_table: Option<String>,
}

impl<'a, T: Toolchain + ?Sized> PolarizationPipeline<'a, T> {
    pub fn new(toolchain: &'a T, workdir: &'a WorkDir, config: &'a GeocodeConfig, outfile: &str) -> Self {
        Self {
            toolchain,
            workdir,
            config,
            outfile: outfile.to_string(),
            burst_table: None,
        }
    }

    /// DEM parameter file of the output grid (`{outfile}_area_map.par`)
    pub fn area_map_par(&self) -> String {
        format!("{}_area_map.par", self.outfile)
    }

    fn small_map(&self) -> String {
        format!("{}_small_map", self.outfile)
    }

    pub fn run(&mut self, granule: &Granule, inventory: &ChannelInventory) -> GeocodeResult<PipelineRun> {
        let primary = inventory
            .primary()
            .ok_or_else(|| GeocodeError::NoPolarization(granule.path().to_path_buf()))?;
        let cross = inventory.cross();
        let granule_type = granule.granule_type();
        let looks = LookFactors::from_pixel_size(self.config.pixel_size, granule_type)?;
        log::info!(
            "Look factor {} (range {}, azimuth {}) for {}m pixels",
            looks.look_factor, looks.range_looks, looks.azimuth_looks, self.config.pixel_size
        );

        let mut outputs = vec![self.process_channel(granule, primary, ChannelRole::Primary, looks)?];
        if let Some(cross) = cross {
            outputs.push(self.process_channel(granule, cross, ChannelRole::Cross, looks)?);
        }

        Ok(PipelineRun {
            granule_type,
            looks,
            outputs,
            cross,
        })
    }

    fn process_channel(
        &mut self,
        granule: &Granule,
        pol: Polarization,
        role: ChannelRole,
        looks: LookFactors,
    ) -> GeocodeResult<ChannelOutput> {
        log::info!("Processing the {} polarization", pol.tag());
        let mut channel = PolarizationChannel::new(&self.outfile, pol, role, looks);

        match granule.granule_type() {
            GranuleType::Grd => self.ingest_grd(granule, &mut channel)?,
            GranuleType::Slc => self.ingest_slc(granule, &mut channel)?,
        }

        let mgrd = channel.files.mgrd.clone();
        let mgrd_par = format!("{}.par", mgrd);
        let par = ParFile::read(self.workdir.path(&mgrd_par))?;
        let range_samples = par.range_samples()?;
        let azimuth_lines = par.azimuth_lines()?;

        if self.config.power_scale == PowerScale::Gamma0 {
            self.convert_power(&mut channel)?;
        }

        // Only the GRD ingestion leaves transients at the line ends
        if granule.granule_type() == GranuleType::Grd {
            blank_raw_file(
                self.workdir.path(&mgrd),
                range_samples,
                azimuth_lines,
                self.config.margins_for(role),
                ByteOrder::Big,
            )?;
            channel.advance(ChannelStage::EdgeBlanked)?;
        }

        let small_map = self.small_map();
        let lookup = format!("{}.utm_to_rdc", small_map);
        self.run_stage(
            ChannelStage::LookupBuilt,
            Invocation::new("gec_map")
                .arg(&mgrd_par)
                .arg("-")
                .arg(self.area_map_par())
                .arg(self.config.terrain_height)
                .arg(format!("{}.par", small_map))
                .arg(&lookup),
        )?;
        channel.advance(ChannelStage::LookupBuilt)?;

        let out_width = ParFile::read(self.workdir.path(format!("{}.par", small_map)))?.width()?;
        self.run_stage(
            ChannelStage::BackGeocoded,
            Invocation::new("geocode_back")
                .arg(&mgrd)
                .arg(range_samples)
                .arg(&lookup)
                .arg(&channel.files.utm)
                .arg(out_width),
        )?;
        channel.advance(ChannelStage::BackGeocoded)?;

        self.run_stage(
            ChannelStage::FormatConverted,
            Invocation::new("data2geotiff")
                .arg(format!("{}.par", small_map))
                .arg(&channel.files.utm)
                .arg(2)
                .arg(&channel.files.geotiff),
        )?;
        channel.advance(ChannelStage::FormatConverted)?;

        Ok(ChannelOutput {
            polarization: pol,
            role,
            geotiff: channel.files.geotiff.clone(),
            history: channel.history().to_vec(),
        })
    }

    fn run_stage(&self, stage: ChannelStage, invocation: Invocation) -> GeocodeResult<()> {
        self.workdir.run(self.toolchain, &stage.to_string(), invocation)
    }

    fn ingest_grd(&mut self, granule: &Granule, channel: &mut PolarizationChannel) -> GeocodeResult<()> {
        let files = granule.channel_files(channel.polarization, &self.config.patterns)?;
        let source = &files[0];
        let grd = channel.files.grd.clone();
        let grd_par = format!("{}.par", grd);

        self.run_stage(
            ChannelStage::Ingested,
            Invocation::new("par_S1_GRD")
                .arg(source.measurement.display())
                .arg(source.annotation.display())
                .arg(source.calibration.display())
                .arg(source.noise.display())
                .arg(&grd_par)
                .arg(&grd),
        )?;
        channel.advance(ChannelStage::Ingested)?;

        match OrbitReader::apply(self.toolchain, self.workdir, &grd_par) {
            Ok(0) => log::debug!("No precision orbit files available"),
            Ok(_) => channel.advance(ChannelStage::OrbitCorrected)?,
            Err(e) => log::warn!("Unable to get precision state vectors... continuing ({})", e),
        }

        let mgrd = channel.files.mgrd.clone();
        let mgrd_par = format!("{}.par", mgrd);
        if channel.looks.needs_multilook() {
            let lks = channel.looks.look_factor;
            self.run_stage(
                ChannelStage::MultiLooked,
                Invocation::new("multi_look_MLI")
                    .arg(&grd)
                    .arg(&grd_par)
                    .arg(&mgrd)
                    .arg(&mgrd_par)
                    .arg(lks)
                    .arg(lks),
            )?;
        } else {
            self.workdir.copy(&grd, &mgrd)?;
            self.workdir.copy(&grd_par, &mgrd_par)?;
        }
        channel.advance(ChannelStage::MultiLooked)
    }

    fn ingest_slc(&mut self, granule: &Granule, channel: &mut PolarizationChannel) -> GeocodeResult<()> {
        let date = granule.acquisition_date()?;
        let date_dir = self.workdir.subdir(&date)?;
        let files = granule.channel_files(channel.polarization, &self.config.patterns)?;
        let stage = ChannelStage::Ingested.to_string();

        let mut slc_tab = String::new();
        let mut copy_tab = String::new();
        for (i, source) in files.iter().enumerate() {
            let swath = source.swath.unwrap_or(i as u8 + 1);
            let base = format!("{}_iw{}_{}", date, swath, channel.polarization.tag());
            date_dir.run(
                self.toolchain,
                &stage,
                Invocation::new("par_S1_SLC")
                    .arg(source.measurement.display())
                    .arg(source.annotation.display())
                    .arg(source.calibration.display())
                    .arg(source.noise.display())
                    .arg(format!("{}.slc.par", base))
                    .arg(format!("{}.slc", base))
                    .arg(format!("{}.tops_par", base)),
            )?;
            slc_tab.push_str(&format!("{0}.slc {0}.slc.par {0}.tops_par\n", base));
            copy_tab.push_str(&format!("{0}.cslc {0}.cslc.par {0}.ctops_par\n", base));
        }
        std::fs::write(date_dir.path("SLC_TAB"), slc_tab)?;
        std::fs::write(date_dir.path("SLC_TAB_copy"), copy_tab)?;

        let burst_table = match channel.role {
            ChannelRole::Primary => self.build_burst_table(&date, &files)?,
            ChannelRole::Cross => self.burst_table.clone().ok_or_else(|| {
                GeocodeError::Config(format!(
                    "{} cannot be ingested before its primary channel",
                    channel.polarization
                ))
            })?,
        };
        self.workdir.copy(&burst_table, &format!("{}/{}", date, burst_table))?;
        channel.advance(ChannelStage::Ingested)?;

        let rlks = channel.looks.range_looks;
        let alks = channel.looks.azimuth_looks;
        let stage = ChannelStage::MultiLooked.to_string();
        date_dir.run(
            self.toolchain,
            &stage,
            Invocation::new("SLC_copy_S1_TOPS")
                .arg("SLC_TAB")
                .arg("SLC_TAB_copy")
                .arg(&burst_table),
        )?;
        date_dir.run(
            self.toolchain,
            &stage,
            Invocation::new("SLC_mosaic_S1_TOPS")
                .arg("SLC_TAB_copy")
                .arg(format!("{}.slc", date))
                .arg(format!("{}.slc.par", date))
                .arg(rlks)
                .arg(alks),
        )?;
        date_dir.run(
            self.toolchain,
            &stage,
            Invocation::new("multi_look")
                .arg(format!("{}.slc", date))
                .arg(format!("{}.slc.par", date))
                .arg(format!("{}.mli", date))
                .arg(format!("{}.mli.par", date))
                .arg(rlks)
                .arg(alks),
        )?;

        std::fs::rename(
            date_dir.path(format!("{}.mli", date)),
            self.workdir.path(&channel.files.mgrd),
        )?;
        std::fs::rename(
            date_dir.path(format!("{}.mli.par", date)),
            self.workdir.path(format!("{}.par", channel.files.mgrd)),
        )?;
        channel.advance(ChannelStage::MultiLooked)
    }

    /// Write `{date}_burst_tab`: one `1 <bursts>` line per sub-swath
    fn build_burst_table(&mut self, date: &str, files: &[crate::io::granule::ChannelFiles]) -> GeocodeResult<String> {
        log::info!("Determining number of bursts");
        let name = format!("{}_burst_tab", date);
        let mut table = String::new();
        for source in files {
            let bursts = AnnotationRoot::read(&source.annotation)?.burst_count();
            table.push_str(&format!("1 {}\n", bursts));
        }
        std::fs::write(self.workdir.path(&name), table)?;
        self.burst_table = Some(name.clone());
        Ok(name)
    }

    /// Sigma0 to gamma0: undo the sigma0 normalization, then apply gamma0
    fn convert_power(&self, channel: &mut PolarizationChannel) -> GeocodeResult<()> {
        let mgrd = &channel.files.mgrd;
        let par = format!("{}.par", mgrd);
        let sigma = format!("{}.sigma", mgrd);
        let gamma = format!("{}.gamma", mgrd);
        log::info!("Converting {} from sigma0 to gamma0", channel.polarization);

        self.run_stage(
            ChannelStage::PowerConverted,
            radcal_mli(mgrd, &par, &sigma, "-1"),
        )?;
        self.run_stage(
            ChannelStage::PowerConverted,
            radcal_mli(&sigma, &par, &gamma, "2"),
        )?;
        std::fs::rename(self.workdir.path(&gamma), self.workdir.path(mgrd))?;
        std::fs::remove_file(self.workdir.path(&sigma))?;
        channel.advance(ChannelStage::PowerConverted)
    }
}

/// `radcal_MLI` with no antenna gain file; `mode` selects the normalization
fn radcal_mli(input: &str, par: &str, output: &str, mode: &str) -> Invocation {
    Invocation::new("radcal_MLI")
        .arg(input)
        .arg(par)
        .arg("-")
        .arg(output)
        .arg("-")
        .arg("0")
        .arg("0")
        .arg(mode)
}
