use crate::config::ChannelPatterns;
use crate::io::toolchain::WorkDir;
use crate::types::{ChannelInventory, GeocodeError, GeocodeResult, GranuleType, Polarization};
use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Input files of one channel for one sub-swath (GRD products have a single entry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFiles {
    /// Sub-swath number (1-3 for IW), when the file name carries one
    pub swath: Option<u8>,
    pub measurement: PathBuf,
    pub annotation: PathBuf,
    pub calibration: PathBuf,
    pub noise: PathBuf,
}

/// An unpacked Sentinel-1 SAFE product
#[derive(Debug, Clone)]
pub struct Granule {
    path: PathBuf,
    name: String,
    granule_type: GranuleType,
}

impl Granule {
    /// Open a SAFE directory, or extract a zip into the working directory first
    pub fn open<P: AsRef<Path>>(input: P, workdir: &WorkDir) -> GeocodeResult<Self> {
        let input = input.as_ref();
        if !input.exists() {
            log::error!("ERROR: Input file {} does not exist", input.display());
            return Err(GeocodeError::InputNotFound(input.to_path_buf()));
        }

        let path = if is_zip(input) {
            extract_zip(input, workdir)?
        } else {
            input.to_path_buf()
        };
        if !path.is_dir() {
            return Err(GeocodeError::InvalidFormat(format!(
                "{} is not a SAFE directory",
                path.display()
            )));
        }
        // Toolchain commands run from several directories
        let path = std::fs::canonicalize(&path)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let granule_type = GranuleType::from_path(&name);
        log::info!("Granule {} ({})", name, granule_type);

        Ok(Self { path, name, granule_type })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn granule_type(&self) -> GranuleType {
        self.granule_type
    }

    /// Acquisition start date as `YYYYMMDD`, from the product name
    pub fn acquisition_date(&self) -> GeocodeResult<String> {
        let re = Regex::new(r"_(\d{8})T\d{6}_").map_err(|e| GeocodeError::Metadata(e.to_string()))?;
        re.captures(&self.name)
            .map(|c| c[1].to_string())
            .ok_or_else(|| {
                GeocodeError::Metadata(format!("no acquisition date in granule name {}", self.name))
            })
    }

    pub fn acquisition_year(&self) -> GeocodeResult<String> {
        Ok(self.acquisition_date()?[..4].to_string())
    }

    fn measurement_dir(&self) -> PathBuf {
        self.path.join("measurement")
    }

    fn annotation_dir(&self) -> PathBuf {
        self.path.join("annotation")
    }

    fn calibration_dir(&self) -> PathBuf {
        self.path.join("annotation").join("calibration")
    }

    /// Which channels have measurement rasters
    pub fn inventory(&self, patterns: &ChannelPatterns) -> GeocodeResult<ChannelInventory> {
        let mut inventory = ChannelInventory::default();
        for pol in Polarization::ALL {
            let re = channel_regex(&patterns.measurement, pol)?;
            let present = !list_matching(&self.measurement_dir(), &re)?.is_empty();
            inventory.set(pol, present);
        }
        log::info!(
            "Found channels: vv={} vh={} hh={} hv={}",
            inventory.vv, inventory.vh, inventory.hh, inventory.hv
        );
        Ok(inventory)
    }

    /// Measurement, annotation, calibration and noise files of a channel, per sub-swath
    pub fn channel_files(
        &self,
        pol: Polarization,
        patterns: &ChannelPatterns,
    ) -> GeocodeResult<Vec<ChannelFiles>> {
        let measurement_re = channel_regex(&patterns.measurement, pol)?;
        let annotation_re = channel_regex(&patterns.annotation, pol)?;
        let calibration_re = channel_regex(&patterns.calibration, pol)?;
        let noise_re = channel_regex(&patterns.noise, pol)?;

        let annotations = list_matching(&self.annotation_dir(), &annotation_re)?;
        let calibrations = list_matching(&self.calibration_dir(), &calibration_re)?;
        let noises = list_matching(&self.calibration_dir(), &noise_re)?;

        let mut files = Vec::new();
        for measurement in list_matching(&self.measurement_dir(), &measurement_re)? {
            let stem = file_stem(&measurement);
            let swath = swath_number(&stem);
            let pick = |candidates: &[PathBuf], kind: &str| -> GeocodeResult<PathBuf> {
                candidates
                    .iter()
                    .find(|c| file_stem(c).ends_with(&stem))
                    .or_else(|| candidates.iter().find(|c| swath_number(&file_stem(c)) == swath))
                    .cloned()
                    .ok_or_else(|| {
                        GeocodeError::InvalidFormat(format!(
                            "no {} file for {} in {}",
                            kind,
                            measurement.display(),
                            self.path.display()
                        ))
                    })
            };
            files.push(ChannelFiles {
                swath,
                annotation: pick(&annotations, "annotation")?,
                calibration: pick(&calibrations, "calibration")?,
                noise: pick(&noises, "noise")?,
                measurement,
            });
        }

        if files.is_empty() {
            return Err(GeocodeError::InvalidFormat(format!(
                "no {} measurement in {}",
                pol,
                self.path.display()
            )));
        }
        files.sort_by_key(|f| f.swath);
        Ok(files)
    }

    /// Every product annotation (calibration and noise annotations excluded)
    pub fn annotation_files(&self) -> GeocodeResult<Vec<PathBuf>> {
        let re = Regex::new(r"\.xml$").map_err(|e| GeocodeError::Config(e.to_string()))?;
        list_matching(&self.annotation_dir(), &re)
    }
}

fn is_zip(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false)
}

fn extract_zip(zip_path: &Path, workdir: &WorkDir) -> GeocodeResult<PathBuf> {
    log::info!("Extracting {} into {}", zip_path.display(), workdir.root().display());
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| GeocodeError::InvalidFormat(format!("Failed to open ZIP: {}", e)))?;
    archive
        .extract(workdir.root())
        .map_err(|e| GeocodeError::InvalidFormat(format!("Failed to extract ZIP: {}", e)))?;

    let stem = zip_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(workdir.path(format!("{}.SAFE", stem)))
}

fn channel_regex(pattern: &str, pol: Polarization) -> GeocodeResult<Regex> {
    let expanded = ChannelPatterns::expand(pattern, pol);
    Regex::new(&expanded)
        .map_err(|e| GeocodeError::Config(format!("bad channel pattern `{}`: {}", expanded, e)))
}

/// Files in `dir` whose names match `re`, sorted; a missing directory has no files
fn list_matching(dir: &Path, re: &Regex) -> GeocodeResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if re.is_match(&entry.file_name().to_string_lossy()) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn swath_number(stem: &str) -> Option<u8> {
    let re = Regex::new(r"-(?:iw|ew)(\d)-").ok()?;
    re.captures(stem).and_then(|c| c[1].parse().ok())
}
