use crate::io::toolchain::{Invocation, Toolchain, WorkDir};
use crate::types::{GeocodeError, GeocodeResult};
use std::path::{Path, PathBuf};

/// External helper that downloads precision orbit (EOF) files into the working directory
pub const ORBIT_FETCH_PROGRAM: &str = "get_orb.py";
/// Toolchain command that replaces the state vectors of a parameter file
pub const ORBIT_UPDATE_PROGRAM: &str = "S1_OPOD_vec";

/// Precision orbit handling around the toolchain
pub struct OrbitReader;

impl OrbitReader {
    /// Precision orbit files currently in the working directory
    pub fn find_orbit_files(workdir: &WorkDir) -> GeocodeResult<Vec<PathBuf>> {
        workdir.files_matching(|name| name.ends_with(".EOF"))
    }

    /// Ask the orbit helper for the granule's precision orbits.
    ///
    /// Processing continues with the annotated state vectors when this fails.
    pub fn fetch<T: Toolchain + ?Sized>(toolchain: &T, workdir: &WorkDir, granule: &Path) {
        log::info!("Getting precision orbit information");
        let invocation = Invocation::new(ORBIT_FETCH_PROGRAM).arg(granule.display());
        if let Err(e) = workdir.run(toolchain, "orbit fetch", invocation) {
            log::warn!("Unable to fetch precision state vectors... continuing ({})", e);
        }
    }

    /// Apply every available precision orbit file to a parameter file.
    ///
    /// Returns the number of orbit files applied. An error here is an
    /// `OrbitCorrection` error, which callers log and otherwise ignore.
    pub fn apply<T: Toolchain + ?Sized>(
        toolchain: &T,
        workdir: &WorkDir,
        par_file: &str,
    ) -> GeocodeResult<usize> {
        let orbit_files = Self::find_orbit_files(workdir)
            .map_err(|e| GeocodeError::OrbitCorrection(e.to_string()))?;

        for eof in &orbit_files {
            log::debug!("Applying precision orbit information");
            let name = eof
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let invocation = Invocation::new(ORBIT_UPDATE_PROGRAM).arg(par_file).arg(&name);
            toolchain.execute(workdir.root(), &invocation).map_err(|e| {
                GeocodeError::OrbitCorrection(format!("`{}` {}", invocation, e))
            })?;
        }
        Ok(orbit_files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::toolchain::ToolFailure;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Toolchain for Recorder {
        fn execute(&self, _cwd: &Path, invocation: &Invocation) -> Result<(), ToolFailure> {
            self.calls.borrow_mut().push(invocation.to_string());
            if self.fail {
                Err(ToolFailure::Exit(Some(1)))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_apply_every_orbit_file() {
        let temp = TempDir::new().unwrap();
        let workdir = WorkDir::new(temp.path()).unwrap();
        std::fs::write(workdir.path("S1A_OPER_AUX_POEORB_1.EOF"), "").unwrap();
        std::fs::write(workdir.path("S1A_OPER_AUX_POEORB_2.EOF"), "").unwrap();

        let recorder = Recorder::default();
        assert_eq!(OrbitReader::apply(&recorder, &workdir, "out.vv.grd.par").unwrap(), 2);
        assert_eq!(
            recorder.calls.borrow().as_slice(),
            &[
                "S1_OPOD_vec out.vv.grd.par S1A_OPER_AUX_POEORB_1.EOF".to_string(),
                "S1_OPOD_vec out.vv.grd.par S1A_OPER_AUX_POEORB_2.EOF".to_string(),
            ]
        );
    }

    #[test]
    fn test_apply_failure_is_orbit_error() {
        let temp = TempDir::new().unwrap();
        let workdir = WorkDir::new(temp.path()).unwrap();
        std::fs::write(workdir.path("orbit.EOF"), "").unwrap();

        let recorder = Recorder { fail: true, ..Default::default() };
        assert!(matches!(
            OrbitReader::apply(&recorder, &workdir, "out.vv.grd.par"),
            Err(GeocodeError::OrbitCorrection(_))
        ));
    }

    #[test]
    fn test_fetch_failure_is_soft() {
        let temp = TempDir::new().unwrap();
        let workdir = WorkDir::new(temp.path()).unwrap();
        let recorder = Recorder { fail: true, ..Default::default() };
        OrbitReader::fetch(&recorder, &workdir, Path::new("granule.SAFE"));
        assert_eq!(recorder.calls.borrow().len(), 1);
    }
}
