use crate::types::{GeocodeError, GeocodeResult};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One external command with its file arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// File fed to the command's standard input
    pub stdin: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(stdin) = &self.stdin {
            write!(f, " < {}", stdin.display())?;
        }
        Ok(())
    }
}

/// Why an external command did not succeed
#[derive(Debug, thiserror::Error)]
pub enum ToolFailure {
    #[error("could not start: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("exited with status {0:?}")]
    Exit(Option<i32>),
}

/// The external radar processing toolchain.
///
/// Every call blocks until the command finishes. Commands read and write named files
/// relative to `cwd`.
pub trait Toolchain {
    fn execute(&self, cwd: &Path, invocation: &Invocation) -> Result<(), ToolFailure>;
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn execute(&self, cwd: &Path, invocation: &Invocation) -> Result<(), ToolFailure> {
        (**self).execute(cwd, invocation)
    }
}

/// Runs commands as child processes found on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct GammaToolchain;

impl Toolchain for GammaToolchain {
    fn execute(&self, cwd: &Path, invocation: &Invocation) -> Result<(), ToolFailure> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).current_dir(cwd);
        if let Some(stdin) = &invocation.stdin {
            command.stdin(Stdio::from(File::open(cwd.join(stdin))?));
        }

        let output = command.output()?;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            log::debug!("{}", line);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            for line in stderr.lines() {
                log::debug!("{}: {}", invocation.program, line);
            }
            Ok(())
        } else {
            for line in stderr.lines() {
                log::error!("{}: {}", invocation.program, line);
            }
            Err(ToolFailure::Exit(output.status.code()))
        }
    }
}

/// Scratch directory a run owns exclusively.
///
/// Every stage resolves its file names against this handle instead of the process
/// working directory.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new<P: AsRef<Path>>(root: P) -> GeocodeResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join(name)
    }

    /// Handle on a sub-directory, created if needed
    pub fn subdir(&self, name: &str) -> GeocodeResult<WorkDir> {
        WorkDir::new(self.root.join(name))
    }

    /// Run one toolchain command inside this directory; failures are fatal
    pub fn run<T: Toolchain + ?Sized>(
        &self,
        toolchain: &T,
        stage: &str,
        invocation: Invocation,
    ) -> GeocodeResult<()> {
        log::info!("{}", invocation);
        toolchain.execute(&self.root, &invocation).map_err(|e| {
            log::error!("{} failed: {}", invocation.program, e);
            GeocodeError::Toolchain {
                stage: stage.to_string(),
                command: invocation.to_string(),
                reason: e.to_string(),
            }
        })
    }

    pub fn copy(&self, from: &str, to: &str) -> GeocodeResult<()> {
        std::fs::copy(self.path(from), self.path(to))?;
        Ok(())
    }

    /// Files directly inside the directory whose names satisfy `filter`, sorted
    pub fn files_matching<F: Fn(&str) -> bool>(&self, filter: F) -> GeocodeResult<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if filter(name) {
                    found.push(entry.path());
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct ExitWith(Option<i32>);

    impl Toolchain for ExitWith {
        fn execute(&self, _cwd: &Path, _invocation: &Invocation) -> Result<(), ToolFailure> {
            match self.0 {
                Some(0) => Ok(()),
                code => Err(ToolFailure::Exit(code)),
            }
        }
    }

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("create_dem_par")
            .arg("out_area_map.par")
            .stdin_from("out_area_map_dem_par.in");
        assert_eq!(inv.to_string(), "create_dem_par out_area_map.par < out_area_map_dem_par.in");
    }

    #[test]
    fn test_failure_maps_to_toolchain_error() {
        let temp = TempDir::new().unwrap();
        let workdir = WorkDir::new(temp.path()).unwrap();

        assert!(workdir.run(&ExitWith(Some(0)), "ingest", Invocation::new("par_S1_GRD")).is_ok());
        match workdir.run(&ExitWith(Some(2)), "ingest", Invocation::new("par_S1_GRD").arg("a.tiff")) {
            Err(GeocodeError::Toolchain { stage, command, .. }) => {
                assert_eq!(stage, "ingest");
                assert_eq!(command, "par_S1_GRD a.tiff");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_files_matching() {
        let temp = TempDir::new().unwrap();
        let workdir = WorkDir::new(temp.path()).unwrap();
        std::fs::write(workdir.path("b.EOF"), "").unwrap();
        std::fs::write(workdir.path("a.EOF"), "").unwrap();
        std::fs::write(workdir.path("c.txt"), "").unwrap();
        workdir.subdir("d.EOF").unwrap();

        let found = workdir.files_matching(|n| n.ends_with(".EOF")).unwrap();
        assert_eq!(found, vec![workdir.path("a.EOF"), workdir.path("b.EOF")]);
    }

    static CAPTURED: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            CAPTURED.lock().unwrap().push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    #[cfg(unix)]
    #[test]
    fn test_failing_command_stderr_is_logged() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);

        let temp = TempDir::new().unwrap();
        let result = GammaToolchain.execute(
            temp.path(),
            &Invocation::new("sh").arg("-c").arg("echo boom >&2; exit 3"),
        );
        assert!(matches!(result, Err(ToolFailure::Exit(Some(3)))));

        let captured = CAPTURED.lock().unwrap();
        assert!(captured
            .iter()
            .any(|(level, message)| *level == Level::Error && message == "sh: boom"));
    }

    #[test]
    fn test_missing_program_is_spawn_failure() {
        let temp = TempDir::new().unwrap();
        let result = GammaToolchain.execute(temp.path(), &Invocation::new("definitely_not_a_gamma_program_xyz"));
        assert!(matches!(result, Err(ToolFailure::Spawn(_))));
    }
}
