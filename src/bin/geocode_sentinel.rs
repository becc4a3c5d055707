use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{error, info};
use s1geocode::{geocode_sentinel, GeocodeConfig};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Geocode a Sentinel-1 GRD or SLC granule into a UTM product
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input granule (.SAFE directory or .zip)
    infile: PathBuf,

    /// Output name; products are written as `{outfile}_*`
    outfile: String,

    /// Terrain height in meters
    #[arg(short = 't', long = "terrain-height", alias = "terrain_height", default_value_t = 0.0, allow_negative_numbers = true)]
    terrain_height: f64,

    /// Output pixel size in meters
    #[arg(short = 'p', long = "pixel-size", alias = "pixel_size", default_value_t = 30.0)]
    pixel_size: f64,

    /// Output gamma0 instead of sigma0 power
    #[arg(short = 'g', long)]
    gamma0: bool,

    /// Skip the RGB colour composite of dual-pol granules
    #[arg(long = "no-color")]
    no_color: bool,

    /// Working directory for intermediate files and the product
    #[arg(short = 'w', long, default_value = ".")]
    workdir: PathBuf,
}

const DEBUG_MARKER: &[u8] = b" - DEBUG - ";

/// Every log line goes to the run log; debug lines stay off the console
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !is_debug_line(buf) {
            std::io::stderr().write_all(buf)?;
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()?;
        self.file.flush()
    }
}

fn is_debug_line(line: &[u8]) -> bool {
    line.windows(DEBUG_MARKER.len()).any(|w| w == DEBUG_MARKER)
}

fn init_logging(workdir: &Path, outfile: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(workdir)
        .with_context(|| format!("creating working directory {}", workdir.display()))?;
    let log_path = workdir.join(format!("{}_{}_log.txt", outfile, std::process::id()));
    let file = File::create(&log_path)
        .with_context(|| format!("creating log file {}", log_path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%m/%d/%Y %I:%M:%S %p"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(Tee { file })))
        .init();
    Ok(log_path)
}

fn run(cli: &Cli) -> Result<()> {
    let config = GeocodeConfig::new()
        .with_terrain_height(cli.terrain_height)
        .with_pixel_size(cli.pixel_size)
        .with_gamma0(cli.gamma0)
        .with_color_composite(!cli.no_color);

    let report = geocode_sentinel(&cli.infile, &cli.outfile, &cli.workdir, config)
        .with_context(|| format!("geocoding {}", cli.infile.display()))?;

    info!(
        "Wrote {} files for {} channel(s) into {}",
        report.files.len(),
        report.outputs.len(),
        report.product_dir.display()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let log_path = match init_logging(&cli.workdir, &cli.outfile) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("Starting run");
    info!("Log file {}", log_path.display());

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
