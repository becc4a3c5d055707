use crate::config::GeocodeConfig;
use crate::core::pipeline::PipelineRun;
use crate::io::browse::BrowseRenderer;
use crate::io::metadata::{MetadataContext, MetadataTemplate};
use crate::io::toolchain::WorkDir;
use crate::types::GeocodeResult;
use chrono::Local;
use std::path::{Path, PathBuf};

/// Packaged product directory
#[derive(Debug, Clone)]
pub struct ProductSummary {
    pub dir: PathBuf,
    /// Files moved into the product directory, in packaging order
    pub files: Vec<PathBuf>,
    pub color_composite: Option<PathBuf>,
}

/// Collects channel geotiffs, renders browse imagery and packages `PRODUCT/`
pub struct ProductAssembler<'a, R: BrowseRenderer + ?Sized> {
    config: &'a GeocodeConfig,
    renderer: &'a R,
    workdir: &'a WorkDir,
}

impl<'a, R: BrowseRenderer + ?Sized> ProductAssembler<'a, R> {
    pub fn new(config: &'a GeocodeConfig, renderer: &'a R, workdir: &'a WorkDir) -> Self {
        Self { config, renderer, workdir }
    }

    pub fn assemble(
        &self,
        outfile: &str,
        run: &PipelineRun,
        year_acquired: &str,
    ) -> GeocodeResult<ProductSummary> {
        let mut generated: Vec<PathBuf> = Vec::new();
        // (geotiff name, polarization label) for the metadata sidecars
        let mut images: Vec<(String, String)> = Vec::new();

        for output in &run.outputs {
            let geotiff = self.workdir.path(&output.geotiff);
            let basename = self.workdir.path(format!("{}_{}", outfile, output.polarization.tag()));
            generated.extend(self.renderer.render_browse(&geotiff, &basename)?);
            generated.push(geotiff);
            images.push((output.geotiff.clone(), output.polarization.to_string()));
        }

        if let Some(primary) = run.primary() {
            let kmz = self.workdir.path(format!("{}.kmz", outfile));
            generated.push(self.renderer.render_overview(&self.workdir.path(&primary.geotiff), &kmz)?);
        }

        let mut color_composite = None;
        match (run.primary(), run.cross_output()) {
            (Some(primary), Some(cross)) if self.config.color_composite => {
                log::info!("Creating colour composite from {} and {}", primary.polarization, cross.polarization);
                let basename = self.workdir.path(format!("{}_rgb", outfile));
                let files = self.renderer.render_color_composite(
                    &self.workdir.path(&primary.geotiff),
                    &self.workdir.path(&cross.geotiff),
                    &basename,
                )?;
                if let Some(tif) = files.iter().find(|f| has_extension(f, "tif")) {
                    if let Some(name) = tif.file_name() {
                        color_composite = Some(name.to_string_lossy().into_owned());
                        images.push((
                            name.to_string_lossy().into_owned(),
                            format!("{}+{}", primary.polarization, cross.polarization),
                        ));
                    }
                }
                generated.extend(files);
            }
            (_, None) => log::info!("No cross-polarization channel, skipping colour composite"),
            _ => log::info!("Colour composite disabled"),
        }

        generated.extend(self.workdir.files_matching(|n| n.ends_with("_log.txt"))?);

        let product = self.workdir.subdir(&self.config.product_dir)?;
        let mut files = Vec::new();
        for path in generated {
            if let Some(moved) = move_into(&path, product.root())? {
                files.push(moved);
            }
        }

        let template = MetadataTemplate::resolve(self.config.metadata_template.as_deref())?;
        let processed = Local::now();
        for (image, polarization) in &images {
            let ctx = MetadataContext {
                processed,
                terrain_height: self.config.terrain_height,
                year_acquired: year_acquired.to_string(),
                granule_type: run.granule_type,
                polarization: polarization.clone(),
                power_scale: self.config.power_scale,
            };
            files.push(template.write_sidecar(&product.path(image), &ctx)?);
        }

        log::info!("Packaged {} files into {}", files.len(), product.root().display());
        Ok(ProductSummary {
            dir: product.root().to_path_buf(),
            files,
            color_composite: color_composite.map(|name| product.path(name)),
        })
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().map(|e| e == ext).unwrap_or(false)
}

/// Move a file into `dir`; files that were never produced are skipped
fn move_into(path: &Path, dir: &Path) -> GeocodeResult<Option<PathBuf>> {
    let name = match path.file_name() {
        Some(name) if path.exists() => name,
        _ => {
            log::warn!("Expected product file {} is missing", path.display());
            return Ok(None);
        }
    };
    let target = dir.join(name);
    if target != path {
        std::fs::rename(path, &target)?;
    }
    Ok(Some(target))
}
