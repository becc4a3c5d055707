use crate::types::{GeocodeResult, GranuleType, PowerScale};
use chrono::{DateTime, Datelike, Local};
use std::path::{Path, PathBuf};

const DEFAULT_TEMPLATE: &str = include_str!("../../config/GeocodingTemplate.xml");

/// Values substituted into the XML metadata template
#[derive(Debug, Clone)]
pub struct MetadataContext {
    pub processed: DateTime<Local>,
    pub terrain_height: f64,
    pub year_acquired: String,
    pub granule_type: GranuleType,
    pub polarization: String,
    pub power_scale: PowerScale,
}

/// XML sidecar template with `[PLACEHOLDER]` fields
#[derive(Debug, Clone)]
pub struct MetadataTemplate {
    text: String,
}

impl Default for MetadataTemplate {
    fn default() -> Self {
        Self { text: DEFAULT_TEMPLATE.to_string() }
    }
}

impl MetadataTemplate {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> GeocodeResult<Self> {
        Ok(Self::from_text(std::fs::read_to_string(path)?))
    }

    /// Bundled template unless a custom one is configured
    pub fn resolve(custom: Option<&Path>) -> GeocodeResult<Self> {
        match custom {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn render(&self, ctx: &MetadataContext) -> String {
        let date = ctx.processed.format("%Y%m%d").to_string();
        let time = format!("{}00", ctx.processed.format("%H%M%S"));
        let datetime = ctx.processed.format("%Y-%m-%dT%H:%M:%S").to_string();

        self.text
            .replace("[DATETIME]", &datetime)
            .replace("[DATE]", &date)
            .replace("[TIME]", &time)
            .replace("[HEIGHT]", &format!("{:?}", ctx.terrain_height))
            .replace("[YEARPROCESSED]", &ctx.processed.year().to_string())
            .replace("[YEARACQUIRED]", &ctx.year_acquired)
            .replace("[TYPE]", &ctx.granule_type.to_string())
            .replace("[POL]", &ctx.polarization)
            .replace("[POWERSCALE]", &ctx.power_scale.to_string())
    }

    /// Write `{image}.xml` next to an image
    pub fn write_sidecar(&self, image: &Path, ctx: &MetadataContext) -> GeocodeResult<PathBuf> {
        let mut name = image.as_os_str().to_os_string();
        name.push(".xml");
        let path = PathBuf::from(name);
        std::fs::write(&path, self.render(ctx))?;
        log::debug!("Wrote metadata {}", path.display());
        Ok(path)
    }
}
