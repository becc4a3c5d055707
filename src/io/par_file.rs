use crate::types::{GeocodeError, GeocodeResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Toolchain parameter file (`key:   value [unit]` per line)
#[derive(Debug, Clone)]
pub struct ParFile {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl ParFile {
    pub fn read<P: AsRef<Path>>(path: P) -> GeocodeResult<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path)?;
        Ok(Self::parse(path, &content))
    }

    fn parse(path: PathBuf, content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { path, entries }
    }

    /// Raw value text, unit suffix included
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// First whitespace separated token of a value, parsed
    pub fn parse_value<T: std::str::FromStr>(&self, key: &str) -> GeocodeResult<T> {
        let value = self.get(key).ok_or_else(|| {
            GeocodeError::InvalidFormat(format!(
                "parameter `{}` missing from {}",
                key,
                self.path.display()
            ))
        })?;
        let token = value.split_whitespace().next().unwrap_or("");
        let parsed = token.parse::<T>().map_err(|_| {
            GeocodeError::InvalidFormat(format!(
                "parameter `{}` in {} is not a valid value: {}",
                key,
                self.path.display(),
                value
            ))
        })?;
        log::debug!("{}: {} = {}", self.path.display(), key, token);
        Ok(parsed)
    }

    pub fn range_samples(&self) -> GeocodeResult<usize> {
        self.parse_value("range_samples")
    }

    pub fn azimuth_lines(&self) -> GeocodeResult<usize> {
        self.parse_value("azimuth_lines")
    }

    pub fn width(&self) -> GeocodeResult<usize> {
        self.parse_value("width")
    }
}
