use crate::config::{EdgeMargins, GeocodeConfig};
use crate::core::edge_blank::blank_edges;
use crate::core::geocode::geocode_sentinel;
use crate::core::multilook;
use crate::types::GeocodeError;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyFileNotFoundError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::path::Path;

impl From<GeocodeError> for PyErr {
    fn from(err: GeocodeError) -> PyErr {
        match err {
            GeocodeError::InputNotFound(_) => PyFileNotFoundError::new_err(err.to_string()),
            GeocodeError::Config(_) | GeocodeError::NoPolarization(_) => {
                PyValueError::new_err(err.to_string())
            }
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

/// Geocode a granule; returns the packaged product directory
#[pyfunction]
#[pyo3(name = "geocode_sentinel", signature = (infile, outfile, terrain_height=0.0, pixel_size=30.0, gamma0=false, color=true, workdir="."))]
fn geocode_sentinel_py(
    infile: &str,
    outfile: &str,
    terrain_height: f64,
    pixel_size: f64,
    gamma0: bool,
    color: bool,
    workdir: &str,
) -> PyResult<String> {
    let config = GeocodeConfig::new()
        .with_terrain_height(terrain_height)
        .with_pixel_size(pixel_size)
        .with_gamma0(gamma0)
        .with_color_composite(color);
    let report = geocode_sentinel(Path::new(infile), outfile, Path::new(workdir), config)?;
    Ok(report.product_dir.display().to_string())
}

/// Blank the line edges of a 2-D array, returning a new array
#[pyfunction]
#[pyo3(signature = (data, left=20, right=20))]
fn blank_bad_data<'py>(
    py: Python<'py>,
    data: PyReadonlyArray2<f32>,
    left: usize,
    right: usize,
) -> &'py PyArray2<f32> {
    let mut array = data.as_array().to_owned();
    blank_edges(&mut array, EdgeMargins::new(left, right));
    array.into_pyarray(py)
}

#[pyfunction]
fn look_factor(pixel_size: f64) -> PyResult<u32> {
    Ok(multilook::look_factor(pixel_size)?)
}

#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(geocode_sentinel_py, m)?)?;
    m.add_function(wrap_pyfunction!(blank_bad_data, m)?)?;
    m.add_function(wrap_pyfunction!(look_factor, m)?)?;
    Ok(())
}
