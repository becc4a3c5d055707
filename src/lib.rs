//! s1geocode: geocoding orchestration for Sentinel-1 GRD and SLC granules
//!
//! Derives the output UTM grid from a granule's footprint, drives an external
//! GAMMA-style toolchain through the per-polarization processing chain, repairs
//! the edge artifacts of ingested GRD rasters and packages a geocoded product with
//! browse imagery and XML metadata.

pub mod config;
pub mod core;
pub mod io;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use config::{ChannelPatterns, EdgeMargins, GeocodeConfig, SampleType};
pub use types::{
    BoundingBox, ChannelInventory, ChannelRole, GeocodeError, GeocodeResult, GranuleType,
    Polarization, PowerScale,
};

pub use crate::core::{geocode_sentinel, GeocodeReport, SentinelGeocoder};
pub use io::{GammaToolchain, Invocation, Toolchain, WorkDir};
