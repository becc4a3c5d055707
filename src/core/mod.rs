//! Geocoding control plane: projection, grid description, edge repair and channel sequencing

pub mod dem_par;
pub mod edge_blank;
pub mod geocode;
pub mod multilook;
pub mod pipeline;
pub mod projection;

// Re-export main types
pub use dem_par::DemParameters;
pub use edge_blank::{blank_buffer, blank_edges, blank_line, blank_raw_file, ByteOrder};
pub use geocode::{geocode_sentinel, GeocodeReport, SentinelGeocoder};
pub use multilook::{look_factor, LookFactors};
pub use pipeline::{ChannelOutput, ChannelStage, PipelineRun, PolarizationChannel, PolarizationPipeline};
pub use projection::{
    utm_zone, GdalTransformer, GeoTransformer, Hemisphere, ProjectionResolver, ProjectionSpec,
};
