//! Granule access, toolchain invocation and product output

pub mod annotation;
pub mod browse;
pub mod granule;
pub mod metadata;
pub mod orbit;
pub mod par_file;
pub mod product;
pub mod toolchain;

pub use annotation::AnnotationRoot;
pub use browse::{BrowseRenderer, GdalBrowseRenderer};
pub use granule::{ChannelFiles, Granule};
pub use metadata::{MetadataContext, MetadataTemplate};
pub use orbit::OrbitReader;
pub use par_file::ParFile;
pub use product::{ProductAssembler, ProductSummary};
pub use toolchain::{GammaToolchain, Invocation, ToolFailure, Toolchain, WorkDir};
