//! Spherecast 360° video pipeline library
//!
//! Classifies spherical sources, converts frames between projection
//! topologies, extracts flat viewports and sprite sheets, drives multi-pass
//! encodes through an external encoder and assembles HLS/DASH packages with
//! viewport-adaptive tiling descriptors.
//!
//! The four job entry points live in [`app`]:
//!
//! - `ConvertInteractor::convert_projection`
//! - `ViewportInteractor::extract_viewport`
//! - `EncodeInteractor::encode_rendition`
//! - `PackageInteractor::build_streaming_package`

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod projection;
pub mod utils;
pub mod viewport;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{
    BitrateLevel, EncodingProfile, OutputFormat, ProjectionMetadata, ProjectionType, StereoMode,
    StreamingPackage, VideoAsset, Viewport,
};
pub use error::{SphereError, SphereResult};
