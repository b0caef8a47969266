//! Pipeline construction: configuration, source opening, sampling.
//!
//! The crate ties the workspace together: a validated YAML configuration
//! decides which modalities are active, every named store is opened into a
//! capability-keyed source map, and [`DatasetPipeline`] turns that map into
//! training batches, validation anchors, or a single live example.

pub mod config;
pub mod example;
pub mod open;
pub mod sampler;

pub use config::{native_sample_minutes, InputData, PipelineConfig, SourceConfig};
pub use example::{collate, Batch, Example};
pub use open::open_sources;
pub use sampler::DatasetPipeline;
