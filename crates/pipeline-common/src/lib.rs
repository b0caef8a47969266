//! Shared types for the solar-datapipes workspace.
//!
//! Everything that more than one crate needs lives here: the error taxonomy,
//! timestamps and periods, per-source cadence descriptors, and the keys that
//! identify data modalities throughout the pipeline.

pub mod cadence;
pub mod error;
pub mod source;
pub mod time;

pub use cadence::CadenceDescriptor;
pub use error::{PipelineError, PipelineResult};
pub use source::SourceKey;
pub use time::{TimePeriod, Timestamp};
