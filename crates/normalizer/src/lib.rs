//! Normalization and batching for fetched source arrays.
//!
//! Gridded data is z-scored per channel against published provider
//! statistics; point series are scaled by installed capacity; normalized
//! examples stack into batch tensors.

pub mod batch;
pub mod normalize;
pub mod stats;

pub use batch::{stack_arrays, BatchArray};
pub use normalize::{normalize_capacity, normalize_zscore};
pub use stats::{nwp_stats, satellite_stats, ChannelStats, NWP_PROVIDERS};
