//! Shared test utilities for the solar-datapipes workspace.

pub mod generators;

pub use generators::{regular_timestamps, timestamps_with_gap, ts};
