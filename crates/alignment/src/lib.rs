//! Time-period alignment and slice selection.
//!
//! This crate finds where heterogeneous data sources (hourly NWP grids,
//! 5-minute satellite imagery, 30-minute grid-operator series) jointly have
//! enough contiguous data to cut one training or inference example, picks the
//! anchor timestamp (t0) that separates history from forecast, and plans the
//! exact timestamps to fetch from each source.
//!
//! All functions here are pure: state is either immutable cadence metadata or
//! locally scoped, so per-source branches can run concurrently without
//! coordination.

pub mod anchor;
pub mod contiguous;
pub mod intersect;
pub mod nwp;
pub mod slice;

pub use anchor::{select_anchor, AnchorIter, AnchorMode};
pub use contiguous::find_contiguous_periods;
pub use intersect::{intersect_periods, SourcePeriods};
pub use nwp::{plan_forecast_slice, ForecastSlicePoint, IssuanceLead};
pub use slice::{plan_slice, slice_targets, SlicePoint, SliceRequest};
