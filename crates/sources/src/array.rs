//! Labeled arrays keyed by time and channel.

use pipeline_common::{PipelineError, PipelineResult, Timestamp};

/// A block of values indexed by time, channel, and optional spatial dims.
///
/// Data is stored row-major in `dims` order with time outermost, the layout
/// zarr stores use, so one time step is a contiguous run of
/// `values_per_step()` floats. Point series are the degenerate case with no
/// spatial dims (channels are system ids).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeArray {
    /// Timestamp labels for the time axis, ascending.
    pub timestamps: Vec<Timestamp>,
    /// Channel labels for the channel axis.
    pub channels: Vec<String>,
    /// Dimension sizes: `[time, channel, spatial...]`.
    pub dims: Vec<usize>,
    /// Values, row-major in `dims` order.
    pub data: Vec<f32>,
}

impl TimeArray {
    /// Build a TimeArray, validating labels against `dims` and `data`.
    pub fn new(
        timestamps: Vec<Timestamp>,
        channels: Vec<String>,
        dims: Vec<usize>,
        data: Vec<f32>,
    ) -> PipelineResult<Self> {
        if dims.len() < 2 {
            return Err(PipelineError::source_read(
                "array",
                format!("need at least time and channel dims, got {:?}", dims),
            ));
        }
        if dims[0] != timestamps.len() || dims[1] != channels.len() {
            return Err(PipelineError::source_read(
                "array",
                format!(
                    "label lengths ({}, {}) do not match dims {:?}",
                    timestamps.len(),
                    channels.len(),
                    dims
                ),
            ));
        }
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(PipelineError::source_read(
                "array",
                format!("expected {} values for dims {:?}, got {}", expected, dims, data.len()),
            ));
        }
        Ok(Self {
            timestamps,
            channels,
            dims,
            data,
        })
    }

    /// Number of values in one time step.
    pub fn values_per_step(&self) -> usize {
        self.dims[1..].iter().product()
    }

    /// Number of values in one channel of one time step.
    pub fn values_per_channel(&self) -> usize {
        self.dims[2..].iter().product()
    }

    /// All values for time index `t`.
    pub fn step(&self, t: usize) -> &[f32] {
        let n = self.values_per_step();
        &self.data[t * n..(t + 1) * n]
    }

    /// All values for channel `c` at time index `t`.
    pub fn channel_at(&self, t: usize, c: usize) -> &[f32] {
        let per_channel = self.values_per_channel();
        let start = t * self.values_per_step() + c * per_channel;
        &self.data[start..start + per_channel]
    }

    /// Mutable view of channel `c` at time index `t`.
    pub fn channel_at_mut(&mut self, t: usize, c: usize) -> &mut [f32] {
        let per_channel = self.values_per_channel();
        let start = t * self.values_per_step() + c * per_channel;
        &mut self.data[start..start + per_channel]
    }

    /// The full dimension sizes, as contributed to a batch.
    pub fn shape(&self) -> &[usize] {
        &self.dims
    }

    /// Reorder/duplicate time steps to match `targets`, where `index_of`
    /// names the position of each target's backing step. Used to materialize
    /// forward-filled slices: a filled target repeats its neighbour's values.
    pub fn gather_steps(&self, targets: &[Timestamp], index_of: &[usize]) -> TimeArray {
        let n = self.values_per_step();
        let mut data = Vec::with_capacity(targets.len() * n);
        for &idx in index_of {
            data.extend_from_slice(self.step(idx));
        }
        let mut dims = self.dims.clone();
        dims[0] = targets.len();
        TimeArray {
            timestamps: targets.to_vec(),
            channels: self.channels.clone(),
            dims,
            data,
        }
    }
}
