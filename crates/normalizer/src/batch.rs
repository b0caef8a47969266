//! Stacking per-example arrays into batch tensors.

use pipeline_common::{PipelineError, PipelineResult};
use sources::TimeArray;

/// One source's data stacked across a batch of examples.
///
/// `dims` is the per-example shape with a leading batch axis:
/// `[batch, time, channel, spatial...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchArray {
    pub channels: Vec<String>,
    pub dims: Vec<usize>,
    pub data: Vec<f32>,
}

impl BatchArray {
    /// Number of examples in the batch.
    pub fn len(&self) -> usize {
        self.dims[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values for example `i`.
    pub fn example(&self, i: usize) -> &[f32] {
        let n: usize = self.dims[1..].iter().product();
        &self.data[i * n..(i + 1) * n]
    }
}

/// Stack one source's arrays from N examples into a single tensor.
///
/// Every example must have the same shape and channel labels; a mismatch
/// means the examples were cut with different window settings and cannot be
/// collated.
pub fn stack_arrays(arrays: &[TimeArray]) -> PipelineResult<BatchArray> {
    let first = arrays.first().ok_or_else(|| PipelineError::ShapeMismatch {
        expected: vec![],
        got: vec![],
    })?;

    for arr in &arrays[1..] {
        if arr.dims != first.dims || arr.channels != first.channels {
            return Err(PipelineError::ShapeMismatch {
                expected: first.dims.clone(),
                got: arr.dims.clone(),
            });
        }
    }

    let per_example: usize = first.dims.iter().product();
    let mut data = Vec::with_capacity(arrays.len() * per_example);
    for arr in arrays {
        data.extend_from_slice(&arr.data);
    }

    let mut dims = Vec::with_capacity(first.dims.len() + 1);
    dims.push(arrays.len());
    dims.extend(&first.dims);

    Ok(BatchArray {
        channels: first.channels.clone(),
        dims,
        data,
    })
}
