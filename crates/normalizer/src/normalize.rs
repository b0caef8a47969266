//! In-place normalization of fetched arrays.
//!
//! Gridded sources (NWP, satellite) use per-channel z-scoring against the
//! published statistics. Point series (PV, GSP) are scaled to the [0, 1]
//! range by dividing each system's readings by its installed capacity.

use pipeline_common::{PipelineError, PipelineResult, SourceKey};
use sources::TimeArray;

use crate::stats::ChannelStats;

/// Z-score every channel: `(x - mean) / std`.
///
/// Every channel present in the array must have statistics; a channel the
/// table does not know is a configuration problem, not something to skip
/// silently.
pub fn normalize_zscore(
    array: &mut TimeArray,
    key: SourceKey,
    stats: &ChannelStats,
) -> PipelineResult<()> {
    let per_channel: Vec<(f32, f32)> = array
        .channels
        .iter()
        .map(|c| {
            stats.get(c).ok_or_else(|| PipelineError::UnknownChannel {
                key: key.as_str().to_string(),
                channel: c.clone(),
            })
        })
        .collect::<PipelineResult<_>>()?;

    for t in 0..array.timestamps.len() {
        for (c, &(mean, std)) in per_channel.iter().enumerate() {
            for v in array.channel_at_mut(t, c) {
                *v = (*v - mean) / std;
            }
        }
    }
    Ok(())
}

/// Divide each system's readings by its capacity in megawatts.
///
/// `capacities` must line up with the array's channel axis (one entry per
/// system, in channel order), and every capacity must be positive; dividing
/// by a zero capacity would let NaN/inf values into the batch.
pub fn normalize_capacity(
    array: &mut TimeArray,
    key: SourceKey,
    capacities: &[f32],
) -> PipelineResult<()> {
    if capacities.len() != array.channels.len() {
        return Err(PipelineError::configuration(
            key.as_str(),
            format!(
                "{} capacities for {} systems",
                capacities.len(),
                array.channels.len()
            ),
        ));
    }
    if let Some(pos) = capacities.iter().position(|c| *c <= 0.0) {
        return Err(PipelineError::configuration(
            key.as_str(),
            format!(
                "system '{}' has non-positive capacity {}",
                array.channels[pos], capacities[pos]
            ),
        ));
    }
    for t in 0..array.timestamps.len() {
        for (c, &cap) in capacities.iter().enumerate() {
            for v in array.channel_at_mut(t, c) {
                *v /= cap;
            }
        }
    }
    Ok(())
}
