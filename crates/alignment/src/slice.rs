//! Slice planning: which timestamps to fetch for one example.

use std::collections::BTreeSet;

use pipeline_common::{
    time::timestamps_between, CadenceDescriptor, PipelineError, PipelineResult, SourceKey,
    Timestamp,
};

/// One target timestamp and the available timestamp that supplies its value.
///
/// `fetch` equals `target` when the source has the sample natively; when the
/// sample is missing but a neighbour exists within one sample period before
/// it, `fetch` is that earlier timestamp (forward-fill). Slowly varying
/// fields make repeating the prior value preferable to numeric interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicePoint {
    pub target: Timestamp,
    pub fetch: Timestamp,
}

impl SlicePoint {
    pub fn is_filled(&self) -> bool {
        self.fetch != self.target
    }
}

/// A fully planned fetch for one source at one anchor.
#[derive(Debug, Clone)]
pub struct SliceRequest {
    pub source: SourceKey,
    pub anchor: Timestamp,
    pub points: Vec<SlicePoint>,
}

impl SliceRequest {
    /// The deduplicated timestamps to request from the source adapter,
    /// ascending. Forward-filled points can share a fetch timestamp.
    pub fn fetch_timestamps(&self) -> Vec<Timestamp> {
        let set: BTreeSet<Timestamp> = self.points.iter().map(|p| p.fetch).collect();
        set.into_iter().collect()
    }
}

/// The target timestamps for one example: `anchor - history ..= anchor`
/// followed by `anchor + step ..= anchor + forecast`, at the source's native
/// cadence.
pub fn slice_targets(anchor: Timestamp, cadence: &CadenceDescriptor) -> Vec<Timestamp> {
    let mut targets = timestamps_between(
        anchor - cadence.history_duration,
        anchor,
        cadence.sample_period,
    );
    if cadence.forecast_steps() > 0 {
        targets.extend(timestamps_between(
            anchor + cadence.sample_period,
            anchor + cadence.forecast_duration,
            cadence.sample_period,
        ));
    }
    targets
}

/// Plan a slice against a source's available timestamps.
///
/// Extraction is a pure read: this computes which available timestamp backs
/// each target, applying forward-fill for gaps of at most one sample period.
/// A target with no backing sample within tolerance fails the whole plan with
/// [`PipelineError::MissingData`] naming the source and timestamp; the caller
/// drops that anchor and continues.
pub fn plan_slice(
    source: SourceKey,
    available: &[Timestamp],
    anchor: Timestamp,
    cadence: &CadenceDescriptor,
) -> PipelineResult<SliceRequest> {
    let mut sorted: Vec<Timestamp> = available.to_vec();
    sorted.sort_unstable();

    let mut points = Vec::new();
    for target in slice_targets(anchor, cadence) {
        let fetch = fill_source(&sorted, target, cadence)
            .ok_or_else(|| PipelineError::missing_data(source.as_str(), target))?;
        points.push(SlicePoint { target, fetch });
    }

    Ok(SliceRequest {
        source,
        anchor,
        points,
    })
}

/// The available timestamp backing `target`: the target itself when present,
/// otherwise the closest earlier sample no more than one sample period back.
fn fill_source(
    sorted: &[Timestamp],
    target: Timestamp,
    cadence: &CadenceDescriptor,
) -> Option<Timestamp> {
    let idx = sorted.partition_point(|t| *t <= target);
    if idx == 0 {
        return None;
    }
    let candidate = sorted[idx - 1];
    (target - candidate <= cadence.gap_tolerance()).then_some(candidate)
}
