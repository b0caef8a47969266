//! Joint-period intersection across active sources.

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::debug;

use pipeline_common::{
    time::{snap_down, snap_up},
    CadenceDescriptor, SourceKey, TimePeriod,
};

/// One source's contiguous periods together with its cadence.
#[derive(Debug, Clone)]
pub struct SourcePeriods {
    pub periods: Vec<TimePeriod>,
    pub cadence: CadenceDescriptor,
}

impl SourcePeriods {
    pub fn new(periods: Vec<TimePeriod>, cadence: CadenceDescriptor) -> Self {
        Self { periods, cadence }
    }

    /// The anchor timestamps this source can serve.
    ///
    /// A contiguous period only counts between `start + history` and
    /// `end - forecast`; outside that range an anchor would reach past the
    /// period's data.
    fn anchor_periods(&self) -> Vec<TimePeriod> {
        self.periods
            .iter()
            .filter_map(|p| {
                p.reachable_anchors(self.cadence.history_duration, self.cadence.forecast_duration)
            })
            .collect()
    }
}

/// Intersect every source's valid-anchor periods into joint windows.
///
/// The result is expressed on the `reference` cadence grid (callers pass the
/// coarsest sample period among active sources): window bounds are snapped
/// inward so every timestamp in a window is a representable anchor.
///
/// An empty result is a normal value, not an error; it means no instant is
/// covered by all sources and the caller should skip example generation.
/// Intersection is commutative and associative, so iteration order over the
/// map does not affect the output.
pub fn intersect_periods(
    per_source: &BTreeMap<SourceKey, SourcePeriods>,
    reference: Duration,
) -> Vec<TimePeriod> {
    let mut joint: Option<Vec<TimePeriod>> = None;

    for (key, source) in per_source {
        let anchors = source.anchor_periods();
        debug!(source = %key, periods = anchors.len(), "anchor periods");
        joint = Some(match joint {
            None => anchors,
            Some(current) => intersect_sorted(&current, &anchors),
        });
        if joint.as_ref().is_some_and(|j| j.is_empty()) {
            return Vec::new();
        }
    }

    let joint = joint.unwrap_or_default();

    // Snap inward to the reference grid and drop windows that collapse.
    joint
        .into_iter()
        .filter_map(|w| {
            let start = snap_up(w.start, reference);
            let end = snap_down(w.end, reference);
            (start <= end).then_some(TimePeriod::new(start, end))
        })
        .collect()
}

/// Pairwise intersection of two sorted, disjoint period lists.
fn intersect_sorted(a: &[TimePeriod], b: &[TimePeriod]) -> Vec<TimePeriod> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if let Some(overlap) = a[i].intersect(&b[j]) {
            out.push(overlap);
        }
        // Advance whichever period ends first.
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}
