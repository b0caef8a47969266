//! Contiguous-period discovery over a source's available timestamps.

use pipeline_common::{CadenceDescriptor, TimePeriod, Timestamp};

/// Find the maximal contiguous periods long enough to hold one example.
///
/// Walks the available timestamps in ascending order and starts a new period
/// whenever the gap to the previous timestamp exceeds the cadence's gap
/// tolerance (one sample period plus 1% jitter allowance). Periods shorter
/// than `history + forecast` are discarded since no anchor fits inside them.
///
/// A source with no timestamps yields an empty vector, not an error. Output
/// periods are disjoint and sorted ascending by start.
pub fn find_contiguous_periods(
    available: &[Timestamp],
    cadence: &CadenceDescriptor,
) -> Vec<TimePeriod> {
    if available.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<Timestamp> = available.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let tolerance = cadence.gap_tolerance();
    let min_span = cadence.required_span();

    let mut periods = Vec::new();
    let mut start = sorted[0];
    let mut prev = sorted[0];

    for &t in &sorted[1..] {
        if t - prev > tolerance {
            if prev - start >= min_span {
                periods.push(TimePeriod::new(start, prev));
            }
            start = t;
        }
        prev = t;
    }
    if prev - start >= min_span {
        periods.push(TimePeriod::new(start, prev));
    }

    periods
}
