//! Forecast-model (NWP) target-time mapping.
//!
//! NWP stores are indexed by issuance (init) time and lead step, not by a
//! plain observation axis. Each target valid time maps to the most recent
//! issuance at or before that target (never later than the anchor, so an
//! example only sees model runs that existed at t0) with the smallest lead
//! that reaches the target. A single skipped run is absorbed by falling back
//! to the previous issuance, mirroring how hourly stores pad a missing cycle.

use chrono::Duration;

use pipeline_common::{CadenceDescriptor, PipelineError, PipelineResult, SourceKey, Timestamp};

use crate::slice::slice_targets;

/// An issuance time plus a lead offset; together they name one valid time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssuanceLead {
    pub issuance: Timestamp,
    pub lead: Duration,
}

impl IssuanceLead {
    pub fn valid_time(&self) -> Timestamp {
        self.issuance + self.lead
    }
}

/// One target valid time and the store coordinates that supply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastSlicePoint {
    pub target: Timestamp,
    pub coords: IssuanceLead,
}

/// Plan a forecast-model slice for one anchor.
///
/// For each target valid time the issuance is the most recent one at or
/// before `min(target, anchor)`, tolerating at most one missing run; the
/// lead is then `target - issuance`. Targets whose lead would exceed
/// `max_lead`, or with no fresh-enough issuance, fail with
/// [`PipelineError::MissingData`] and the caller drops the anchor.
pub fn plan_forecast_slice(
    source: SourceKey,
    issuances: &[Timestamp],
    anchor: Timestamp,
    cadence: &CadenceDescriptor,
    max_lead: Duration,
) -> PipelineResult<Vec<ForecastSlicePoint>> {
    let mut sorted: Vec<Timestamp> = issuances.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut points = Vec::new();
    for target in slice_targets(anchor, cadence) {
        let cutoff = target.min(anchor);
        let issuance = latest_issuance(&sorted, cutoff, cadence)
            .ok_or_else(|| PipelineError::missing_data(source.as_str(), target))?;
        let lead = target - issuance;
        if lead > max_lead {
            return Err(PipelineError::missing_data(source.as_str(), target));
        }
        points.push(ForecastSlicePoint {
            target,
            coords: IssuanceLead { issuance, lead },
        });
    }
    Ok(points)
}

/// The most recent issuance at or before `cutoff`, tolerating a gap of at
/// most one issuance period beyond the nominal cadence.
fn latest_issuance(
    sorted: &[Timestamp],
    cutoff: Timestamp,
    cadence: &CadenceDescriptor,
) -> Option<Timestamp> {
    let idx = sorted.partition_point(|t| *t <= cutoff);
    if idx == 0 {
        return None;
    }
    let candidate = sorted[idx - 1];
    // One skipped run is padded over; anything older is stale.
    let max_age = cadence.sample_period + cadence.gap_tolerance();
    (cutoff - candidate <= max_age).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{regular_timestamps, ts};

    fn hourly_cadence() -> CadenceDescriptor {
        CadenceDescriptor::from_minutes(60, 60, 120)
    }

    #[test]
    fn test_smallest_lead_with_full_issuances() {
        let cadence = hourly_cadence();
        let issuances = regular_timestamps(ts(0, 0), Duration::hours(1), 13);
        let points = plan_forecast_slice(
            SourceKey::Nwp,
            &issuances,
            ts(6, 0),
            &cadence,
            Duration::hours(12),
        )
        .unwrap();

        // Targets 05:00, 06:00, 07:00, 08:00. History targets use their own
        // run at lead zero; forecast targets use the anchor's run.
        assert_eq!(points.len(), 4);
        let coords: Vec<(Timestamp, i64)> = points
            .iter()
            .map(|p| (p.coords.issuance, p.coords.lead.num_hours()))
            .collect();
        assert_eq!(
            coords,
            vec![
                (ts(5, 0), 0),
                (ts(6, 0), 0),
                (ts(6, 0), 1),
                (ts(6, 0), 2),
            ]
        );
        assert!(points.iter().all(|p| p.coords.valid_time() == p.target));
    }

    #[test]
    fn test_issuance_never_later_than_anchor() {
        let cadence = hourly_cadence();
        let issuances = regular_timestamps(ts(0, 0), Duration::hours(1), 13);
        let points = plan_forecast_slice(
            SourceKey::Nwp,
            &issuances,
            ts(6, 0),
            &cadence,
            Duration::hours(12),
        )
        .unwrap();
        assert!(points.iter().all(|p| p.coords.issuance <= ts(6, 0)));
    }

    #[test]
    fn test_missing_run_falls_back_one_cycle() {
        let cadence = hourly_cadence();
        // The 06:00 run never arrived.
        let issuances = vec![ts(3, 0), ts(4, 0), ts(5, 0), ts(7, 0)];
        let points = plan_forecast_slice(
            SourceKey::Nwp,
            &issuances,
            ts(6, 0),
            &cadence,
            Duration::hours(12),
        )
        .unwrap();
        // Everything at or after 06:00 is served by the 05:00 run.
        for p in points.iter().filter(|p| p.target >= ts(6, 0)) {
            assert_eq!(p.coords.issuance, ts(5, 0));
        }
        assert!(points.iter().all(|p| p.coords.valid_time() == p.target));
    }

    #[test]
    fn test_stale_issuance_fails() {
        let cadence = hourly_cadence();
        // Latest run is four hours before the anchor.
        let issuances = vec![ts(1, 0), ts(2, 0)];
        let err = plan_forecast_slice(
            SourceKey::Nwp,
            &issuances,
            ts(6, 0),
            &cadence,
            Duration::hours(12),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingData { .. }));
    }

    #[test]
    fn test_target_beyond_max_lead_fails() {
        let cadence = CadenceDescriptor::from_minutes(60, 0, 480);
        let issuances = vec![ts(6, 0)];
        let err = plan_forecast_slice(
            SourceKey::Nwp,
            &issuances,
            ts(6, 0),
            &cadence,
            Duration::hours(3),
        )
        .unwrap_err();
        match err {
            PipelineError::MissingData { timestamp, .. } => assert_eq!(timestamp, ts(10, 0)),
            other => panic!("expected MissingData, got {other:?}"),
        }
    }

    #[test]
    fn test_no_issuance_before_anchor_fails() {
        let cadence = hourly_cadence();
        let issuances = vec![ts(7, 0), ts(8, 0)];
        let err = plan_forecast_slice(
            SourceKey::Nwp,
            &issuances,
            ts(6, 0),
            &cadence,
            Duration::hours(12),
        )
        .unwrap_err();
        match err {
            PipelineError::MissingData { key, timestamp } => {
                assert_eq!(key, "nwp");
                assert_eq!(timestamp, ts(5, 0));
            }
            other => panic!("expected MissingData, got {other:?}"),
        }
    }
}
