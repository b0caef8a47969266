//! End-to-end alignment tests: availability in, planned slices out.

use std::collections::BTreeMap;

use chrono::Duration;

use alignment::{
    find_contiguous_periods, intersect::SourcePeriods, intersect_periods, plan_slice,
    select_anchor, AnchorIter, AnchorMode,
};
use pipeline_common::{CadenceDescriptor, PipelineError, SourceKey, TimePeriod};
use test_utils::{regular_timestamps, timestamps_with_gap, ts};

/// Run the whole alignment chain for a set of sources and return the joint
/// windows plus the reference cadence (the coarsest sample period).
fn align(
    sources: &BTreeMap<SourceKey, (Vec<chrono::DateTime<chrono::Utc>>, CadenceDescriptor)>,
) -> (Vec<TimePeriod>, Duration) {
    let reference = sources
        .values()
        .map(|(_, c)| c.sample_period)
        .max()
        .unwrap_or_else(|| Duration::minutes(30));

    let per_source: BTreeMap<SourceKey, SourcePeriods> = sources
        .iter()
        .map(|(key, (available, cadence))| {
            let periods = find_contiguous_periods(available, cadence);
            (*key, SourcePeriods::new(periods, *cadence))
        })
        .collect();

    (intersect_periods(&per_source, reference), reference)
}

#[test]
fn test_five_minute_and_thirty_minute_sources() {
    // Source A at 5-minute cadence 00:00-01:00, source B at 30-minute cadence
    // 00:00-02:00; both need 30 minutes of history, no forecast.
    let mut sources = BTreeMap::new();
    sources.insert(
        SourceKey::Satellite,
        (
            regular_timestamps(ts(0, 0), Duration::minutes(5), 13),
            CadenceDescriptor::from_minutes(5, 30, 0),
        ),
    );
    sources.insert(
        SourceKey::Gsp,
        (
            regular_timestamps(ts(0, 0), Duration::minutes(30), 5),
            CadenceDescriptor::from_minutes(30, 30, 0),
        ),
    );

    let (windows, reference) = align(&sources);
    assert_eq!(windows, vec![TimePeriod::new(ts(0, 30), ts(1, 0))]);

    let freshest = select_anchor(&windows, AnchorMode::MostRecent, reference).unwrap();
    assert_eq!(freshest, ts(1, 0));
}

#[test]
fn test_full_pipeline_is_reproducible() {
    let mut sources = BTreeMap::new();
    sources.insert(
        SourceKey::Pv,
        (
            regular_timestamps(ts(0, 0), Duration::minutes(5), 73),
            CadenceDescriptor::from_minutes(5, 60, 0),
        ),
    );
    sources.insert(
        SourceKey::Gsp,
        (
            regular_timestamps(ts(0, 0), Duration::minutes(30), 13),
            CadenceDescriptor::from_minutes(30, 60, 120),
        ),
    );

    let mut runs = Vec::new();
    for _ in 0..2 {
        let (windows, reference) = align(&sources);
        let anchor = select_anchor(&windows, AnchorMode::Random { seed: 42 }, reference).unwrap();
        let (pv_avail, pv_cadence) = &sources[&SourceKey::Pv];
        let request = plan_slice(SourceKey::Pv, pv_avail, anchor, pv_cadence).unwrap();
        runs.push((windows, anchor, request.fetch_timestamps()));
    }
    assert_eq!(runs[0], runs[1]);
}

#[test]
fn test_missing_data_excludes_anchor_without_crash() {
    let cadence = CadenceDescriptor::from_minutes(30, 90, 0);
    // Two consecutive samples missing around 02:00 leave a hole wider than
    // one sample period, but the tails are each long enough on their own.
    let available = timestamps_with_gap(ts(0, 0), Duration::minutes(30), 13, &[4, 5]);

    let mut sources = BTreeMap::new();
    sources.insert(SourceKey::Gsp, (available.clone(), cadence));
    let (windows, reference) = align(&sources);
    assert_eq!(windows.len(), 2);

    // Every enumerated anchor must either plan cleanly or raise MissingData;
    // the failing ones are dropped, the rest carry on.
    let mut planned = 0usize;
    let mut dropped = 0usize;
    for anchor in AnchorIter::new(windows.clone(), reference) {
        match plan_slice(SourceKey::Gsp, &available, anchor, &cadence) {
            Ok(_) => planned += 1,
            Err(PipelineError::MissingData { .. }) => dropped += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert!(planned > 0);
    // Anchors inside the windows all have contiguous backing data.
    assert_eq!(dropped, 0);

    // An anchor forced next to the hole does raise MissingData.
    let err = plan_slice(SourceKey::Gsp, &available, ts(3, 0), &cadence).unwrap_err();
    assert!(matches!(err, PipelineError::MissingData { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_enumerate_all_spans_disjoint_windows_in_order() {
    let cadence = CadenceDescriptor::from_minutes(30, 60, 0);
    let mut available = regular_timestamps(ts(0, 0), Duration::minutes(30), 5);
    available.extend(regular_timestamps(ts(6, 0), Duration::minutes(30), 5));

    let mut sources = BTreeMap::new();
    sources.insert(SourceKey::Gsp, (available, cadence));
    let (windows, reference) = align(&sources);
    assert_eq!(windows.len(), 2);

    let anchors: Vec<_> = AnchorIter::new(windows.clone(), reference).collect();
    assert_eq!(
        anchors,
        vec![ts(1, 0), ts(1, 30), ts(2, 0), ts(7, 0), ts(7, 30), ts(8, 0)]
    );
    for anchor in &anchors {
        assert!(windows.iter().any(|w| w.contains(anchor)));
    }
}

#[test]
fn test_empty_availability_flows_to_no_valid_anchor() {
    let mut sources = BTreeMap::new();
    sources.insert(
        SourceKey::Gsp,
        (Vec::new(), CadenceDescriptor::from_minutes(30, 30, 0)),
    );
    let (windows, reference) = align(&sources);
    assert!(windows.is_empty());

    let err = select_anchor(&windows, AnchorMode::Random { seed: 1 }, reference).unwrap_err();
    assert!(matches!(err, PipelineError::NoValidAnchor));
}
