//! On-disk zarr adapter tests: write a small store, open it, fetch slices.

use std::sync::Arc;

use chrono::Duration;
use zarrs_filesystem::FilesystemStore;

use alignment::IssuanceLead;
use pipeline_common::{PipelineError, SourceKey};
use sources::adapter::ObservationAdapter;
use sources::writer::{write_forecast_store, write_observation_store, write_point_store};
use sources::{ForecastAdapter, ZarrForecastSource, ZarrObservationSource, ZarrPointSource};
use test_utils::{regular_timestamps, ts};

fn new_store(dir: &tempfile::TempDir, name: &str) -> Arc<FilesystemStore> {
    let path = dir.path().join(name);
    std::fs::create_dir_all(&path).expect("create store dir");
    Arc::new(FilesystemStore::new(&path).expect("open store"))
}

#[tokio::test]
async fn test_observation_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = new_store(&dir, "sat.zarr");

    let times = regular_timestamps(ts(0, 0), Duration::minutes(5), 4);
    let channels = vec!["IR_016".to_string(), "VIS006".to_string()];
    // dims [4, 2, 2, 2]: value encodes the time index in the tens digit.
    let data: Vec<f32> = (0..4)
        .flat_map(|t| (0..8).map(move |i| (t * 10 + i) as f32))
        .collect();
    write_observation_store(
        store.clone(),
        SourceKey::Satellite,
        &times,
        &channels,
        &[2, 2],
        &data,
    )
    .unwrap();

    let source = ZarrObservationSource::open(SourceKey::Satellite, store).unwrap();
    assert_eq!(source.list_available_timestamps().await.unwrap(), times);

    let fetched = source.fetch(&[times[2], times[3]]).await.unwrap();
    assert_eq!(fetched.dims, vec![2, 2, 2, 2]);
    assert_eq!(fetched.channels, channels);
    assert_eq!(fetched.step(0)[0], 20.0);
    assert_eq!(fetched.step(1)[0], 30.0);
    assert_eq!(fetched.channel_at(1, 1), &[34.0, 35.0, 36.0, 37.0]);
}

#[tokio::test]
async fn test_observation_fetch_unknown_timestamp_is_missing_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = new_store(&dir, "sat.zarr");

    let times = regular_timestamps(ts(0, 0), Duration::minutes(5), 3);
    let channels = vec!["IR_016".to_string()];
    let data = vec![0.0f32; 3];
    write_observation_store(
        store.clone(),
        SourceKey::Satellite,
        &times,
        &channels,
        &[],
        &data,
    )
    .unwrap();

    let source = ZarrObservationSource::open(SourceKey::Satellite, store).unwrap();
    let err = source.fetch(&[ts(4, 0)]).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingData { .. }));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_forecast_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = new_store(&dir, "nwp.zarr");

    let issuances = regular_timestamps(ts(0, 0), Duration::hours(1), 3);
    let leads: Vec<i64> = vec![0, 60, 120];
    let channels = vec!["t".to_string(), "dswrf".to_string()];
    // dims [3, 3, 2]: value encodes (issuance, lead, channel).
    let data: Vec<f32> = (0..3)
        .flat_map(|i| (0..3).flat_map(move |l| (0..2).map(move |c| (i * 100 + l * 10 + c) as f32)))
        .collect();
    write_forecast_store(
        store.clone(),
        SourceKey::Nwp,
        &issuances,
        &leads,
        &channels,
        &[],
        &data,
    )
    .unwrap();

    let source = ZarrForecastSource::open(SourceKey::Nwp, store).unwrap();
    assert_eq!(source.list_issuances().await.unwrap(), issuances);
    assert_eq!(source.max_lead(), Duration::hours(2));

    let coords = vec![
        IssuanceLead {
            issuance: ts(1, 0),
            lead: Duration::hours(0),
        },
        IssuanceLead {
            issuance: ts(1, 0),
            lead: Duration::hours(2),
        },
    ];
    let fetched = source.fetch(&coords).await.unwrap();
    // Valid times replace the issuance/step axes.
    assert_eq!(fetched.timestamps, vec![ts(1, 0), ts(3, 0)]);
    assert_eq!(fetched.dims, vec![2, 2]);
    assert_eq!(fetched.data, vec![100.0, 101.0, 120.0, 121.0]);
}

#[tokio::test]
async fn test_forecast_fetch_unknown_lead_is_missing_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = new_store(&dir, "nwp.zarr");

    let issuances = regular_timestamps(ts(0, 0), Duration::hours(1), 2);
    write_forecast_store(
        store.clone(),
        SourceKey::Nwp,
        &issuances,
        &[0, 60],
        &["t".to_string()],
        &[],
        &vec![0.0f32; 4],
    )
    .unwrap();

    let source = ZarrForecastSource::open(SourceKey::Nwp, store).unwrap();
    let err = source
        .fetch(&[IssuanceLead {
            issuance: ts(1, 0),
            lead: Duration::minutes(90),
        }])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::MissingData { .. }));
}

#[tokio::test]
async fn test_point_store_capacity_filter() {
    let dir = tempfile::tempdir().unwrap();
    let store = new_store(&dir, "pv.zarr");

    let times = regular_timestamps(ts(0, 0), Duration::minutes(5), 3);
    let ids: Vec<String> = vec!["sys1".into(), "sys2".into(), "sys3".into()];
    let capacities = vec![4.0, 0.05, 2.5];
    // Column j of row t holds t*10 + j.
    let data: Vec<f32> = (0..3)
        .flat_map(|t| (0..3).map(move |j| (t * 10 + j) as f32))
        .collect();
    write_point_store(store.clone(), SourceKey::Pv, &times, &ids, &capacities, &data).unwrap();

    // sys2 falls below the 0.1 MW threshold and is dropped.
    let source = ZarrPointSource::open(SourceKey::Pv, store, 0.1).unwrap();
    assert_eq!(source.capacities(), &[4.0, 2.5]);

    let fetched = source.fetch(&[times[1]]).await.unwrap();
    assert_eq!(fetched.channels, vec!["sys1".to_string(), "sys3".to_string()]);
    assert_eq!(fetched.data, vec![10.0, 12.0]);
}

#[tokio::test]
async fn test_point_store_drops_zero_capacity_at_default_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let store = new_store(&dir, "pv.zarr");

    let times = regular_timestamps(ts(0, 0), Duration::minutes(5), 2);
    let ids: Vec<String> = vec!["sys1".into(), "sys2".into()];
    // sys2 reports readings but has no installed capacity to scale against.
    let capacities = vec![4.0, 0.0];
    let data = vec![1.0, 2.0, 3.0, 4.0];
    write_point_store(store.clone(), SourceKey::Pv, &times, &ids, &capacities, &data).unwrap();

    let source = ZarrPointSource::open(SourceKey::Pv, store, 0.0).unwrap();
    assert_eq!(source.capacities(), &[4.0]);

    let fetched = source.fetch(&[times[0]]).await.unwrap();
    assert_eq!(fetched.channels, vec!["sys1".to_string()]);
    assert_eq!(fetched.data, vec![1.0]);
}

#[test]
fn test_point_store_with_only_zero_capacity_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let store = new_store(&dir, "pv.zarr");

    let times = regular_timestamps(ts(0, 0), Duration::minutes(5), 2);
    let ids: Vec<String> = vec!["sys1".into()];
    write_point_store(store.clone(), SourceKey::Pv, &times, &ids, &[0.0], &[1.0, 2.0]).unwrap();

    let err = ZarrPointSource::open(SourceKey::Pv, store, 0.0).unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
}

#[test]
fn test_open_missing_store_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nothing.zarr");
    let err = ZarrObservationSource::open_path(SourceKey::Satellite, &path).unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    assert!(!err.is_recoverable());
}
