//! Writers for the zarr store layouts the adapters read.
//!
//! Used by tests and by tooling that converts raw feeds into aligned stores.
//! Data is written uncompressed in a single chunk per array; these stores are
//! fixtures and staging output, not archival storage.

use std::sync::Arc;

use serde_json::json;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::ReadableWritableStorageTraits;

use pipeline_common::{PipelineError, PipelineResult, SourceKey, Timestamp};

use crate::zarr::{DATA_ARRAY, INIT_TIME_ARRAY, TIME_ARRAY};

/// Write an observation store: `/time` plus `/data` `[time, channel, ...]`.
pub fn write_observation_store<S>(
    storage: Arc<S>,
    key: SourceKey,
    timestamps: &[Timestamp],
    channels: &[String],
    spatial: &[usize],
    data: &[f32],
) -> PipelineResult<()>
where
    S: ReadableWritableStorageTraits + 'static,
{
    write_time_array(storage.clone(), key, TIME_ARRAY, timestamps)?;

    let mut shape = vec![timestamps.len() as u64, channels.len() as u64];
    shape.extend(spatial.iter().map(|&d| d as u64));

    let mut attrs = serde_json::Map::new();
    attrs.insert("source".to_string(), json!(key.as_str()));
    attrs.insert("channels".to_string(), json!(channels));

    write_f32_array(storage, key, DATA_ARRAY, &shape, attrs, data)
}

/// Write a forecast store: `/init_time` plus `/data`
/// `[init_time, step, channel, ...]` with a `lead_minutes` attribute.
pub fn write_forecast_store<S>(
    storage: Arc<S>,
    key: SourceKey,
    issuances: &[Timestamp],
    lead_minutes: &[i64],
    channels: &[String],
    spatial: &[usize],
    data: &[f32],
) -> PipelineResult<()>
where
    S: ReadableWritableStorageTraits + 'static,
{
    write_time_array(storage.clone(), key, INIT_TIME_ARRAY, issuances)?;

    let mut shape = vec![
        issuances.len() as u64,
        lead_minutes.len() as u64,
        channels.len() as u64,
    ];
    shape.extend(spatial.iter().map(|&d| d as u64));

    let mut attrs = serde_json::Map::new();
    attrs.insert("source".to_string(), json!(key.as_str()));
    attrs.insert("channels".to_string(), json!(channels));
    attrs.insert("lead_minutes".to_string(), json!(lead_minutes));

    write_f32_array(storage, key, DATA_ARRAY, &shape, attrs, data)
}

/// Write a point-series store: `/time` plus `/data` `[time, system]` with
/// per-system capacities.
pub fn write_point_store<S>(
    storage: Arc<S>,
    key: SourceKey,
    timestamps: &[Timestamp],
    system_ids: &[String],
    capacity_megawatts: &[f32],
    data: &[f32],
) -> PipelineResult<()>
where
    S: ReadableWritableStorageTraits + 'static,
{
    write_time_array(storage.clone(), key, TIME_ARRAY, timestamps)?;

    let shape = vec![timestamps.len() as u64, system_ids.len() as u64];

    let mut attrs = serde_json::Map::new();
    attrs.insert("source".to_string(), json!(key.as_str()));
    attrs.insert("channels".to_string(), json!(system_ids));
    attrs.insert("capacity_megawatts".to_string(), json!(capacity_megawatts));

    write_f32_array(storage, key, DATA_ARRAY, &shape, attrs, data)
}

fn write_time_array<S>(
    storage: Arc<S>,
    key: SourceKey,
    path: &str,
    timestamps: &[Timestamp],
) -> PipelineResult<()>
where
    S: ReadableWritableStorageTraits + 'static,
{
    let seconds: Vec<i64> = timestamps.iter().map(|t| t.timestamp()).collect();
    let len = seconds.len().max(1) as u64;

    let chunk_grid: zarrs::array::ChunkGrid = vec![len]
        .try_into()
        .map_err(|e| PipelineError::source_read(key.as_str(), format!("{e:?}")))?;
    let array = ArrayBuilder::new(
        vec![seconds.len() as u64],
        DataType::Int64,
        chunk_grid,
        FillValue::from(0i64),
    )
    .build(storage, path)
    .map_err(|e| PipelineError::source_read(key.as_str(), e.to_string()))?;

    store_all(key, &array, &seconds)
}

fn write_f32_array<S>(
    storage: Arc<S>,
    key: SourceKey,
    path: &str,
    shape: &[u64],
    attrs: serde_json::Map<String, serde_json::Value>,
    data: &[f32],
) -> PipelineResult<()>
where
    S: ReadableWritableStorageTraits + 'static,
{
    let expected: u64 = shape.iter().product();
    if data.len() as u64 != expected {
        return Err(PipelineError::source_read(
            key.as_str(),
            format!("expected {} values for shape {:?}, got {}", expected, shape, data.len()),
        ));
    }

    let chunk_shape: Vec<u64> = shape.iter().map(|&d| d.max(1)).collect();
    let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
        .try_into()
        .map_err(|e| PipelineError::source_read(key.as_str(), format!("{e:?}")))?;
    let array = ArrayBuilder::new(
        shape.to_vec(),
        DataType::Float32,
        chunk_grid,
        FillValue::from(f32::NAN),
    )
    .attributes(attrs)
    .build(storage, path)
    .map_err(|e| PipelineError::source_read(key.as_str(), e.to_string()))?;

    store_all(key, &array, data)
}

fn store_all<S, T>(key: SourceKey, array: &Array<S>, data: &[T]) -> PipelineResult<()>
where
    S: ReadableWritableStorageTraits + 'static,
    T: zarrs::array::Element + Copy,
{
    array
        .store_metadata()
        .map_err(|e| PipelineError::source_read(key.as_str(), e.to_string()))?;
    if data.is_empty() {
        return Ok(());
    }
    let subset = ArraySubset::new_with_start_shape(
        vec![0; array.shape().len()],
        array.shape().to_vec(),
    )
    .map_err(|e| PipelineError::source_read(key.as_str(), e.to_string()))?;
    array
        .store_array_subset_elements(&subset, data)
        .map_err(|e| PipelineError::source_read(key.as_str(), e.to_string()))
}
