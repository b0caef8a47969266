//! Zarr-backed source adapters.
//!
//! Store layout: a zarr hierarchy with a 1-D `int64` time-coordinate array
//! (unix seconds, ascending) next to a `float32` data array whose outermost
//! dimension is time. Channel labels ride in the data array's attributes.
//!
//! - Observation stores: `/time` + `/data` with dims `[time, channel, ...]`
//!   and attribute `channels`.
//! - Forecast stores: `/init_time` + `/data` with dims
//!   `[init_time, step, channel, ...]` and attributes `channels` and
//!   `lead_minutes` (the lead grid along the step axis).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::storage::ReadableStorageTraits;
use zarrs_filesystem::FilesystemStore;

use alignment::IssuanceLead;
use pipeline_common::{PipelineError, PipelineResult, SourceKey, Timestamp};

use crate::adapter::{ForecastAdapter, ObservationAdapter};
use crate::array::TimeArray;

/// Name of the time-coordinate array in observation stores.
pub const TIME_ARRAY: &str = "/time";
/// Name of the issuance-coordinate array in forecast stores.
pub const INIT_TIME_ARRAY: &str = "/init_time";
/// Name of the data array in both layouts.
pub const DATA_ARRAY: &str = "/data";

/// Observation store: satellite imagery or any source on a plain time axis.
#[derive(Debug)]
pub struct ZarrObservationSource<S: ReadableStorageTraits + 'static> {
    key: SourceKey,
    data: Array<S>,
    timestamps: Vec<Timestamp>,
    channels: Vec<String>,
}

impl ZarrObservationSource<FilesystemStore> {
    /// Open a store on the local filesystem.
    pub fn open_path(key: SourceKey, path: &std::path::Path) -> PipelineResult<Self> {
        let store = FilesystemStore::new(path)
            .map_err(|e| PipelineError::source_unavailable(key.as_str(), e.to_string()))?;
        Self::open(key, Arc::new(store))
    }
}

impl<S: ReadableStorageTraits + 'static> ZarrObservationSource<S> {
    /// Open an observation store from a storage backend.
    pub fn open(key: SourceKey, storage: Arc<S>) -> PipelineResult<Self> {
        let timestamps = read_time_coordinate(key, storage.clone(), TIME_ARRAY)?;
        let data = Array::open(storage, DATA_ARRAY)
            .map_err(|e| PipelineError::source_unavailable(key.as_str(), e.to_string()))?;
        let channels = read_channels(key, &data)?;

        let shape = data.shape();
        if shape.len() < 2 {
            return Err(PipelineError::source_unavailable(
                key.as_str(),
                format!("data array must have time and channel dims, got {:?}", shape),
            ));
        }
        if shape[0] as usize != timestamps.len() || shape[1] as usize != channels.len() {
            return Err(PipelineError::source_unavailable(
                key.as_str(),
                format!(
                    "coordinate lengths ({}, {}) disagree with data shape {:?}",
                    timestamps.len(),
                    channels.len(),
                    shape
                ),
            ));
        }

        Ok(Self {
            key,
            data,
            timestamps,
            channels,
        })
    }

    fn time_index(&self, t: &Timestamp) -> PipelineResult<usize> {
        self.timestamps
            .binary_search(t)
            .map_err(|_| PipelineError::missing_data(self.key.as_str(), *t))
    }

    fn read_step(&self, idx: usize) -> PipelineResult<Vec<f32>> {
        let shape = self.data.shape();
        let mut start = vec![0u64; shape.len()];
        start[0] = idx as u64;
        let mut step_shape = shape.to_vec();
        step_shape[0] = 1;
        let subset = ArraySubset::new_with_start_shape(start, step_shape)
            .map_err(|e| PipelineError::source_read(self.key.as_str(), e.to_string()))?;
        self.data
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| PipelineError::source_read(self.key.as_str(), e.to_string()))
    }
}

#[async_trait]
impl<S: ReadableStorageTraits + 'static> ObservationAdapter for ZarrObservationSource<S> {
    fn key(&self) -> SourceKey {
        self.key
    }

    async fn list_available_timestamps(&self) -> PipelineResult<Vec<Timestamp>> {
        Ok(self.timestamps.clone())
    }

    async fn fetch(&self, timestamps: &[Timestamp]) -> PipelineResult<TimeArray> {
        let mut data = Vec::new();
        for t in timestamps {
            let idx = self.time_index(t)?;
            data.extend(self.read_step(idx)?);
        }
        let mut dims: Vec<usize> = self.data.shape().iter().map(|&d| d as usize).collect();
        dims[0] = timestamps.len();
        TimeArray::new(timestamps.to_vec(), self.channels.clone(), dims, data)
    }
}

/// Forecast store: NWP grids on an issuance/lead axis.
pub struct ZarrForecastSource<S: ReadableStorageTraits + 'static> {
    key: SourceKey,
    data: Array<S>,
    issuances: Vec<Timestamp>,
    lead_minutes: Vec<i64>,
    channels: Vec<String>,
}

impl ZarrForecastSource<FilesystemStore> {
    /// Open a store on the local filesystem.
    pub fn open_path(key: SourceKey, path: &std::path::Path) -> PipelineResult<Self> {
        let store = FilesystemStore::new(path)
            .map_err(|e| PipelineError::source_unavailable(key.as_str(), e.to_string()))?;
        Self::open(key, Arc::new(store))
    }
}

impl<S: ReadableStorageTraits + 'static> ZarrForecastSource<S> {
    /// Open a forecast store from a storage backend.
    pub fn open(key: SourceKey, storage: Arc<S>) -> PipelineResult<Self> {
        let issuances = read_time_coordinate(key, storage.clone(), INIT_TIME_ARRAY)?;
        let data = Array::open(storage, DATA_ARRAY)
            .map_err(|e| PipelineError::source_unavailable(key.as_str(), e.to_string()))?;
        let channels = read_channels(key, &data)?;

        let lead_minutes: Vec<i64> = data
            .attributes()
            .get("lead_minutes")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default();
        if lead_minutes.is_empty() {
            return Err(PipelineError::source_unavailable(
                key.as_str(),
                "data array missing 'lead_minutes' attribute",
            ));
        }

        let shape = data.shape();
        if shape.len() < 3
            || shape[0] as usize != issuances.len()
            || shape[1] as usize != lead_minutes.len()
            || shape[2] as usize != channels.len()
        {
            return Err(PipelineError::source_unavailable(
                key.as_str(),
                format!(
                    "coordinate lengths ({}, {}, {}) disagree with data shape {:?}",
                    issuances.len(),
                    lead_minutes.len(),
                    channels.len(),
                    shape
                ),
            ));
        }

        Ok(Self {
            key,
            data,
            issuances,
            lead_minutes,
            channels,
        })
    }

    fn read_field(&self, coords: &IssuanceLead) -> PipelineResult<Vec<f32>> {
        let issuance_idx = self
            .issuances
            .binary_search(&coords.issuance)
            .map_err(|_| PipelineError::missing_data(self.key.as_str(), coords.valid_time()))?;
        let lead_idx = self
            .lead_minutes
            .binary_search(&coords.lead.num_minutes())
            .map_err(|_| PipelineError::missing_data(self.key.as_str(), coords.valid_time()))?;

        let shape = self.data.shape();
        let mut start = vec![0u64; shape.len()];
        start[0] = issuance_idx as u64;
        start[1] = lead_idx as u64;
        let mut field_shape = shape.to_vec();
        field_shape[0] = 1;
        field_shape[1] = 1;
        let subset = ArraySubset::new_with_start_shape(start, field_shape)
            .map_err(|e| PipelineError::source_read(self.key.as_str(), e.to_string()))?;
        self.data
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| PipelineError::source_read(self.key.as_str(), e.to_string()))
    }
}

#[async_trait]
impl<S: ReadableStorageTraits + 'static> ForecastAdapter for ZarrForecastSource<S> {
    fn key(&self) -> SourceKey {
        self.key
    }

    async fn list_issuances(&self) -> PipelineResult<Vec<Timestamp>> {
        Ok(self.issuances.clone())
    }

    fn max_lead(&self) -> Duration {
        Duration::minutes(self.lead_minutes.last().copied().unwrap_or(0))
    }

    async fn fetch(&self, coords: &[IssuanceLead]) -> PipelineResult<TimeArray> {
        let mut data = Vec::new();
        let mut valid_times = Vec::with_capacity(coords.len());
        for c in coords {
            data.extend(self.read_field(c)?);
            valid_times.push(c.valid_time());
        }
        let shape = self.data.shape();
        // Valid time replaces the issuance and step axes.
        let mut dims: Vec<usize> = Vec::with_capacity(shape.len() - 1);
        dims.push(coords.len());
        dims.extend(shape[2..].iter().map(|&d| d as usize));
        TimeArray::new(valid_times, self.channels.clone(), dims, data)
    }
}

/// Read a 1-D int64 unix-seconds coordinate array.
pub(crate) fn read_time_coordinate<S: ReadableStorageTraits + 'static>(
    key: SourceKey,
    storage: Arc<S>,
    path: &str,
) -> PipelineResult<Vec<Timestamp>> {
    let array = Array::open(storage, path)
        .map_err(|e| PipelineError::source_unavailable(key.as_str(), e.to_string()))?;
    let shape = array.shape();
    if shape.len() != 1 {
        return Err(PipelineError::source_unavailable(
            key.as_str(),
            format!("time coordinate must be 1-D, got {:?}", shape),
        ));
    }
    let subset = ArraySubset::new_with_start_shape(vec![0], shape.to_vec())
        .map_err(|e| PipelineError::source_read(key.as_str(), e.to_string()))?;
    let seconds = array
        .retrieve_array_subset_elements::<i64>(&subset)
        .map_err(|e| PipelineError::source_read(key.as_str(), e.to_string()))?;

    let timestamps: Vec<Timestamp> = seconds
        .iter()
        .filter_map(|&s| DateTime::<Utc>::from_timestamp(s, 0))
        .collect();
    if timestamps.len() != seconds.len() {
        return Err(PipelineError::source_unavailable(
            key.as_str(),
            "time coordinate holds out-of-range values",
        ));
    }
    Ok(timestamps)
}

/// Read channel labels from the data array's attributes.
pub(crate) fn read_channels<S: ReadableStorageTraits + 'static>(
    key: SourceKey,
    data: &Array<S>,
) -> PipelineResult<Vec<String>> {
    data.attributes()
        .get("channels")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        })
        .filter(|c: &Vec<String>| !c.is_empty())
        .ok_or_else(|| {
            PipelineError::source_unavailable(
                key.as_str(),
                "data array missing 'channels' attribute",
            )
        })
}
