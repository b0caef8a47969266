//! Point time-series source: PV systems and grid-operator (GSP) regions.
//!
//! Same store layout as observation stores (`/time` plus `/data`
//! `[time, system]`), with the per-system capacity in the data array's
//! `capacity_megawatts` attribute. Systems at or below a capacity threshold
//! are dropped at open time, before any alignment runs; tiny installations
//! report too noisily to train on, and a zero-capacity system has nothing to
//! normalize against.

use std::sync::Arc;

use async_trait::async_trait;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::storage::ReadableStorageTraits;
use zarrs_filesystem::FilesystemStore;

use pipeline_common::{PipelineError, PipelineResult, SourceKey, Timestamp};

use crate::adapter::ObservationAdapter;
use crate::array::TimeArray;
use crate::zarr::{read_channels, read_time_coordinate, DATA_ARRAY, TIME_ARRAY};

#[derive(Debug)]
pub struct ZarrPointSource<S: ReadableStorageTraits + 'static> {
    key: SourceKey,
    data: Array<S>,
    timestamps: Vec<Timestamp>,
    /// Kept system ids, in store column order.
    system_ids: Vec<String>,
    /// Capacities matching `system_ids`.
    capacities: Vec<f32>,
    /// Store column index of each kept system.
    columns: Vec<usize>,
    /// Total columns in the store (kept or not).
    total_systems: usize,
}

impl ZarrPointSource<FilesystemStore> {
    /// Open a store on the local filesystem.
    pub fn open_path(
        key: SourceKey,
        path: &std::path::Path,
        min_capacity_megawatts: f32,
    ) -> PipelineResult<Self> {
        let store = FilesystemStore::new(path)
            .map_err(|e| PipelineError::source_unavailable(key.as_str(), e.to_string()))?;
        Self::open(key, Arc::new(store), min_capacity_megawatts)
    }
}

impl<S: ReadableStorageTraits + 'static> ZarrPointSource<S> {
    /// Open a point store, dropping systems at or below
    /// `min_capacity_megawatts`. The default threshold of zero still drops
    /// zero-capacity systems, whose readings cannot be capacity-scaled.
    pub fn open(
        key: SourceKey,
        storage: Arc<S>,
        min_capacity_megawatts: f32,
    ) -> PipelineResult<Self> {
        let timestamps = read_time_coordinate(key, storage.clone(), TIME_ARRAY)?;
        let data = Array::open(storage, DATA_ARRAY)
            .map_err(|e| PipelineError::source_unavailable(key.as_str(), e.to_string()))?;
        let all_ids = read_channels(key, &data)?;

        let all_capacities: Vec<f32> = data
            .attributes()
            .get("capacity_megawatts")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            .unwrap_or_default();
        if all_capacities.len() != all_ids.len() {
            return Err(PipelineError::source_unavailable(
                key.as_str(),
                "capacity_megawatts attribute missing or wrong length",
            ));
        }

        let shape = data.shape();
        if shape.len() != 2 || shape[0] as usize != timestamps.len() {
            return Err(PipelineError::source_unavailable(
                key.as_str(),
                format!("point store must be [time, system], got {:?}", shape),
            ));
        }

        let total_systems = all_ids.len();
        let mut system_ids = Vec::new();
        let mut capacities = Vec::new();
        let mut columns = Vec::new();
        for (i, (id, cap)) in all_ids.into_iter().zip(&all_capacities).enumerate() {
            if *cap > min_capacity_megawatts {
                system_ids.push(id);
                capacities.push(*cap);
                columns.push(i);
            }
        }
        let dropped = total_systems - system_ids.len();
        if dropped > 0 {
            tracing::info!(
                source = %key,
                dropped,
                threshold = min_capacity_megawatts,
                "dropped systems at or below capacity threshold"
            );
        }
        if system_ids.is_empty() {
            return Err(PipelineError::source_unavailable(
                key.as_str(),
                format!("no systems above {} MW", min_capacity_megawatts),
            ));
        }

        Ok(Self {
            key,
            data,
            timestamps,
            system_ids,
            capacities,
            columns,
            total_systems,
        })
    }

    /// Capacity of each kept system, aligned with the channel axis.
    pub fn capacities(&self) -> &[f32] {
        &self.capacities
    }

    fn read_row(&self, idx: usize) -> PipelineResult<Vec<f32>> {
        let subset = ArraySubset::new_with_start_shape(
            vec![idx as u64, 0],
            vec![1, self.total_systems as u64],
        )
        .map_err(|e| PipelineError::source_read(self.key.as_str(), e.to_string()))?;
        let row = self
            .data
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| PipelineError::source_read(self.key.as_str(), e.to_string()))?;
        Ok(self.columns.iter().map(|&c| row[c]).collect())
    }
}

#[async_trait]
impl<S: ReadableStorageTraits + 'static> ObservationAdapter for ZarrPointSource<S> {
    fn key(&self) -> SourceKey {
        self.key
    }

    async fn list_available_timestamps(&self) -> PipelineResult<Vec<Timestamp>> {
        Ok(self.timestamps.clone())
    }

    fn capacities(&self) -> Option<&[f32]> {
        Some(&self.capacities)
    }

    async fn fetch(&self, timestamps: &[Timestamp]) -> PipelineResult<TimeArray> {
        let mut data = Vec::with_capacity(timestamps.len() * self.system_ids.len());
        for t in timestamps {
            let idx = self
                .timestamps
                .binary_search(t)
                .map_err(|_| PipelineError::missing_data(self.key.as_str(), *t))?;
            data.extend(self.read_row(idx)?);
        }
        TimeArray::new(
            timestamps.to_vec(),
            self.system_ids.clone(),
            vec![timestamps.len(), self.system_ids.len()],
            data,
        )
    }
}
