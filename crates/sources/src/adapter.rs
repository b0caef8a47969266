//! Adapter traits over raw data stores.

use std::sync::Arc;

use async_trait::async_trait;

use alignment::IssuanceLead;
use pipeline_common::{PipelineResult, SourceKey, Timestamp};

use crate::array::TimeArray;

/// A source indexed by a plain observation time axis (satellite imagery,
/// PV/GSP series).
#[async_trait]
pub trait ObservationAdapter: Send + Sync {
    fn key(&self) -> SourceKey;

    /// Every timestamp the store can serve, ascending.
    async fn list_available_timestamps(&self) -> PipelineResult<Vec<Timestamp>>;

    /// Fetch a labeled array for the given timestamps, in order.
    ///
    /// Pure read; a timestamp the store cannot serve is a
    /// [`pipeline_common::PipelineError::MissingData`].
    async fn fetch(&self, timestamps: &[Timestamp]) -> PipelineResult<TimeArray>;

    /// Installed capacity per channel, for point sources whose readings are
    /// normalized by capacity. Gridded sources return `None`.
    fn capacities(&self) -> Option<&[f32]> {
        None
    }
}

/// A source indexed by forecast issuance and lead (NWP grids).
#[async_trait]
pub trait ForecastAdapter: Send + Sync {
    fn key(&self) -> SourceKey;

    /// Every issuance (init) time the store holds, ascending.
    async fn list_issuances(&self) -> PipelineResult<Vec<Timestamp>>;

    /// The longest lead the store carries.
    fn max_lead(&self) -> chrono::Duration;

    /// Fetch one field per (issuance, lead) coordinate, labeled by the
    /// resulting valid times, in order.
    async fn fetch(&self, coords: &[IssuanceLead]) -> PipelineResult<TimeArray>;
}

/// A capability-keyed handle to one opened source.
///
/// The pipeline builds a map of these once at construction; stages iterate
/// over whichever handles exist rather than consulting per-modality flags.
#[derive(Clone)]
pub enum SourceHandle {
    Observation(Arc<dyn ObservationAdapter>),
    Forecast(Arc<dyn ForecastAdapter>),
}

impl SourceHandle {
    pub fn key(&self) -> SourceKey {
        match self {
            SourceHandle::Observation(a) => a.key(),
            SourceHandle::Forecast(a) => a.key(),
        }
    }

    /// The timestamps that drive period finding: observation times for plain
    /// sources, issuance times for forecast models.
    pub async fn availability(&self) -> PipelineResult<Vec<Timestamp>> {
        match self {
            SourceHandle::Observation(a) => a.list_available_timestamps().await,
            SourceHandle::Forecast(a) => a.list_issuances().await,
        }
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceHandle::Observation(a) => write!(f, "SourceHandle::Observation({})", a.key()),
            SourceHandle::Forecast(a) => write!(f, "SourceHandle::Forecast({})", a.key()),
        }
    }
}
