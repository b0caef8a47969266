//! In-memory adapters for tests and fixtures.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Duration;

use alignment::IssuanceLead;
use pipeline_common::{PipelineError, PipelineResult, SourceKey, Timestamp};

use crate::adapter::{ForecastAdapter, ObservationAdapter};
use crate::array::TimeArray;

/// Observation source backed by a map from timestamp to one step of values.
#[derive(Debug, Clone)]
pub struct InMemoryObservationSource {
    key: SourceKey,
    channels: Vec<String>,
    /// Spatial dims after time and channel; empty for point series.
    spatial: Vec<usize>,
    steps: BTreeMap<Timestamp, Vec<f32>>,
    capacities: Option<Vec<f32>>,
}

impl InMemoryObservationSource {
    pub fn new(
        key: SourceKey,
        channels: Vec<String>,
        spatial: Vec<usize>,
        steps: BTreeMap<Timestamp, Vec<f32>>,
    ) -> Self {
        Self {
            key,
            channels,
            spatial,
            steps,
            capacities: None,
        }
    }

    /// Attach per-channel capacities, making this behave like a point store.
    pub fn with_capacities(mut self, capacities: Vec<f32>) -> Self {
        self.capacities = Some(capacities);
        self
    }

    /// A source where every step holds `value` in every cell; handy when a
    /// test only cares about availability.
    pub fn constant(
        key: SourceKey,
        channels: Vec<String>,
        spatial: Vec<usize>,
        timestamps: &[Timestamp],
        value: f32,
    ) -> Self {
        let per_step: usize = channels.len() * spatial.iter().product::<usize>().max(1);
        let steps = timestamps
            .iter()
            .map(|&t| (t, vec![value; per_step]))
            .collect();
        Self::new(key, channels, spatial, steps)
    }

    fn dims(&self, num_steps: usize) -> Vec<usize> {
        let mut dims = vec![num_steps, self.channels.len()];
        dims.extend(&self.spatial);
        dims
    }
}

#[async_trait]
impl ObservationAdapter for InMemoryObservationSource {
    fn key(&self) -> SourceKey {
        self.key
    }

    async fn list_available_timestamps(&self) -> PipelineResult<Vec<Timestamp>> {
        Ok(self.steps.keys().copied().collect())
    }

    fn capacities(&self) -> Option<&[f32]> {
        self.capacities.as_deref()
    }

    async fn fetch(&self, timestamps: &[Timestamp]) -> PipelineResult<TimeArray> {
        let mut data = Vec::new();
        for t in timestamps {
            let step = self
                .steps
                .get(t)
                .ok_or_else(|| PipelineError::missing_data(self.key.as_str(), *t))?;
            data.extend_from_slice(step);
        }
        TimeArray::new(
            timestamps.to_vec(),
            self.channels.clone(),
            self.dims(timestamps.len()),
            data,
        )
    }
}

/// Forecast source backed by a map from (issuance, lead minutes) to a step.
#[derive(Debug, Clone)]
pub struct InMemoryForecastSource {
    key: SourceKey,
    channels: Vec<String>,
    spatial: Vec<usize>,
    max_lead: Duration,
    fields: BTreeMap<(Timestamp, i64), Vec<f32>>,
}

impl InMemoryForecastSource {
    pub fn new(
        key: SourceKey,
        channels: Vec<String>,
        spatial: Vec<usize>,
        max_lead: Duration,
        fields: BTreeMap<(Timestamp, i64), Vec<f32>>,
    ) -> Self {
        Self {
            key,
            channels,
            spatial,
            max_lead,
            fields,
        }
    }

    /// A source with every lead of every issuance populated with `value`.
    pub fn constant(
        key: SourceKey,
        channels: Vec<String>,
        spatial: Vec<usize>,
        issuances: &[Timestamp],
        lead_step: Duration,
        max_lead: Duration,
        value: f32,
    ) -> Self {
        let per_step: usize = channels.len() * spatial.iter().product::<usize>().max(1);
        let mut fields = BTreeMap::new();
        for &issuance in issuances {
            let mut lead = Duration::zero();
            while lead <= max_lead {
                fields.insert((issuance, lead.num_minutes()), vec![value; per_step]);
                lead = lead + lead_step;
            }
        }
        Self::new(key, channels, spatial, max_lead, fields)
    }
}

#[async_trait]
impl ForecastAdapter for InMemoryForecastSource {
    fn key(&self) -> SourceKey {
        self.key
    }

    async fn list_issuances(&self) -> PipelineResult<Vec<Timestamp>> {
        let set: std::collections::BTreeSet<Timestamp> =
            self.fields.keys().map(|(t, _)| *t).collect();
        Ok(set.into_iter().collect())
    }

    fn max_lead(&self) -> Duration {
        self.max_lead
    }

    async fn fetch(&self, coords: &[IssuanceLead]) -> PipelineResult<TimeArray> {
        let mut data = Vec::new();
        let mut valid_times = Vec::with_capacity(coords.len());
        for c in coords {
            let step = self
                .fields
                .get(&(c.issuance, c.lead.num_minutes()))
                .ok_or_else(|| PipelineError::missing_data(self.key.as_str(), c.valid_time()))?;
            data.extend_from_slice(step);
            valid_times.push(c.valid_time());
        }
        let mut dims = vec![coords.len(), self.channels.len()];
        dims.extend(&self.spatial);
        TimeArray::new(valid_times, self.channels.clone(), dims, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{regular_timestamps, ts};

    #[tokio::test]
    async fn test_observation_fetch_preserves_order() {
        let times = regular_timestamps(ts(0, 0), Duration::minutes(5), 4);
        let steps: BTreeMap<_, _> = times
            .iter()
            .enumerate()
            .map(|(i, &t)| (t, vec![i as f32]))
            .collect();
        let source =
            InMemoryObservationSource::new(SourceKey::Pv, vec!["sys1".into()], vec![], steps);

        let got = source.fetch(&[times[2], times[0]]).await.unwrap();
        assert_eq!(got.data, vec![2.0, 0.0]);
        assert_eq!(got.dims, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_observation_fetch_missing_timestamp() {
        let source = InMemoryObservationSource::constant(
            SourceKey::Satellite,
            vec!["IR_016".into()],
            vec![2, 2],
            &regular_timestamps(ts(0, 0), Duration::minutes(5), 3),
            1.0,
        );
        let err = source.fetch(&[ts(6, 0)]).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingData { .. }));
    }

    #[tokio::test]
    async fn test_forecast_fetch_labels_valid_times() {
        let issuances = regular_timestamps(ts(0, 0), Duration::hours(1), 3);
        let source = InMemoryForecastSource::constant(
            SourceKey::Nwp,
            vec!["t".into()],
            vec![],
            &issuances,
            Duration::hours(1),
            Duration::hours(4),
            7.0,
        );
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
        let got = source.fetch(&coords).await.unwrap();
        assert_eq!(got.timestamps, vec![ts(1, 0), ts(3, 0)]);
        assert_eq!(got.data, vec![7.0, 7.0]);
    }
}
