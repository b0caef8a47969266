//! The dataset pipeline: alignment, fetching, normalization, batching.

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::{debug, warn};

use alignment::{
    find_contiguous_periods, intersect_periods, plan_forecast_slice, plan_slice, select_anchor,
    AnchorIter, AnchorMode, SourcePeriods,
};
use normalizer::{normalize_capacity, normalize_zscore, satellite_stats, ChannelStats};
use pipeline_common::{
    CadenceDescriptor, PipelineError, PipelineResult, SourceKey, TimePeriod, Timestamp,
};
use sources::{SourceHandle, TimeArray};

use crate::config::PipelineConfig;
use crate::example::{collate, Batch, Example};
use crate::open::open_sources;

/// Skipped-anchor budget before a batch (or live example) gives up.
const MAX_ATTEMPTS_PER_EXAMPLE: usize = 10;

/// A constructed pipeline over a fixed set of opened sources.
///
/// Training draws reproducible random anchors (the configured seed plus a
/// draw counter), cuts one example per anchor, and collates `batch_size` of
/// them. Anchors that hit a data gap are logged and skipped; they never abort
/// the run.
#[derive(Debug)]
pub struct DatasetPipeline {
    sources: BTreeMap<SourceKey, SourceHandle>,
    cadences: BTreeMap<SourceKey, CadenceDescriptor>,
    nwp_stats: Option<&'static ChannelStats>,
    reference: Duration,
    start_time: Option<Timestamp>,
    end_time: Option<Timestamp>,
    batch_size: usize,
    seed: u64,
    draws: u64,
}

impl DatasetPipeline {
    /// Validate the configuration, open every configured store, and build
    /// the pipeline.
    pub fn new(config: &PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let sources = open_sources(config)?;
        Self::with_sources(config, sources)
    }

    /// Build over already-opened sources (tests, in-memory fixtures).
    pub fn with_sources(
        config: &PipelineConfig,
        sources: BTreeMap<SourceKey, SourceHandle>,
    ) -> PipelineResult<Self> {
        let mut cadences = BTreeMap::new();
        for key in sources.keys() {
            let cadence = config.cadence(*key);
            cadence.validate(key.as_str())?;
            cadences.insert(*key, cadence);
        }

        let reference = cadences
            .values()
            .map(|c| c.sample_period)
            .max()
            .unwrap_or_else(|| Duration::minutes(30));

        let nwp_stats = if sources.contains_key(&SourceKey::Nwp) {
            Some(normalizer::nwp_stats(config.nwp_provider())?)
        } else {
            None
        };

        Ok(Self {
            sources,
            cadences,
            nwp_stats,
            reference,
            start_time: config.start_time,
            end_time: config.end_time,
            batch_size: config.batch_size,
            seed: config.seed,
            draws: 0,
        })
    }

    /// The coarsest sample period among active sources; anchors live on this
    /// grid.
    pub fn reference_cadence(&self) -> Duration {
        self.reference
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Per-source availability, clipped to the configured time bounds.
    async fn availability(&self) -> PipelineResult<BTreeMap<SourceKey, Vec<Timestamp>>> {
        let mut map = BTreeMap::new();
        for (key, handle) in &self.sources {
            let mut times = handle.availability().await?;
            if let Some(start) = self.start_time {
                times.retain(|t| *t >= start);
            }
            if let Some(end) = self.end_time {
                times.retain(|t| *t < end);
            }
            debug!(source = %key, timestamps = times.len(), "collected availability");
            map.insert(*key, times);
        }
        Ok(map)
    }

    fn windows_from(&self, availability: &BTreeMap<SourceKey, Vec<Timestamp>>) -> Vec<TimePeriod> {
        let mut per_source = BTreeMap::new();
        for (key, times) in availability {
            let cadence = self.cadences[key];
            let periods = find_contiguous_periods(times, &cadence);
            per_source.insert(*key, SourcePeriods::new(periods, cadence));
        }
        intersect_periods(&per_source, self.reference)
    }

    /// The joint windows where every active source can serve an anchor.
    pub async fn joint_windows(&self) -> PipelineResult<Vec<TimePeriod>> {
        let availability = self.availability().await?;
        Ok(self.windows_from(&availability))
    }

    /// Every valid anchor in ascending order, for exhaustive validation
    /// splits.
    pub async fn validation_anchors(&self) -> PipelineResult<AnchorIter> {
        Ok(AnchorIter::new(self.joint_windows().await?, self.reference))
    }

    /// Cut the example for one specific anchor.
    pub async fn example_at(&self, anchor: Timestamp) -> PipelineResult<Example> {
        let availability = self.availability().await?;
        self.cut_example(&availability, anchor).await
    }

    /// Produce the next training batch.
    ///
    /// Anchor draws advance the internal counter, so successive calls with
    /// the same seed replay the same sequence of batches.
    pub async fn next_batch(&mut self) -> PipelineResult<Batch> {
        let availability = self.availability().await?;
        let windows = self.windows_from(&availability);

        let mut examples = Vec::with_capacity(self.batch_size);
        let mut attempts = 0usize;
        while examples.len() < self.batch_size {
            if attempts >= self.batch_size * MAX_ATTEMPTS_PER_EXAMPLE {
                warn!(
                    got = examples.len(),
                    want = self.batch_size,
                    "too many skipped anchors for one batch"
                );
                return Err(PipelineError::NoValidAnchor);
            }
            attempts += 1;

            let seed = self.seed.wrapping_add(self.draws);
            self.draws += 1;
            let anchor = select_anchor(&windows, AnchorMode::Random { seed }, self.reference)?;

            match self.cut_example(&availability, anchor).await {
                Ok(example) => examples.push(example),
                Err(e) if e.is_recoverable() => {
                    warn!(anchor = %anchor, error = %e, "skipping anchor");
                }
                Err(e) => return Err(e),
            }
        }
        collate(examples)
    }

    /// Produce one example at the freshest jointly valid anchor.
    ///
    /// When the freshest anchor hits a gap the pipeline steps back one
    /// reference period at a time rather than failing the inference run.
    pub async fn live_example(&self) -> PipelineResult<Example> {
        let availability = self.availability().await?;
        let windows = self.windows_from(&availability);
        let anchors: Vec<Timestamp> = AnchorIter::new(windows, self.reference).collect();

        for anchor in anchors.into_iter().rev().take(MAX_ATTEMPTS_PER_EXAMPLE) {
            match self.cut_example(&availability, anchor).await {
                Ok(example) => return Ok(example),
                Err(e) if e.is_recoverable() => {
                    warn!(anchor = %anchor, error = %e, "anchor unusable, stepping back");
                }
                Err(e) => return Err(e),
            }
        }
        Err(PipelineError::NoValidAnchor)
    }

    /// Plan, fetch, and normalize every source for one anchor. Sources run
    /// concurrently; the first failure wins.
    async fn cut_example(
        &self,
        availability: &BTreeMap<SourceKey, Vec<Timestamp>>,
        anchor: Timestamp,
    ) -> PipelineResult<Example> {
        let fetches = self.sources.iter().map(|(key, handle)| {
            let cadence = self.cadences[key];
            let available = &availability[key];
            async move {
                let array = match handle {
                    SourceHandle::Observation(adapter) => {
                        let request = plan_slice(*key, available, anchor, &cadence)?;
                        let fetch_ts = request.fetch_timestamps();
                        let fetched = adapter.fetch(&fetch_ts).await?;

                        // Map each target back to the step that backs it;
                        // forward-filled targets repeat their neighbour.
                        let positions: BTreeMap<Timestamp, usize> = fetched
                            .timestamps
                            .iter()
                            .enumerate()
                            .map(|(i, t)| (*t, i))
                            .collect();
                        let mut index_of = Vec::with_capacity(request.points.len());
                        for p in &request.points {
                            let idx = positions.get(&p.fetch).copied().ok_or_else(|| {
                                PipelineError::missing_data(key.as_str(), p.fetch)
                            })?;
                            index_of.push(idx);
                        }
                        let targets: Vec<Timestamp> =
                            request.points.iter().map(|p| p.target).collect();
                        let mut array = fetched.gather_steps(&targets, &index_of);
                        self.normalize(*key, adapter.capacities(), &mut array)?;
                        array
                    }
                    SourceHandle::Forecast(adapter) => {
                        let points = plan_forecast_slice(
                            *key,
                            available,
                            anchor,
                            &cadence,
                            adapter.max_lead(),
                        )?;
                        let coords: Vec<_> = points.iter().map(|p| p.coords).collect();
                        let mut array = adapter.fetch(&coords).await?;
                        self.normalize(*key, None, &mut array)?;
                        array
                    }
                };
                Ok::<_, PipelineError>((*key, array))
            }
        });

        let arrays: BTreeMap<SourceKey, TimeArray> = futures::future::try_join_all(fetches)
            .await?
            .into_iter()
            .collect();
        Ok(Example { anchor, arrays })
    }

    fn normalize(
        &self,
        key: SourceKey,
        capacities: Option<&[f32]>,
        array: &mut TimeArray,
    ) -> PipelineResult<()> {
        match key {
            SourceKey::Nwp => {
                // Resolved in with_sources whenever an NWP source is active;
                // skipping normalization here would corrupt batches silently.
                let stats = self.nwp_stats.ok_or_else(|| {
                    PipelineError::configuration(
                        key.as_str(),
                        "normalization statistics were never resolved",
                    )
                })?;
                normalize_zscore(array, key, stats)
            }
            SourceKey::Satellite | SourceKey::HrvSatellite => {
                normalize_zscore(array, key, satellite_stats())
            }
            SourceKey::Gsp | SourceKey::Pv => {
                let caps = capacities.ok_or_else(|| {
                    PipelineError::configuration(
                        key.as_str(),
                        "point source exposes no capacities",
                    )
                })?;
                normalize_capacity(array, key, caps)
            }
        }
    }
}
