//! Opening configured stores into a capability-keyed source map.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use pipeline_common::{PipelineResult, SourceKey};
use sources::{SourceHandle, ZarrForecastSource, ZarrObservationSource, ZarrPointSource};

use crate::config::PipelineConfig;

/// Open every configured store.
///
/// A named store that cannot be opened is fatal: the configuration asked for
/// it, so silently continuing without it would change what the pipeline
/// produces.
pub fn open_sources(config: &PipelineConfig) -> PipelineResult<BTreeMap<SourceKey, SourceHandle>> {
    let mut map = BTreeMap::new();
    for key in config.input_data.enabled_keys() {
        let source = config.input_data.get(key);
        let path = Path::new(&source.zarr_path);
        let handle = match key {
            SourceKey::Nwp => {
                SourceHandle::Forecast(Arc::new(ZarrForecastSource::open_path(key, path)?))
            }
            SourceKey::Satellite | SourceKey::HrvSatellite => {
                SourceHandle::Observation(Arc::new(ZarrObservationSource::open_path(key, path)?))
            }
            SourceKey::Gsp | SourceKey::Pv => {
                let min_capacity = source.min_capacity_megawatts.unwrap_or(0.0);
                SourceHandle::Observation(Arc::new(ZarrPointSource::open_path(
                    key,
                    path,
                    min_capacity,
                )?))
            }
        };
        info!(source = %key, path = %source.zarr_path, "opened source");
        map.insert(key, handle);
    }
    Ok(map)
}
