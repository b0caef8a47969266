//! Pipeline configuration.
//!
//! A modality is active exactly when its section names a zarr path; an empty
//! or absent path disables it. GSP is the primary modality and must always be
//! configured. All validation happens at load time so a bad file fails before
//! any store is opened.

use std::path::Path;

use serde::{Deserialize, Serialize};

use pipeline_common::{
    CadenceDescriptor, PipelineError, PipelineResult, SourceKey, Timestamp,
};

fn default_batch_size() -> usize {
    8
}

/// Provider assumed when the NWP section names none.
const DEFAULT_PROVIDER: &str = "ukv";

/// Top-level pipeline configuration, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input_data: InputData,

    /// Restrict availability to `[start_time, end_time)` before period
    /// finding; either bound may be open. Drives train/test splits.
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub end_time: Option<Timestamp>,

    /// Seed for reproducible anchor sampling.
    #[serde(default)]
    pub seed: u64,

    /// Examples per training batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Per-modality sections, mirroring the source stores on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputData {
    #[serde(default)]
    pub gsp: SourceConfig,
    #[serde(default)]
    pub nwp: SourceConfig,
    #[serde(default)]
    pub satellite: SourceConfig,
    #[serde(default)]
    pub hrvsatellite: SourceConfig,
    #[serde(default)]
    pub pv: SourceConfig,
}

/// One modality's settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the zarr store; empty disables the modality.
    #[serde(default)]
    pub zarr_path: String,
    #[serde(default)]
    pub history_minutes: i64,
    #[serde(default)]
    pub forecast_minutes: i64,
    /// NWP only: which provider's normalization statistics to apply.
    #[serde(default)]
    pub provider: Option<String>,
    /// PV only: drop systems below this capacity before alignment.
    #[serde(default)]
    pub min_capacity_megawatts: Option<f32>,
}

impl SourceConfig {
    pub fn is_enabled(&self) -> bool {
        !self.zarr_path.is_empty()
    }
}

impl InputData {
    pub fn get(&self, key: SourceKey) -> &SourceConfig {
        match key {
            SourceKey::Gsp => &self.gsp,
            SourceKey::Nwp => &self.nwp,
            SourceKey::Satellite => &self.satellite,
            SourceKey::HrvSatellite => &self.hrvsatellite,
            SourceKey::Pv => &self.pv,
        }
    }

    /// Active modalities, in key order.
    pub fn enabled_keys(&self) -> Vec<SourceKey> {
        SourceKey::all()
            .iter()
            .copied()
            .filter(|k| self.get(*k).is_enabled())
            .collect()
    }
}

/// Native sampling period of each modality's store, in minutes.
pub fn native_sample_minutes(key: SourceKey) -> i64 {
    match key {
        SourceKey::Gsp => 30,
        SourceKey::Nwp => 60,
        SourceKey::Satellite | SourceKey::HrvSatellite | SourceKey::Pv => 5,
    }
}

impl PipelineConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_yaml_file(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration("config", format!("{}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| PipelineError::configuration("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The cadence descriptor for one modality, from its configured windows
    /// and the store's native sample period.
    pub fn cadence(&self, key: SourceKey) -> CadenceDescriptor {
        let source = self.input_data.get(key);
        CadenceDescriptor::from_minutes(
            native_sample_minutes(key),
            source.history_minutes,
            source.forecast_minutes,
        )
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !self.input_data.gsp.is_enabled() {
            return Err(PipelineError::configuration(
                "gsp",
                "gsp is the primary modality and must name a zarr path",
            ));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::configuration(
                "config",
                "batch_size must be positive",
            ));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                return Err(PipelineError::configuration(
                    "config",
                    format!("start_time {} is not before end_time {}", start, end),
                ));
            }
        }
        for key in self.input_data.enabled_keys() {
            self.cadence(key).validate(key.as_str())?;
        }
        if self.input_data.nwp.is_enabled() {
            // Resolve the provider now so a typo fails at load, not mid-epoch.
            normalizer::nwp_stats(self.nwp_provider())?;
        }
        Ok(())
    }

    /// Provider whose statistics normalize the NWP channels.
    pub fn nwp_provider(&self) -> &str {
        self.input_data
            .nwp
            .provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_data: InputData::default(),
            start_time: None,
            end_time: None,
            seed: 0,
            batch_size: default_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
input_data:
  gsp:
    zarr_path: /data/gsp.zarr
    history_minutes: 60
    forecast_minutes: 120
  satellite:
    zarr_path: /data/sat.zarr
    history_minutes: 30
seed: 42
batch_size: 4
"#
    }

    #[test]
    fn test_parse_and_validate() {
        let config: PipelineConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.input_data.enabled_keys(),
            vec![SourceKey::Gsp, SourceKey::Satellite]
        );
        assert_eq!(config.seed, 42);
        assert_eq!(config.batch_size, 4);

        let gsp = config.cadence(SourceKey::Gsp);
        assert_eq!(gsp.sample_period, chrono::Duration::minutes(30));
        assert_eq!(gsp.forecast_duration, chrono::Duration::minutes(120));
        // Satellite runs at its native 5-minute period.
        let sat = config.cadence(SourceKey::Satellite);
        assert_eq!(sat.sample_period, chrono::Duration::minutes(5));
        assert_eq!(sat.forecast_duration, chrono::Duration::zero());
    }

    #[test]
    fn test_empty_path_disables_modality() {
        let mut config: PipelineConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.input_data.satellite.zarr_path.clear();
        assert_eq!(config.input_data.enabled_keys(), vec![SourceKey::Gsp]);
    }

    #[test]
    fn test_missing_gsp_is_fatal() {
        let config = PipelineConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_fractional_history_rejected() {
        let mut config: PipelineConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.input_data.gsp.history_minutes = 45;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_defaults_to_ukv() {
        let mut config: PipelineConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.input_data.nwp.zarr_path = "/data/nwp.zarr".to_string();
        config.input_data.nwp.history_minutes = 60;
        assert_eq!(config.nwp_provider(), "ukv");
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_nwp_provider_rejected_at_load() {
        let mut config: PipelineConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.input_data.nwp.zarr_path = "/data/nwp.zarr".to_string();
        config.input_data.nwp.history_minutes = 60;
        config.input_data.nwp.provider = Some("metoffice".to_string());
        assert!(matches!(
            config.validate().unwrap_err(),
            PipelineError::UnknownProvider(_)
        ));
    }

    #[test]
    fn test_inverted_time_bounds_rejected() {
        let mut config: PipelineConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.start_time = "2022-06-01T00:00:00Z".parse().ok();
        config.end_time = "2022-01-01T00:00:00Z".parse().ok();
        assert!(config.validate().is_err());
    }
}
