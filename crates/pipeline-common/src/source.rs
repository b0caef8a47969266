//! Data modality identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one data modality in the pipeline.
///
/// Which modalities are active is decided once at construction by which
/// sources the configuration names; downstream stages iterate over whatever
/// keys are present instead of branching on per-modality flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKey {
    /// Grid-operator (GSP) demand/generation data, 30-minute cadence.
    Gsp,
    /// Numerical weather prediction grids, hourly issuance.
    Nwp,
    /// Non-HRV satellite imagery, 5-minute cadence.
    Satellite,
    /// High-resolution visible satellite imagery, 5-minute cadence.
    HrvSatellite,
    /// PV system generation time series, 5-minute cadence.
    Pv,
}

impl SourceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::Gsp => "gsp",
            SourceKey::Nwp => "nwp",
            SourceKey::Satellite => "satellite",
            SourceKey::HrvSatellite => "hrvsatellite",
            SourceKey::Pv => "pv",
        }
    }

    /// Whether slices from this source follow the issuance/lead axis of a
    /// forecast model rather than a plain observation time axis.
    pub fn is_forecast_model(&self) -> bool {
        matches!(self, SourceKey::Nwp)
    }

    pub fn all() -> &'static [SourceKey] {
        &[
            SourceKey::Gsp,
            SourceKey::Nwp,
            SourceKey::Satellite,
            SourceKey::HrvSatellite,
            SourceKey::Pv,
        ]
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_config_names() {
        assert_eq!(SourceKey::Gsp.to_string(), "gsp");
        assert_eq!(SourceKey::HrvSatellite.to_string(), "hrvsatellite");
    }

    #[test]
    fn test_only_nwp_uses_issuance_axis() {
        for key in SourceKey::all() {
            assert_eq!(key.is_forecast_model(), *key == SourceKey::Nwp);
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&SourceKey::Satellite).unwrap();
        assert_eq!(json, "\"satellite\"");
        let back: SourceKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SourceKey::Satellite);
    }
}
