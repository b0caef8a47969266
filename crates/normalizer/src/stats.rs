//! Per-channel normalization statistics.
//!
//! NWP statistics are keyed by provider. UKV means and standard deviations
//! were computed from MetOffice archives (version 7 and later); GFS values
//! from the NOAA global feed. Satellite statistics were computed over a
//! random 20% sample of 2020 RSS imagery.
//!
//! A provider can be recognized without having statistics yet; that case is
//! reported distinctly from a typo in the provider name so the caller can
//! tell "not supported yet" from "never heard of it".

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use pipeline_common::{PipelineError, PipelineResult};

/// NWP providers the pipeline recognizes. Statistics may lag behind this
/// list; see [`nwp_stats`].
pub const NWP_PROVIDERS: &[&str] = &["ukv", "gfs", "icon-eu", "icon-global", "ecmwf"];

/// Mean and standard deviation for each channel of a source.
#[derive(Debug, Clone)]
pub struct ChannelStats {
    values: BTreeMap<&'static str, (f32, f32)>,
}

impl ChannelStats {
    fn from_pairs(pairs: &[(&'static str, f32, f32)]) -> Self {
        Self {
            values: pairs.iter().map(|&(c, mean, std)| (c, (mean, std))).collect(),
        }
    }

    /// (mean, std) for a channel, if known.
    pub fn get(&self, channel: &str) -> Option<(f32, f32)> {
        self.values.get(channel).copied()
    }

    /// Channel names with statistics, in sorted order.
    pub fn channels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

static UKV_STATS: Lazy<ChannelStats> = Lazy::new(|| {
    ChannelStats::from_pairs(&[
        ("cdcb", 1412.266, 2126.9935),
        ("lcc", 50.083626, 39.332107),
        ("mcc", 40.889845, 41.911446),
        ("hcc", 29.119497, 38.071844),
        ("sde", 0.00289545, 0.1029753),
        ("hcct", -18345.975, 18382.64),
        ("dswrf", 111.28265, 190.47217),
        ("dlwrf", 325.0313, 39.45988),
        ("h", 2096.5199, 1075.7781),
        ("t", 283.64913, 4.388185),
        ("r", 81.7923, 11.450125),
        ("dpt", 280.5438, 4.5725048),
        ("vis", 32262.033, 21578.98),
        ("si10", 6.8834845, 3.9471881),
        ("wdir10", 199.41892, 94.084075),
        ("prmsl", 101321.617, 1252.7179),
        ("prate", 3.4579343e-5, 2.1497e-4),
    ])
});

static GFS_STATS: Lazy<ChannelStats> = Lazy::new(|| {
    ChannelStats::from_pairs(&[
        ("t", 285.77994, 5.017001),
        ("dswrf", 294.6697, 233.18343),
        ("prate", 3.607812e-5, 2.1690701e-4),
        ("dlwrf", 319.0, 46.571),
        ("u", 0.552, 4.165),
        ("v", -0.477, 4.123),
    ])
});

static RSS_STATS: Lazy<ChannelStats> = Lazy::new(|| {
    ChannelStats::from_pairs(&[
        ("HRV", 0.09298719, 0.11405209),
        ("IR_016", 0.17594202, 0.21462157),
        ("IR_039", 0.86167645, 0.04618041),
        ("IR_087", 0.7719318, 0.06687243),
        ("IR_097", 0.8014212, 0.0468558),
        ("IR_108", 0.71254843, 0.17482725),
        ("IR_120", 0.89058584, 0.06115861),
        ("IR_134", 0.944365, 0.04492306),
        ("VIS006", 0.09633306, 0.12184761),
        ("VIS008", 0.11426069, 0.13090034),
        ("WV_062", 0.7359355, 0.16111417),
        ("WV_073", 0.62479186, 0.12924142),
    ])
});

/// Statistics for an NWP provider.
///
/// Recognized providers without published statistics yield
/// `ProviderStatsUnavailable`; anything else yields `UnknownProvider`.
pub fn nwp_stats(provider: &str) -> PipelineResult<&'static ChannelStats> {
    match provider {
        "ukv" => Ok(&UKV_STATS),
        "gfs" => Ok(&GFS_STATS),
        p if NWP_PROVIDERS.contains(&p) => Err(PipelineError::ProviderStatsUnavailable {
            provider: p.to_string(),
        }),
        p => Err(PipelineError::UnknownProvider(p.to_string())),
    }
}

/// Statistics for RSS satellite channels (HRV included).
pub fn satellite_stats() -> &'static ChannelStats {
    &RSS_STATS
}
