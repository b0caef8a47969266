//! Per-source sampling metadata.

use chrono::Duration;

use crate::error::{PipelineError, PipelineResult};

/// Static sampling metadata for one data source.
///
/// The history window reaches back from the anchor and the forecast window
/// reaches forward; both must be whole multiples of the sample period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceDescriptor {
    /// Native sampling period of the source.
    pub sample_period: Duration,
    /// Required history duration (input context).
    pub history_duration: Duration,
    /// Required forecast duration (prediction target).
    pub forecast_duration: Duration,
}

impl CadenceDescriptor {
    pub fn new(
        sample_period: Duration,
        history_duration: Duration,
        forecast_duration: Duration,
    ) -> Self {
        Self {
            sample_period,
            history_duration,
            forecast_duration,
        }
    }

    /// Build from the per-source minute values used in configuration files.
    pub fn from_minutes(sample_period: i64, history: i64, forecast: i64) -> Self {
        Self::new(
            Duration::minutes(sample_period),
            Duration::minutes(history),
            Duration::minutes(forecast),
        )
    }

    /// Validate the descriptor, naming the offending source on failure.
    ///
    /// Rejects non-positive sample periods, negative windows, and windows
    /// that are not whole multiples of the sample period.
    pub fn validate(&self, source: &str) -> PipelineResult<()> {
        let step = self.sample_period.num_seconds();
        if step <= 0 {
            return Err(PipelineError::configuration(
                source,
                format!("sample period must be positive, got {}s", step),
            ));
        }
        for (name, window) in [
            ("history", self.history_duration),
            ("forecast", self.forecast_duration),
        ] {
            let secs = window.num_seconds();
            if secs < 0 {
                return Err(PipelineError::configuration(
                    source,
                    format!("{} duration must be non-negative, got {}s", name, secs),
                ));
            }
            if secs % step != 0 {
                return Err(PipelineError::configuration(
                    source,
                    format!(
                        "{} duration ({}s) is not a whole number of sample periods ({}s)",
                        name, secs, step
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Minimum span a contiguous run of samples must cover to hold one example.
    pub fn required_span(&self) -> Duration {
        self.history_duration + self.forecast_duration
    }

    /// Number of history steps behind the anchor (anchor itself excluded).
    pub fn history_steps(&self) -> i64 {
        self.history_duration.num_seconds() / self.sample_period.num_seconds()
    }

    /// Number of forecast steps ahead of the anchor.
    pub fn forecast_steps(&self) -> i64 {
        self.forecast_duration.num_seconds() / self.sample_period.num_seconds()
    }

    /// Gap tolerance when checking contiguity.
    ///
    /// Timestamps closer than one sample period plus 1% are treated as
    /// consecutive, absorbing clock jitter in source stores.
    pub fn gap_tolerance(&self) -> Duration {
        self.sample_period + Duration::seconds(self.sample_period.num_seconds() / 100)
    }
}
