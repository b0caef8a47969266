//! Error types for solar-datapipes.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Primary error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    // === Configuration Errors (fatal at construction) ===
    #[error("invalid configuration for '{key}': {message}")]
    Configuration { key: String, message: String },

    // === Source Errors ===
    #[error("source '{key}' unavailable: {message}")]
    SourceUnavailable { key: String, message: String },

    #[error("failed to read from '{key}': {message}")]
    SourceRead { key: String, message: String },

    // === Alignment Errors (recoverable) ===
    #[error("no valid anchor: joint time periods are empty")]
    NoValidAnchor,

    #[error("missing data in '{key}' at {timestamp}")]
    MissingData {
        key: String,
        timestamp: DateTime<Utc>,
    },

    // === Batching Errors ===
    #[error("shape mismatch when batching: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("no statistics for channel '{channel}' of '{key}'")]
    UnknownChannel { key: String, channel: String },

    #[error("statistics for provider '{provider}' not yet available")]
    ProviderStatsUnavailable { provider: String },

    #[error("unknown NWP provider: {0}")]
    UnknownProvider(String),
}

impl PipelineError {
    /// Create a Configuration error.
    pub fn configuration(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: source.into(),
            message: message.into(),
        }
    }

    /// Create a SourceUnavailable error.
    pub fn source_unavailable(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            key: source.into(),
            message: message.into(),
        }
    }

    /// Create a SourceRead error.
    pub fn source_read(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            key: source.into(),
            message: message.into(),
        }
    }

    /// Create a MissingData error.
    pub fn missing_data(source: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::MissingData {
            key: source.into(),
            timestamp,
        }
    }

    /// Whether the caller may skip the current example/epoch and continue.
    ///
    /// Per-example failures (a gap in one source, an empty joint period set)
    /// never abort the pipeline. Configuration and source-open failures do.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::NoValidAnchor | PipelineError::MissingData { .. }
        )
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::SourceRead {
            key: "io".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_recoverable_classification() {
        let missing =
            PipelineError::missing_data("pv", Utc.with_ymd_and_hms(2022, 1, 1, 8, 0, 0).unwrap());
        assert!(missing.is_recoverable());
        assert!(PipelineError::NoValidAnchor.is_recoverable());

        let config = PipelineError::configuration("nwp", "negative history");
        assert!(!config.is_recoverable());

        let unavailable = PipelineError::source_unavailable("satellite", "store missing");
        assert!(!unavailable.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_source_and_timestamp() {
        let ts = Utc.with_ymd_and_hms(2022, 1, 1, 8, 30, 0).unwrap();
        let err = PipelineError::missing_data("satellite", ts);
        let msg = err.to_string();
        assert!(msg.contains("satellite"));
        assert!(msg.contains("2022-01-01 08:30:00"));
    }
}
