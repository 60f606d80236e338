//! error.rs — Error types for scenario generation, engine setup and result sinks
//!
//! All rejections happen up front: constructors validate, `run` never fails.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PsoError {
    /// Engine configuration rejected before any iteration ran
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// One RSSI sample per anchor is required
    #[error("got {measurements} measurements for {anchors} anchors")]
    MeasurementMismatch { anchors: usize, measurements: usize },

    /// Scenario generator rejected its own configuration
    #[error("invalid scenario: {0}")]
    Scenario(String),
}

/// Failure to read or parse `config.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("invalid config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
}

/// Failure to hand a report to a downstream consumer
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("report encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("report delivery failed: {0}")]
    Io(#[from] std::io::Error),
}
