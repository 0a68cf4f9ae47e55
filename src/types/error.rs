use thiserror::Error;

use super::MetricKind;

/// bedusage error types
#[derive(Error, Debug)]
pub enum ReportError {
    /// A data source could not be queried
    #[error("source error: {0}")]
    Source(String),

    /// No entity reported any sample for a metric kind
    #[error("no data for metric {kind}")]
    NoData { kind: MetricKind },

    /// Internal consistency check failed
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Lookback window must cover at least one day
    #[error("invalid window: {0} days")]
    InvalidWindow(i64),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Failed to parse a snapshot or argument
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bedusage
pub type Result<T> = std::result::Result<T, ReportError>;
