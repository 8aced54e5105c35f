//! Error types for big-switch.

use thiserror::Error;

/// Result type alias for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for release-manager calls.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Errors raised while loading or validating `big-switch.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required field: {0}")]
    Missing(&'static str),

    #[error("invalid duration for {field}: {value:?}")]
    Duration { field: String, value: String },

    #[error("invalid service entry {index}: {reason}")]
    Service { index: usize, reason: String },

    #[error("invalid restart_cron {value:?}: {reason}")]
    Cron { value: String, reason: String },
}

/// Errors raised by the release-manager adapters.
///
/// The watcher treats every variant as transient; the pipeline treats every
/// variant as a failed promotion.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("invalid release manager url: {0}")]
    InvalidUrl(String),

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}
