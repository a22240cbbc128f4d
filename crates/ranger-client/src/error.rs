//! Error types for the client core.

use std::path::PathBuf;

/// Errors returned by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The shard locator could not resolve a key.
    #[error("locate error: {0}")]
    Locate(#[from] ranger_locate::LocateError),

    /// The transport failed to deliver a request or its response.
    #[error("network error: {0}")]
    Net(#[from] ranger_net::NetError),

    /// `put` was called with an empty value.
    #[error("empty value is not supported")]
    EmptyValue,

    /// The requested scan limit is above the configured maximum.
    #[error("scan limit {limit} exceeds the maximum of {max}")]
    ScanLimitExceeded {
        /// Requested limit.
        limit: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The end key of a range sorts before its start key.
    #[error("invalid range: end key {end:?} is before start key {start:?}")]
    InvalidRange {
        /// Requested start key.
        start: Vec<u8>,
        /// Requested end key.
        end: Vec<u8>,
    },

    /// Shard-ownership errors kept recurring until the retry budget ran out.
    #[error("backoff exhausted after {attempts} attempts ({max_ms}ms budget): {last_error}")]
    BackoffExhausted {
        /// Budget in milliseconds.
        max_ms: u64,
        /// Backoff attempts made before giving up.
        attempts: usize,
        /// Detail of the last shard-ownership error.
        last_error: String,
    },

    /// A response arrived without the body its command requires.
    #[error("response body is missing for {command}")]
    BodyMissing {
        /// Name of the command that was sent.
        command: &'static str,
    },

    /// The store rejected the command itself.
    #[error("store error: {0}")]
    Store(String),
}

/// Errors raised while loading a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config is not valid TOML or has fields of the wrong type.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
