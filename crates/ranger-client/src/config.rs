//! TOML configuration for the client.
//!
//! Every field is optional. Missing sections and fields fall back to the
//! defaults exposed by the effective-value accessors on [`ClientConfig`].
//!
//! ```toml
//! [timeout]
//! read_short_ms = 20000
//! read_medium_ms = 60000
//!
//! [backoff]
//! raw_max_ms = 20000
//! delete_range_max_ms = 100000
//!
//! [scan]
//! max_limit = 10240
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Largest `limit` a single scan call accepts by default.
pub const MAX_RAW_KV_SCAN_LIMIT: usize = 10240;

/// Default retry budget of one raw KV request, in milliseconds.
pub const RAW_KV_MAX_BACKOFF_MS: u64 = 20_000;

/// Default retry budget of a whole delete-range task, in milliseconds.
pub const DELETE_RANGE_MAX_BACKOFF_MS: u64 = 100_000;

/// Default timeout of single-key, scan and raw delete-range requests.
pub const READ_TIMEOUT_SHORT: Duration = Duration::from_secs(20);

/// Default timeout of delete-range task requests.
pub const READ_TIMEOUT_MEDIUM: Duration = Duration::from_secs(60);

/// Top-level client configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeouts.
    pub timeout: TimeoutSection,
    /// Retry budgets.
    pub backoff: BackoffSection,
    /// Scan limits.
    pub scan: ScanSection,
}

/// `[timeout]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    /// Timeout of single-key, scan and raw delete-range requests.
    pub read_short_ms: Option<u64>,
    /// Timeout of delete-range task requests.
    pub read_medium_ms: Option<u64>,
}

/// `[backoff]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackoffSection {
    /// Total backoff allowed for one raw KV request.
    pub raw_max_ms: Option<u64>,
    /// Total backoff allowed for one delete-range task, across all regions.
    pub delete_range_max_ms: Option<u64>,
}

/// `[scan]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Largest accepted scan limit.
    pub max_limit: Option<usize>,
}

impl ClientConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p).map_err(|source| ConfigError::Io {
                    path: p.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Effective short request timeout (20 s default).
    pub fn read_timeout_short(&self) -> Duration {
        self.timeout
            .read_short_ms
            .map(Duration::from_millis)
            .unwrap_or(READ_TIMEOUT_SHORT)
    }

    /// Effective medium request timeout (60 s default).
    pub fn read_timeout_medium(&self) -> Duration {
        self.timeout
            .read_medium_ms
            .map(Duration::from_millis)
            .unwrap_or(READ_TIMEOUT_MEDIUM)
    }

    /// Effective retry budget of one raw KV request.
    pub fn raw_max_backoff(&self) -> Duration {
        Duration::from_millis(self.backoff.raw_max_ms.unwrap_or(RAW_KV_MAX_BACKOFF_MS))
    }

    /// Effective retry budget of one delete-range task.
    pub fn delete_range_max_backoff(&self) -> Duration {
        Duration::from_millis(
            self.backoff
                .delete_range_max_ms
                .unwrap_or(DELETE_RANGE_MAX_BACKOFF_MS),
        )
    }

    /// Effective maximum scan limit.
    pub fn max_scan_limit(&self) -> usize {
        self.scan.max_limit.unwrap_or(MAX_RAW_KV_SCAN_LIMIT)
    }
}
