//! Error types for shard location lookups.

use ranger_types::RegionId;

/// Errors returned by a [`ShardLocator`](crate::ShardLocator).
///
/// These are not transient routing signals: a locator that cannot answer
/// is treated as fatal for the current call.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// No region covers the key.
    #[error("no region found for key {0:?}")]
    RegionNotFound(Vec<u8>),

    /// The region exists but currently has no leader.
    #[error("region {0} has no leader")]
    NoLeader(RegionId),

    /// The placement driver failed or returned inconsistent data.
    #[error("placement driver error: {0}")]
    Pd(String),
}
