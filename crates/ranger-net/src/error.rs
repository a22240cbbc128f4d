//! Error types for network operations.

use std::time::Duration;

use ranger_types::StoreId;

/// Errors that can occur while delivering a request to a store.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The round-trip did not complete within the granted timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The destination store is not reachable.
    #[error("store {0} is unreachable")]
    Unreachable(StoreId),

    /// Failed to establish a connection.
    #[error("connection error: {0}")]
    Connect(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A frame announced a payload larger than the allowed maximum.
    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge {
        /// Announced payload length.
        len: usize,
        /// Maximum accepted payload length.
        max: usize,
    },
}
