//! Client-side request routing for ranger.
//!
//! The keyspace is split into regions, each led by one store at a time.
//! This crate turns key and key-range operations into per-region requests:
//!
//! - [`Dispatcher`] resolves a key through a
//!   [`ShardLocator`](ranger_locate::ShardLocator), sends the request to
//!   the region leader and retries shard-ownership errors against a
//!   [`RetryBudget`].
//! - [`RawClient`] exposes `get`/`put`/`delete`, plus `scan` and
//!   `delete_range`, which split their range at region boundaries.
//! - [`DeleteRangeTask`] is the cancelable bulk delete, with progress
//!   reporting and one retry budget for the whole range.

pub mod backoff;
pub mod config;
pub mod delete_range;
pub mod dispatch;
pub mod error;
pub mod raw;

pub use backoff::{BackoffKind, Backoffer, RetryBudget};
pub use config::{
    ClientConfig, DELETE_RANGE_MAX_BACKOFF_MS, MAX_RAW_KV_SCAN_LIMIT, RAW_KV_MAX_BACKOFF_MS,
    READ_TIMEOUT_MEDIUM, READ_TIMEOUT_SHORT,
};
pub use delete_range::{DeleteRangeTask, TaskState};
pub use dispatch::{Attempt, Dispatcher};
pub use error::{ClientError, ConfigError};
pub use raw::RawClient;
