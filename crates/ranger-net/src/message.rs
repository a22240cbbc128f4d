//! Protocol messages exchanged between the client and stores.
//!
//! Every request carries a [`RequestContext`] naming the region incarnation
//! and store it was routed to. A store that no longer owns that incarnation
//! answers with a [`ShardError`] instead of executing the command.

use ranger_types::{KvPair, Region, RegionEpoch, RegionId, ShardLocation, StoreId};
use serde::{Deserialize, Serialize};

/// Routing context stamped on a request by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Region the request was routed to.
    pub region_id: RegionId,
    /// Epoch of the region at routing time.
    pub region_epoch: RegionEpoch,
    /// Store the request was sent to.
    pub store_id: StoreId,
}

impl From<&ShardLocation> for RequestContext {
    fn from(loc: &ShardLocation) -> Self {
        Self {
            region_id: loc.region.id,
            region_epoch: loc.region.epoch,
            store_id: loc.leader,
        }
    }
}

/// A command to execute against one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Read the value of a single key.
    RawGet {
        /// Key to read.
        key: Vec<u8>,
    },
    /// Write a single key.
    RawPut {
        /// Key to write.
        key: Vec<u8>,
        /// Value to store; never empty.
        value: Vec<u8>,
    },
    /// Remove a single key.
    RawDelete {
        /// Key to remove.
        key: Vec<u8>,
    },
    /// Read up to `limit` pairs starting at `start_key`, within the region.
    RawScan {
        /// Inclusive start key.
        start_key: Vec<u8>,
        /// Maximum number of pairs to return.
        limit: u32,
    },
    /// Remove every key in `[start_key, end_key)`, within the region.
    RawDeleteRange {
        /// Inclusive start key.
        start_key: Vec<u8>,
        /// Exclusive end key.
        end_key: Vec<u8>,
    },
    /// Administrative bulk removal of `[start_key, end_key)`, within the region.
    DeleteRange {
        /// Inclusive start key.
        start_key: Vec<u8>,
        /// Exclusive end key.
        end_key: Vec<u8>,
    },
}

impl Command {
    /// Short command name, used as a tracing field.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RawGet { .. } => "raw_get",
            Command::RawPut { .. } => "raw_put",
            Command::RawDelete { .. } => "raw_delete",
            Command::RawScan { .. } => "raw_scan",
            Command::RawDeleteRange { .. } => "raw_delete_range",
            Command::DeleteRange { .. } => "delete_range",
        }
    }
}

/// A routed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Where the request was routed.
    pub context: RequestContext,
    /// What to execute.
    pub cmd: Command,
}

impl Request {
    /// Route `cmd` to the region and leader described by `loc`.
    pub fn new(loc: &ShardLocation, cmd: Command) -> Self {
        Self {
            context: RequestContext::from(loc),
            cmd,
        }
    }
}

/// Shard-ownership errors.
///
/// The contacted store does not (or no longer) own the region incarnation
/// the request was routed to. These are routing-layer signals: the caller
/// refreshes its location and retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ShardError {
    /// The store hosts the region but is not its leader.
    #[error("not leader for region {region_id} (leader hint: {leader:?})")]
    NotLeader {
        /// The region the request targeted.
        region_id: RegionId,
        /// The current leader, if the store knows it.
        leader: Option<StoreId>,
    },

    /// The request's region epoch is stale (split, merge or conf change).
    #[error("epoch not match ({} current regions)", .current.len())]
    EpochNotMatch {
        /// Regions now covering the requested range, if known.
        current: Vec<Region>,
    },

    /// The store does not host the region at all.
    #[error("region {region_id} not found")]
    RegionNotFound {
        /// The region the request targeted.
        region_id: RegionId,
    },

    /// The request key lies outside the region's range.
    #[error("key not in region {region_id}")]
    KeyNotInRegion {
        /// The offending key.
        key: Vec<u8>,
        /// The region the request targeted.
        region_id: RegionId,
        /// The region's start key as seen by the store.
        start_key: Vec<u8>,
        /// The region's end key as seen by the store.
        end_key: Vec<u8>,
    },

    /// The store is overloaded and refused the request.
    #[error("server is busy: {reason}")]
    ServerIsBusy {
        /// Why the store refused.
        reason: String,
    },

    /// The command was superseded by a newer one (e.g. leadership changed).
    #[error("stale command")]
    StaleCommand,
}

/// Response body for [`Command::RawGet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGetResponse {
    /// The value; empty when the key does not exist.
    pub value: Vec<u8>,
    /// Application-level error, empty on success.
    pub error: String,
}

/// Response body for [`Command::RawPut`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPutResponse {
    /// Application-level error, empty on success.
    pub error: String,
}

/// Response body for [`Command::RawDelete`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeleteResponse {
    /// Application-level error, empty on success.
    pub error: String,
}

/// Response body for [`Command::RawScan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScanResponse {
    /// Pairs found, in key order.
    pub kvs: Vec<KvPair>,
}

/// Response body for [`Command::RawDeleteRange`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeleteRangeResponse {
    /// Application-level error, empty on success.
    pub error: String,
}

/// Response body for [`Command::DeleteRange`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRangeResponse {
    /// Application-level error, empty on success.
    pub error: String,
}

/// Per-command response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// See [`RawGetResponse`].
    RawGet(RawGetResponse),
    /// See [`RawPutResponse`].
    RawPut(RawPutResponse),
    /// See [`RawDeleteResponse`].
    RawDelete(RawDeleteResponse),
    /// See [`RawScanResponse`].
    RawScan(RawScanResponse),
    /// See [`RawDeleteRangeResponse`].
    RawDeleteRange(RawDeleteRangeResponse),
    /// See [`DeleteRangeResponse`].
    DeleteRange(DeleteRangeResponse),
}

/// A store's answer to a [`Request`].
///
/// Exactly one of `shard_error` and `body` is expected to be set. A
/// response with neither, or with a body for a different command, is a
/// protocol violation the caller must not retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Shard-ownership error, if the store rejected the routing.
    pub shard_error: Option<ShardError>,
    /// Command payload.
    pub body: Option<ResponseBody>,
}

macro_rules! body_accessor {
    ($(#[$meta:meta])* $fn_name:ident, $variant:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(self) -> Option<$ty> {
            match self.body {
                Some(ResponseBody::$variant(body)) => Some(body),
                _ => None,
            }
        }
    };
}

impl Response {
    /// A successful response carrying `body`.
    pub fn ok(body: ResponseBody) -> Self {
        Self {
            shard_error: None,
            body: Some(body),
        }
    }

    /// A response rejecting the request's routing.
    pub fn rejected(err: ShardError) -> Self {
        Self {
            shard_error: Some(err),
            body: None,
        }
    }

    /// Whether the store rejected the request's routing.
    pub fn has_shard_error(&self) -> bool {
        self.shard_error.is_some()
    }

    /// Human-readable detail of the shard-ownership error, if any.
    pub fn shard_error_detail(&self) -> Option<String> {
        self.shard_error.as_ref().map(ToString::to_string)
    }

    body_accessor!(
        /// Take the [`RawGetResponse`] body, if present.
        into_raw_get, RawGet, RawGetResponse
    );
    body_accessor!(
        /// Take the [`RawPutResponse`] body, if present.
        into_raw_put, RawPut, RawPutResponse
    );
    body_accessor!(
        /// Take the [`RawDeleteResponse`] body, if present.
        into_raw_delete, RawDelete, RawDeleteResponse
    );
    body_accessor!(
        /// Take the [`RawScanResponse`] body, if present.
        into_raw_scan, RawScan, RawScanResponse
    );
    body_accessor!(
        /// Take the [`RawDeleteRangeResponse`] body, if present.
        into_raw_delete_range, RawDeleteRange, RawDeleteRangeResponse
    );
    body_accessor!(
        /// Take the [`DeleteRangeResponse`] body, if present.
        into_delete_range, DeleteRange, DeleteRangeResponse
    );
}
