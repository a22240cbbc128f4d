//! Shard location lookup.
//!
//! The client core resolves every key through a [`ShardLocator`] and never
//! touches location data itself: it only asks for fresh lookups and reports
//! the shard-ownership errors it observed. How a locator caches, refreshes
//! or synchronizes is its own business.
//!
//! [`RegionCache`] is the provided implementation: a read-mostly cache in
//! front of a [`PlacementDriver`], the cluster's authoritative source of
//! region metadata.

mod cache;
mod error;

use ranger_net::ShardError;
use ranger_types::{Region, ShardLocation, StoreId};

pub use cache::RegionCache;
pub use error::LocateError;

/// Resolves keys to the shard currently believed to own them.
///
/// Implementations must be safe to share across concurrent calls.
#[async_trait::async_trait]
pub trait ShardLocator: Send + Sync {
    /// Return the location of the region containing `key`.
    ///
    /// The result may be stale; staleness surfaces later as a
    /// [`ShardError`] from the store.
    async fn locate(&self, key: &[u8]) -> Result<ShardLocation, LocateError>;

    /// Notification that a request routed with `loc` was rejected with `err`.
    ///
    /// The default implementation ignores it.
    async fn on_shard_error(&self, loc: &ShardLocation, err: &ShardError) {
        let _ = (loc, err);
    }
}

/// Authoritative source of region metadata.
#[async_trait::async_trait]
pub trait PlacementDriver: Send + Sync {
    /// Identifier of the cluster this driver manages.
    async fn cluster_id(&self) -> Result<u64, LocateError>;

    /// Return the region containing `key` and its current leader, if any.
    async fn region_by_key(
        &self,
        key: &[u8],
    ) -> Result<Option<(Region, Option<StoreId>)>, LocateError>;
}
