//! Read-mostly region cache in front of a placement driver.
//!
//! Entries are keyed by region start key so a lookup is a single
//! `range(..=key).next_back()` followed by a containment check. Misses go
//! to the [`PlacementDriver`] and the answer replaces every cached entry it
//! overlaps, so a split or merge observed through the driver never leaves
//! two entries claiming the same key.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use ranger_net::ShardError;
use ranger_types::{Region, ShardLocation, StoreId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::LocateError;
use crate::{PlacementDriver, ShardLocator};

struct CachedRegion {
    region: Region,
    leader: StoreId,
}

impl CachedRegion {
    fn location(&self) -> ShardLocation {
        ShardLocation::new(&self.region, self.leader)
    }

    fn overlaps(&self, start: &[u8], end: &[u8]) -> bool {
        let starts_before_end = end.is_empty() || self.region.start_key.as_slice() < end;
        let ends_after_start =
            self.region.end_key.is_empty() || self.region.end_key.as_slice() > start;
        starts_before_end && ends_after_start
    }
}

/// Shared region cache implementing [`ShardLocator`].
///
/// Uses a `tokio` `RwLock`: lookups take the read side and only misses and
/// error reports take the write side. No lock is held while the placement
/// driver is queried.
pub struct RegionCache {
    pd: Arc<dyn PlacementDriver>,
    /// Region start key -> cached region.
    regions: RwLock<BTreeMap<Vec<u8>, CachedRegion>>,
}

impl RegionCache {
    /// Create an empty cache backed by `pd`.
    pub fn new(pd: Arc<dyn PlacementDriver>) -> Self {
        Self {
            pd,
            regions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look `key` up in the cache only.
    pub async fn cached(&self, key: &[u8]) -> Option<ShardLocation> {
        let regions = self.regions.read().await;
        let (_, cached) = regions
            .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
            .next_back()?;
        cached.region.contains(key).then(|| cached.location())
    }

    /// Insert `region`, evicting every entry whose range overlaps it.
    pub async fn insert(&self, region: Region, leader: StoreId) {
        let mut regions = self.regions.write().await;
        let before = regions.len();
        regions.retain(|_, c| !c.overlaps(&region.start_key, &region.end_key));
        let evicted = before - regions.len();

        debug!(region = %region.ver_id(), %leader, evicted, "cached region");
        regions.insert(
            region.start_key.clone(),
            CachedRegion { region, leader },
        );
    }

    /// Drop the entry for the region incarnation `loc` was built from.
    ///
    /// Entries for newer incarnations of the same region are kept.
    pub async fn invalidate(&self, loc: &ShardLocation) {
        let mut regions = self.regions.write().await;
        let matches = regions
            .get(&loc.start_key)
            .is_some_and(|c| c.region.ver_id() == loc.region);
        if matches {
            regions.remove(&loc.start_key);
            debug!(region = %loc.region, "invalidated cached region");
        }
    }

    /// Number of cached regions.
    pub async fn len(&self) -> usize {
        self.regions.read().await.len()
    }

    /// Whether the cache holds no regions.
    pub async fn is_empty(&self) -> bool {
        self.regions.read().await.is_empty()
    }

    /// Point the cached entry for `loc` at a new leader.
    ///
    /// Falls back to invalidation when the entry changed or the new leader
    /// is not a known peer.
    async fn switch_leader(&self, loc: &ShardLocation, leader: StoreId) {
        let mut regions = self.regions.write().await;
        match regions.get_mut(&loc.start_key) {
            Some(c) if c.region.ver_id() == loc.region && c.region.peers.contains(&leader) => {
                debug!(region = %loc.region, from = %c.leader, to = %leader, "switched leader");
                c.leader = leader;
            }
            Some(c) if c.region.ver_id() == loc.region => {
                regions.remove(&loc.start_key);
                debug!(region = %loc.region, %leader, "leader hint not a peer, invalidated");
            }
            _ => {}
        }
    }

    async fn load(&self, key: &[u8]) -> Result<ShardLocation, LocateError> {
        let Some((region, leader)) = self.pd.region_by_key(key).await? else {
            return Err(LocateError::RegionNotFound(key.to_vec()));
        };

        if !region.contains(key) {
            return Err(LocateError::Pd(format!(
                "region {} returned for key {key:?} does not contain it",
                region.ver_id()
            )));
        }

        let leader = leader.ok_or(LocateError::NoLeader(region.id))?;
        let loc = ShardLocation::new(&region, leader);
        self.insert(region, leader).await;
        Ok(loc)
    }
}

#[async_trait::async_trait]
impl ShardLocator for RegionCache {
    async fn locate(&self, key: &[u8]) -> Result<ShardLocation, LocateError> {
        if let Some(loc) = self.cached(key).await {
            return Ok(loc);
        }
        self.load(key).await
    }

    async fn on_shard_error(&self, loc: &ShardLocation, err: &ShardError) {
        match err {
            ShardError::NotLeader {
                leader: Some(leader),
                ..
            } => self.switch_leader(loc, *leader).await,
            ShardError::EpochNotMatch { current } if !current.is_empty() => {
                self.invalidate(loc).await;
                for region in current {
                    let leader = if region.peers.contains(&loc.leader) {
                        Some(loc.leader)
                    } else {
                        region.peers.first().copied()
                    };
                    if let Some(leader) = leader {
                        self.insert(region.clone(), leader).await;
                    }
                }
            }
            _ => self.invalidate(loc).await,
        }
    }
}

impl std::fmt::Debug for RegionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionCache").finish_non_exhaustive()
    }
}
