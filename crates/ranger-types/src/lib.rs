//! Shared types and identifiers for ranger.
//!
//! This crate defines the value types used across the ranger workspace:
//! identifiers ([`RegionId`], [`StoreId`]), region metadata ([`Region`],
//! [`RegionEpoch`], [`RegionVerId`]), the routing result handed out by a
//! locator ([`ShardLocation`]), and scan results ([`KvPair`]).
//!
//! Keys are raw bytes compared lexicographically. An empty end key always
//! means "unbounded": the range extends to the end of the keyspace.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Create an ID from its raw numeric value.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Return the raw numeric value.
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a region (a contiguous slice of the keyspace).
    RegionId
);

define_id!(
    /// Identifier of a cluster member that hosts region replicas.
    StoreId
);

// ---------------------------------------------------------------------------
// Key ranges
// ---------------------------------------------------------------------------

/// Whether `key` falls inside `[start, end)`, with an empty `end` meaning unbounded.
pub fn range_contains(start: &[u8], end: &[u8], key: &[u8]) -> bool {
    key >= start && (end.is_empty() || key < end)
}

/// The smaller of two end keys, where an empty end key is unbounded.
///
/// Plain byte-lexicographic comparison would treat the empty key as the
/// smallest key, so it is handled explicitly.
pub fn min_end_key<'a>(a: &'a [u8], b: &'a [u8]) -> &'a [u8] {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b,
        (_, true) => a,
        _ if a <= b => a,
        _ => b,
    }
}

// ---------------------------------------------------------------------------
// Region metadata
// ---------------------------------------------------------------------------

/// Version vector of a region.
///
/// `conf_ver` is bumped on replica membership changes, `version` on
/// split and merge. A request routed with an older epoch is rejected by the
/// owning store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionEpoch {
    /// Configuration version.
    pub conf_ver: u64,
    /// Range version.
    pub version: u64,
}

/// Identity of one incarnation of a region.
///
/// Two locations with the same [`RegionId`] but different epochs describe
/// different key ranges or replica sets and must not be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionVerId {
    /// Region identifier.
    pub id: RegionId,
    /// Epoch of this incarnation.
    pub epoch: RegionEpoch,
}

impl fmt::Display for RegionVerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}/{}",
            self.id, self.epoch.conf_ver, self.epoch.version
        )
    }
}

/// Region metadata as published by the placement driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Region identifier.
    pub id: RegionId,
    /// Inclusive start key.
    pub start_key: Vec<u8>,
    /// Exclusive end key; empty means unbounded.
    pub end_key: Vec<u8>,
    /// Current epoch.
    pub epoch: RegionEpoch,
    /// Stores holding a replica of this region.
    pub peers: Vec<StoreId>,
}

impl Region {
    /// Return the versioned identity of this region.
    pub fn ver_id(&self) -> RegionVerId {
        RegionVerId {
            id: self.id,
            epoch: self.epoch,
        }
    }

    /// Whether `key` belongs to this region.
    pub fn contains(&self, key: &[u8]) -> bool {
        range_contains(&self.start_key, &self.end_key, key)
    }
}

// ---------------------------------------------------------------------------
// Routing result
// ---------------------------------------------------------------------------

/// The shard a locator currently believes owns a key.
///
/// A location is an immutable snapshot: once returned it is never updated,
/// only superseded by a fresh lookup. It may be stale by the time a request
/// routed with it reaches the store; the store then answers with a
/// shard-ownership error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardLocation {
    /// Region incarnation this location was built from.
    pub region: RegionVerId,
    /// Store believed to lead the region.
    pub leader: StoreId,
    /// Inclusive start key.
    pub start_key: Vec<u8>,
    /// Exclusive end key; empty means unbounded.
    pub end_key: Vec<u8>,
}

impl ShardLocation {
    /// Build a location for `region` led by `leader`.
    pub fn new(region: &Region, leader: StoreId) -> Self {
        Self {
            region: region.ver_id(),
            leader,
            start_key: region.start_key.clone(),
            end_key: region.end_key.clone(),
        }
    }

    /// Whether `key` belongs to this location's range.
    pub fn contains(&self, key: &[u8]) -> bool {
        range_contains(&self.start_key, &self.end_key, key)
    }

    /// Whether this location is the last region of the keyspace.
    pub fn is_last(&self) -> bool {
        self.end_key.is_empty()
    }

    /// Clamp a requested end key to this location's end.
    ///
    /// Returns `min(end, self.end_key)` with empty meaning unbounded on
    /// both sides: an unbounded request ends where the region ends, and a
    /// region reaching the end of the keyspace leaves `end` unchanged.
    pub fn clamp_end(&self, end: &[u8]) -> Vec<u8> {
        min_end_key(end, &self.end_key).to_vec()
    }
}

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// A key/value pair returned by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPair {
    /// The key.
    pub key: Vec<u8>,
    /// The value.
    pub value: Vec<u8>,
}

impl KvPair {
    /// Create a new pair.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Split a list of pairs into parallel key and value vectors.
    pub fn into_parts(pairs: Vec<KvPair>) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
        pairs.into_iter().map(|p| (p.key, p.value)).unzip()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
