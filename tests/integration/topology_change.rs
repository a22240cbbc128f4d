//! Integration test: topology changes between and during operations.
//!
//! Regions split, merge and change leader while the client routes with a
//! cached view. Every operation must still land on the right region and
//! cover its range exactly once.

use ranger_client::ClientConfig;
use ranger_integration_tests::{MockCluster, TopologyChange, init_tracing};
use ranger_types::StoreId;

fn letters() -> Vec<(Vec<u8>, Vec<u8>)> {
    (b'a'..=b'z').map(|c| (vec![c], vec![c])).collect()
}

fn keys_of(pairs: &[ranger_types::KvPair]) -> Vec<Vec<u8>> {
    pairs.iter().map(|kv| kv.key.clone()).collect()
}

// -----------------------------------------------------------------------
// Between operations
// -----------------------------------------------------------------------

#[tokio::test]
async fn test_leader_transfer_updates_cache_in_place() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"m"]);
    let client = cluster.client(ClientConfig::default()).await;
    client.put(b"a", b"1").await.unwrap();
    let lookups = cluster.pd_lookups();

    cluster.transfer_leader(b"a", StoreId::new(3)).await;
    assert_eq!(client.get(b"a").await.unwrap(), Some(b"1".to_vec()));

    // One not-leader rejection, then the hinted leader; no new PD lookup.
    assert_eq!(cluster.shard_errors(), 1);
    assert_eq!(cluster.pd_lookups(), lookups);

    client.put(b"b", b"2").await.unwrap();
    assert_eq!(cluster.shard_errors(), 1);
}

#[tokio::test]
async fn test_split_between_calls() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"m"]);
    cluster.seed(&letters()).await;
    let client = cluster.client(ClientConfig::default()).await;
    assert_eq!(client.get(b"c").await.unwrap(), Some(b"c".to_vec()));

    cluster.split(b"f").await.unwrap();

    // Both halves of the old region are still reachable.
    assert_eq!(client.get(b"c").await.unwrap(), Some(b"c".to_vec()));
    assert_eq!(client.get(b"k").await.unwrap(), Some(b"k".to_vec()));
    assert!(cluster.shard_errors() >= 1);
}

#[tokio::test]
async fn test_merge_between_calls() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"g", b"p"]);
    cluster.seed(&letters()).await;
    let client = cluster.client(ClientConfig::default()).await;
    client.get(b"a").await.unwrap();
    client.get(b"h").await.unwrap();

    assert!(cluster.merge(b"a").await);

    // "h" was cached under the region that no longer exists.
    assert_eq!(client.get(b"h").await.unwrap(), Some(b"h".to_vec()));
    assert_eq!(client.get(b"a").await.unwrap(), Some(b"a".to_vec()));
    assert_eq!(cluster.regions().await.len(), 2);
}

// -----------------------------------------------------------------------
// During range operations
// -----------------------------------------------------------------------

#[tokio::test]
async fn test_split_during_scan() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"g", b"t"]);
    cluster.seed(&letters()).await;
    let client = cluster.client(ClientConfig::default()).await;
    // Warm the cache so the scan routes with the pre-split view.
    for k in [&b"a"[..], b"h", b"u"] {
        client.get(k).await.unwrap();
    }
    let served = cluster.requests();

    cluster
        .schedule(served + 1, TopologyChange::Split(b"m".to_vec()))
        .await;
    let kvs = client.scan(b"", 100).await.unwrap();

    let expected: Vec<Vec<u8>> = letters().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys_of(&kvs), expected);
    assert_eq!(cluster.regions().await.len(), 4);
}

#[tokio::test]
async fn test_split_during_delete_range_keeps_exact_coverage() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"g", b"t"]);
    cluster.seed(&letters()).await;
    let client = cluster.client(ClientConfig::default()).await;
    for k in [&b"a"[..], b"h", b"u"] {
        client.get(k).await.unwrap();
    }
    let served = cluster.requests();

    cluster
        .schedule(served + 1, TopologyChange::Split(b"m".to_vec()))
        .await;
    client.delete_range(b"c", b"w").await.unwrap();

    let expected: Vec<Vec<u8>> = [b'a', b'b', b'w', b'x', b'y', b'z']
        .iter()
        .map(|c| vec![*c])
        .collect();
    assert_eq!(cluster.keys().await, expected);
}

#[tokio::test]
async fn test_merge_during_scan() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"g", b"m", b"t"]);
    cluster.seed(&letters()).await;
    let client = cluster.client(ClientConfig::default()).await;
    for k in [&b"a"[..], b"h", b"n", b"u"] {
        client.get(k).await.unwrap();
    }
    let served = cluster.requests();

    // After the first sub-scan, ["g","m") absorbs ["m","t").
    cluster
        .schedule(served + 1, TopologyChange::Merge(b"h".to_vec()))
        .await;
    let kvs = client.scan(b"", 100).await.unwrap();

    assert_eq!(kvs.len(), 26);
    assert!(kvs.windows(2).all(|w| w[0].key < w[1].key));
}

#[tokio::test]
async fn test_leader_moves_during_delete_range() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"g", b"p"]);
    cluster.seed(&letters()).await;
    let client = cluster.client(ClientConfig::default()).await;
    let served = cluster.requests();

    let to = StoreId::new(1);
    cluster
        .schedule(
            served + 1,
            TopologyChange::TransferLeader {
                key: b"h".to_vec(),
                to,
            },
        )
        .await;
    client.delete_range(b"a", b"").await.unwrap();

    assert!(cluster.keys().await.is_empty());
    assert_eq!(cluster.leader_of(b"h").await, Some(to));
}

#[tokio::test]
async fn test_repeated_splits_during_scan() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"d", b"i", b"n", b"s"]);
    cluster.seed(&letters()).await;
    let client = cluster.client(ClientConfig::default()).await;
    for k in [&b"a"[..], b"e", b"j", b"o", b"t"] {
        client.get(k).await.unwrap();
    }
    let served = cluster.requests();

    // Split a cached region ahead of the cursor after each request.
    for (i, at) in [b"f", b"k", b"p", b"u"].iter().enumerate() {
        cluster
            .schedule(served + 1 + i, TopologyChange::Split(at.to_vec()))
            .await;
    }
    let kvs = client.scan(b"", 26).await.unwrap();

    let expected: Vec<Vec<u8>> = letters().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys_of(&kvs), expected);
    assert_eq!(cluster.regions().await.len(), 9);
    assert!(cluster.shard_errors() >= 1);
}
