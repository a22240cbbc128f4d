//! Integration test: stress.
//!
//! Concurrent writers and readers sharing one client while the cluster
//! keeps splitting regions underneath them.

use std::sync::Arc;

use ranger_client::ClientConfig;
use ranger_integration_tests::{MockCluster, init_tracing};
use tokio::sync::Barrier;

fn key(writer: usize, j: usize) -> Vec<u8> {
    format!("w{writer}-{j:03}").into_bytes()
}

/// 8 concurrent writers, 100 keys each, with splits landing mid-flight.
/// Every key must be readable afterwards and scans must stay ordered.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_with_splits() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"w4"]);
    let client = Arc::new(cluster.client(ClientConfig::default()).await);

    let barrier = Arc::new(Barrier::new(9));
    let mut handles = Vec::new();

    for writer in 0..8 {
        let client = Arc::clone(&client);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            for j in 0..100 {
                let k = key(writer, j);
                client.put(&k, &k).await.unwrap();
            }
        }));
    }

    let splitter = {
        let cluster = Arc::clone(&cluster);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            for writer in 0..8 {
                for j in (10..100).step_by(30) {
                    cluster.split(&key(writer, j)).await;
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    for h in handles {
        h.await.unwrap();
    }
    splitter.await.unwrap();

    for writer in 0..8 {
        for j in 0..100 {
            let k = key(writer, j);
            assert_eq!(client.get(&k).await.unwrap(), Some(k.clone()), "lost {k:?}");
        }
    }

    let kvs = client.scan(b"", 1000).await.unwrap();
    assert_eq!(kvs.len(), 800);
    assert!(kvs.windows(2).all(|w| w[0].key < w[1].key));
    assert_eq!(cluster.regions().await.len(), 2 + 8 * 3);
}

/// Concurrent readers scanning while a delete-range runs.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scans_during_delete_range() {
    init_tracing();
    let cluster = MockCluster::new(3, &[b"f", b"m", b"t"]);
    let pairs: Vec<(Vec<u8>, Vec<u8>)> = (0u16..500)
        .map(|i| {
            let letter = (b'a' + (i % 26) as u8) as char;
            (format!("{letter}{i:03}").into_bytes(), vec![1])
        })
        .collect();
    cluster.seed(&pairs).await;
    let client = Arc::new(cluster.client(ClientConfig::default()).await);

    let mut readers = Vec::new();
    for _ in 0..4 {
        let client = Arc::clone(&client);
        readers.push(tokio::spawn(async move {
            for _ in 0..10 {
                let kvs = client.scan(b"", 1000).await.unwrap();
                assert!(kvs.len() <= 500);
                assert!(kvs.windows(2).all(|w| w[0].key < w[1].key));
            }
        }));
    }

    client.delete_range(b"a", b"").await.unwrap();
    for r in readers {
        r.await.unwrap();
    }
    assert!(cluster.keys().await.is_empty());
}
