//! Tests for lock-free atomic statistics tracking
//!
//! This module tests that the bridge counters work correctly under concurrent
//! access without requiring locks.

use hdfs_bridge::{BridgeStats, StatsSnapshot};
use std::sync::Arc;

/// Test basic atomic stats increment
#[tokio::test]
async fn test_atomic_stats_single_thread() {
    let stats = BridgeStats::new();

    stats.increment_streams_opened();
    stats.increment_streams_opened();
    stats.increment_streams_created();
    stats.add_bytes_read(1024);
    stats.add_bytes_read(2048);
    stats.add_bytes_written(10);
    stats.add_handles_released(3);
    stats.increment_errors();

    assert_eq!(
        stats.snapshot(),
        StatsSnapshot {
            streams_opened: 2,
            streams_created: 1,
            handles_released: 3,
            bytes_read: 3072,
            bytes_written: 10,
            errors: 1,
        }
    );
}

/// Test concurrent atomic stats updates from multiple tasks
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_atomic_stats_concurrent() {
    let stats = Arc::new(BridgeStats::new());

    // 100 tasks, each incrementing counters 10 times
    let mut handles = Vec::new();
    for _ in 0..100 {
        let stats_clone = Arc::clone(&stats);
        handles.push(tokio::spawn(async move {
            for _ in 0..10 {
                stats_clone.increment_streams_opened();
                stats_clone.add_bytes_read(100);
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(stats.streams_opened(), 1000, "Streams opened mismatch");
    assert_eq!(stats.bytes_read(), 100_000, "Bytes read mismatch (100 * 1000)");
}

/// Test that atomic operations don't lose updates across blocking workers
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_atomic_stats_no_lost_updates() {
    let stats = Arc::new(BridgeStats::new());

    let mut handles = Vec::new();
    for _ in 0..1000 {
        let stats_clone = Arc::clone(&stats);
        handles.push(tokio::task::spawn_blocking(move || {
            stats_clone.increment_streams_created();
            stats_clone.add_bytes_written(1);
            stats_clone.add_handles_released(1);
            stats_clone.increment_errors();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.streams_created, 1000);
    assert_eq!(snapshot.bytes_written, 1000);
    assert_eq!(snapshot.handles_released, 1000);
    assert_eq!(snapshot.errors, 1000);
    assert_eq!(snapshot.streams_opened, 0);
}

#[test]
fn test_fresh_stats_are_zero() {
    assert_eq!(BridgeStats::default().snapshot(), StatsSnapshot::default());
}
