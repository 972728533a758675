//! Transaction conflict detection and isolation tests.
//!
//! Tests cover: read-set validation, phantom-free index scans, read-only
//! commits, abort isolation, and concurrent read-modify-write races.
//! These tests run against `MemoryBackend`.

#![allow(clippy::expect_used, clippy::panic)]

use bytes::Bytes;
use medledger_storage::{
    MemoryBackend, StorageBackend, StorageError, assert_conflict, testutil::populated_backend,
};
use tokio::task::JoinSet;

// ============================================================================
// Conflict Detection Tests
// ============================================================================

/// A key read by a transaction and changed before it commits must abort it.
#[tokio::test]
async fn test_stale_read_aborts_commit() {
    let backend = populated_backend("Patient", 1).await;

    let mut txn = backend.transaction().await.expect("txn creation");
    txn.get_state("Patient-0").await.expect("read");
    txn.put_state("Patient-0", b"stale".to_vec()).expect("buffer");

    backend.put("Patient-0", b"fresh".to_vec()).await.expect("concurrent write");

    let result = txn.commit().await;
    assert_conflict!(result);
    assert_eq!(backend.get("Patient-0").await.expect("get"), Some(Bytes::from("fresh")));
}

/// An index scan records the scanned keys; a concurrent change to one of
/// them aborts the scanning transaction.
#[tokio::test]
async fn test_scanned_index_entry_change_aborts_commit() {
    let backend = MemoryBackend::new();
    let mut seed = backend.transaction().await.expect("seed txn");
    let index = seed.create_composite_key("patient~ID", &["patient", "1"]).expect("key");
    seed.put_state(&index, vec![0x00]).expect("seed");
    seed.commit().await.expect("seed commit");

    let mut txn = backend.transaction().await.expect("txn creation");
    let entries =
        txn.get_state_by_partial_composite_key("patient~ID", &["patient"]).await.expect("scan");
    assert_eq!(entries.len(), 1);
    txn.put_state("summary", b"1".to_vec()).expect("buffer");

    backend.delete(&index).await.expect("concurrent delete");

    let result = txn.commit().await;
    assert_conflict!(result, "scan result changed underneath the transaction");
}

/// Creating a key that another transaction created first must conflict, so a
/// racing duplicate create can never silently overwrite a record.
#[tokio::test]
async fn test_racing_creates_conflict() {
    let backend = MemoryBackend::new();

    let mut first = backend.transaction().await.expect("first");
    let mut second = backend.transaction().await.expect("second");
    assert_eq!(first.get_state("Patient-9").await.expect("read"), None);
    assert_eq!(second.get_state("Patient-9").await.expect("read"), None);
    first.put_state("Patient-9", b"first".to_vec()).expect("buffer");
    second.put_state("Patient-9", b"second".to_vec()).expect("buffer");

    first.commit().await.expect("first commit");
    let result = second.commit().await;
    assert!(
        matches!(result, Err(StorageError::Conflict { ref key }) if key == "Patient-9"),
        "expected conflict on Patient-9, got: {result:?}"
    );
    assert_eq!(backend.version_count("Patient-9"), 1);
}

// ============================================================================
// Isolation Tests
// ============================================================================

#[tokio::test]
async fn test_read_only_commit_never_conflicts() {
    let backend = populated_backend("Disease", 1).await;

    let mut txn = backend.transaction().await.expect("txn creation");
    txn.get_state("Disease-0").await.expect("read");
    backend.put("Disease-0", b"changed".to_vec()).await.expect("concurrent write");

    txn.commit().await.expect("read-only commit should succeed");
}

#[tokio::test]
async fn test_uncommitted_writes_are_invisible() {
    let backend = MemoryBackend::new();

    let mut writer = backend.transaction().await.expect("writer");
    writer.put_state("Patient-1", b"draft".to_vec()).expect("buffer");

    let mut reader = backend.transaction().await.expect("reader");
    assert_eq!(reader.get_state("Patient-1").await.expect("read"), None);
    assert!(backend.get_history_for_key("Patient-1").await.expect("history").next().is_none());
}

#[tokio::test]
async fn test_commit_is_atomic_across_keys() {
    let backend = MemoryBackend::new();

    let mut txn = backend.transaction().await.expect("txn creation");
    let tx_id = txn.tx_id().clone();
    txn.put_state("Disease-7", b"{}".to_vec()).expect("record");
    let index = txn.create_composite_key("Disease~ID", &["Disease", "7"]).expect("key");
    txn.put_state(&index, vec![0x00]).expect("index");
    txn.commit().await.expect("commit");

    for key in ["Disease-7", index.as_str()] {
        let history: Vec<_> = backend
            .get_history_for_key(key)
            .await
            .expect("history")
            .collect::<Result<_, _>>()
            .expect("history entries");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tx_id, tx_id, "both writes share one transaction");
    }
}

// ============================================================================
// Concurrency Tests
// ============================================================================

/// Concurrent read-modify-write of one key: exactly one transaction per round wins.
#[tokio::test]
async fn test_concurrent_read_modify_write_exactly_one_winner() {
    const CONCURRENCY: usize = 8;

    let backend = MemoryBackend::new();
    backend.put("counter", b"0".to_vec()).await.expect("seed");

    let mut transactions = Vec::new();
    for _ in 0..CONCURRENCY {
        let mut txn = backend.transaction().await.expect("txn creation");
        txn.get_state("counter").await.expect("read");
        let value = txn.tx_id().as_str().as_bytes().to_vec();
        txn.put_state("counter", value).expect("buffer");
        transactions.push(txn);
    }

    let mut set = JoinSet::new();
    for txn in transactions {
        set.spawn(async move { txn.commit().await });
    }

    let mut winners = 0;
    let mut conflicts = 0;
    while let Some(result) = set.join_next().await {
        match result.expect("task panicked") {
            Ok(()) => winners += 1,
            Err(StorageError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, CONCURRENCY - 1);
    assert_eq!(backend.version_count("counter"), 2);
}
