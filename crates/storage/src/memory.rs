//! In-memory ledger implementation.
//!
//! This module provides [`MemoryBackend`], an in-memory implementation of
//! [`StorageBackend`] suitable for testing and development.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Keys are stored in a [`BTreeMap`] for prefix range scans
//! - **Versioned**: Every committed write or delete appends to the key's history
//! - **Optimistic concurrency**: Commits fail with a conflict if a key read by
//!   the transaction gained a version after it was read
//!
//! # Example
//!
//! ```
//! use medledger_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MemoryBackend::new();
//!
//!     backend.put("Disease-7", b"{}".to_vec()).await.unwrap();
//!     let value = backend.get("Disease-7").await.unwrap();
//!
//!     assert_eq!(value.unwrap().as_ref(), b"{}");
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - Range scans see committed data only, not the scanning transaction's own writes
//! - History is kept forever; there is no pruning

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fail::fail_point;
use parking_lot::RwLock;

use crate::{
    backend::StorageBackend,
    clock::{Clock, SystemClock},
    composite_key::{self, MAX_UNICODE_RUNE},
    error::{StorageError, StorageResult},
    transaction::Transaction,
    types::{HistoryIterator, KeyModification, KeyValue, TxId},
};

/// One committed version of a key.
#[derive(Debug, Clone)]
struct Version {
    tx_id: TxId,
    value: Option<Bytes>,
    timestamp: DateTime<Utc>,
}

impl Version {
    fn to_modification(&self) -> KeyModification {
        match &self.value {
            Some(value) => KeyModification::write(self.tx_id.clone(), value.clone(), self.timestamp),
            None => KeyModification::tombstone(self.tx_id.clone(), self.timestamp),
        }
    }
}

/// Version vectors per key. The length of a key's vector is its version number.
type VersionMap = BTreeMap<String, Vec<Version>>;

/// In-memory ledger using a [`BTreeMap`] of per-key version vectors.
///
/// # Cloning
///
/// `MemoryBackend` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying data store.
#[derive(Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<VersionMap>>,
    next_tx: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("keys", &self.data.read().len())
            .field("next_tx", &self.next_tx.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Creates an empty ledger stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates an empty ledger stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            next_tx: Arc::new(AtomicU64::new(1)),
            clock: Arc::new(clock),
        }
    }

    /// Writes `value` to `key` in a transaction of its own.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for an empty key or value.
    pub async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let mut txn = self.begin();
        txn.put_state(key, value)?;
        Box::new(txn).commit().await
    }

    /// Deletes `key` in a transaction of its own, leaving a tombstone in its history.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for an empty key.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut txn = self.begin();
        txn.delete_state(key)?;
        Box::new(txn).commit().await
    }

    /// Returns the number of keys that have ever been written.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.data.read().len()
    }

    /// Returns the number of committed versions of `key`.
    #[must_use]
    pub fn version_count(&self, key: &str) -> usize {
        self.data.read().get(key).map_or(0, Vec::len)
    }

    fn begin(&self) -> MemoryTransaction {
        let sequence = self.next_tx.fetch_add(1, Ordering::Relaxed);
        MemoryTransaction {
            backend: self.clone(),
            tx_id: TxId::new(format!("{sequence:016x}")),
            timestamp: self.clock.now(),
            read_versions: BTreeMap::new(),
            pending_writes: BTreeMap::new(),
        }
    }

    fn latest(data: &VersionMap, key: &str) -> (usize, Option<Bytes>) {
        match data.get(key) {
            Some(versions) => {
                (versions.len(), versions.last().and_then(|version| version.value.clone()))
            },
            None => (0, None),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        let data = self.data.read();
        Ok(Self::latest(&data, key).1)
    }

    #[tracing::instrument(skip(self))]
    async fn get_history_for_key(&self, key: &str) -> StorageResult<HistoryIterator> {
        fail_point!("memory-history-missing", |_| Err(StorageError::not_found(key)));

        let history: Vec<KeyModification> = self
            .data
            .read()
            .get(key)
            .map(|versions| versions.iter().map(Version::to_modification).collect())
            .unwrap_or_default();

        Ok(Box::new(history.into_iter().map(Ok)))
    }

    #[tracing::instrument(skip(self))]
    async fn transaction(&self) -> StorageResult<Box<dyn Transaction>> {
        Ok(Box::new(self.begin()))
    }

    #[tracing::instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<()> {
        // Acquiring the read lock proves the store is not deadlocked.
        let _unused = self.data.read();
        Ok(())
    }
}

/// In-memory transaction.
///
/// Buffers writes until commit and records the version of every committed
/// key it reads, which commit re-validates under the write lock.
struct MemoryTransaction {
    backend: MemoryBackend,
    tx_id: TxId,
    timestamp: DateTime<Utc>,
    read_versions: BTreeMap<String, usize>,
    pending_writes: BTreeMap<String, Option<Bytes>>,
}

impl MemoryTransaction {
    fn check_key(key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::invalid_key("key must not be empty"));
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[tracing::instrument(skip(self), fields(tx_id = %self.tx_id))]
    async fn get_state(&mut self, key: &str) -> StorageResult<Option<Bytes>> {
        fail_point!("memory-get-state", |_| {
            Err(StorageError::connection(format!("injected read failure for {key}")))
        });

        // Read-your-writes
        if let Some(pending) = self.pending_writes.get(key) {
            return Ok(pending.clone());
        }

        let (version, value) = MemoryBackend::latest(&self.backend.data.read(), key);
        self.read_versions.entry(key.to_owned()).or_insert(version);
        Ok(value)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        Self::check_key(key)?;
        if value.is_empty() {
            return Err(StorageError::invalid_key(format!("value for {key:?} must not be empty")));
        }
        self.pending_writes.insert(key.to_owned(), Some(Bytes::from(value)));
        Ok(())
    }

    fn delete_state(&mut self, key: &str) -> StorageResult<()> {
        Self::check_key(key)?;
        self.pending_writes.insert(key.to_owned(), None);
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(tx_id = %self.tx_id))]
    async fn get_state_by_partial_composite_key(
        &mut self,
        object_type: &str,
        attributes: &[&str],
    ) -> StorageResult<Vec<KeyValue>> {
        let start = composite_key::create_composite_key(object_type, attributes)?;
        let mut end = start.clone();
        end.push(MAX_UNICODE_RUNE);

        let data = self.backend.data.read();
        let mut results = Vec::new();
        for (key, versions) in data.range::<str, _>((
            std::ops::Bound::Included(start.as_str()),
            std::ops::Bound::Excluded(end.as_str()),
        )) {
            self.read_versions.entry(key.clone()).or_insert(versions.len());
            if let Some(value) = versions.last().and_then(|version| version.value.clone()) {
                results.push(KeyValue::new(key.clone(), value));
            }
        }

        Ok(results)
    }

    async fn get_history_for_key(&self, key: &str) -> StorageResult<HistoryIterator> {
        self.backend.get_history_for_key(key).await
    }

    #[tracing::instrument(skip(self), fields(tx_id = %self.tx_id, writes = self.pending_writes.len()))]
    async fn commit(self: Box<Self>) -> StorageResult<()> {
        fail_point!("memory-commit", |_| Err(StorageError::connection("injected commit failure")));

        if self.pending_writes.is_empty() {
            return Ok(());
        }

        let mut data = self.backend.data.write();

        // Validate the read set before touching anything
        for (key, read_version) in &self.read_versions {
            let current = data.get(key).map_or(0, Vec::len);
            if current != *read_version {
                tracing::debug!(key = %key, read_version, current, "read set validation failed");
                return Err(StorageError::conflict(key.clone()));
            }
        }

        for (key, value) in self.pending_writes {
            data.entry(key).or_default().push(Version {
                tx_id: self.tx_id.clone(),
                value,
                timestamp: self.timestamp,
            });
        }

        Ok(())
    }
}
