//! Per-invocation transaction handle.
//!
//! A [`Transaction`] is the only view of the ledger a registry operation gets.
//! It mirrors what a ledger peer hands to contract code during endorsement:
//!
//! - **Buffered writes**: `put_state`/`delete_state` are applied only at
//!   [`commit`](Transaction::commit)
//! - **Read-your-writes**: `get_state` sees the transaction's own pending writes
//! - **Optimistic validation**: every committed key read is recorded, and commit
//!   fails with [`Conflict`](crate::StorageError::Conflict) if any of those keys
//!   was changed by another transaction in the meantime
//!
//! # Example
//!
//! ```
//! use medledger_storage::{MemoryBackend, StorageBackend};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let backend = MemoryBackend::new();
//!
//! let mut txn = backend.transaction().await.unwrap();
//! txn.put_state("Patient-1", br#"{"id":1}"#.to_vec()).unwrap();
//! let index = txn.create_composite_key("patient~ID", &["patient", "1"]).unwrap();
//! txn.put_state(&index, vec![0x00]).unwrap();
//! txn.commit().await.unwrap();
//!
//! assert!(backend.get("Patient-1").await.unwrap().is_some());
//! # });
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{
    composite_key,
    error::StorageResult,
    types::{HistoryIterator, KeyValue, TxId},
};

/// Transaction handle for one registry invocation.
///
/// Dropping a transaction without calling [`commit`](Transaction::commit)
/// discards every buffered write.
#[async_trait]
pub trait Transaction: Send {
    /// Identifier the ledger will record for this transaction's writes.
    fn tx_id(&self) -> &TxId;

    /// Proposal time of the transaction.
    ///
    /// Every timestamp written by one invocation comes from here, so all of
    /// them agree.
    fn tx_timestamp(&self) -> DateTime<Utc>;

    /// Reads a key, seeing this transaction's own pending writes first.
    ///
    /// Returns `Ok(None)` if the key does not exist or was deleted in this
    /// transaction. Absence is never an error.
    async fn get_state(&mut self, key: &str) -> StorageResult<Option<Bytes>>;

    /// Buffers a write.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidKey`](crate::StorageError::InvalidKey) if the key or
    /// the value is empty. An empty value is reserved for deletion, so index
    /// entries must carry a non-empty sentinel.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Buffers a delete. The ledger records a tombstone in the key's history.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidKey`](crate::StorageError::InvalidKey) if the key is empty.
    fn delete_state(&mut self, key: &str) -> StorageResult<()>;

    /// Builds a composite key for a secondary index entry.
    ///
    /// # Errors
    ///
    /// See [`composite_key::create_composite_key`].
    fn create_composite_key(&self, object_type: &str, attributes: &[&str]) -> StorageResult<String> {
        composite_key::create_composite_key(object_type, attributes)
    }

    /// Returns every committed entry whose composite key starts with the
    /// given object type and leading attributes, in key order.
    async fn get_state_by_partial_composite_key(
        &mut self,
        object_type: &str,
        attributes: &[&str],
    ) -> StorageResult<Vec<KeyValue>>;

    /// Returns the committed version history of `key`, oldest first.
    async fn get_history_for_key(&self, key: &str) -> StorageResult<HistoryIterator>;

    /// Commits all buffered writes atomically.
    ///
    /// # Errors
    ///
    /// - [`Conflict`](crate::StorageError::Conflict) if a key read by this
    ///   transaction was modified by another transaction that committed first
    /// - Other [`StorageError`](crate::StorageError) variants on backend failures
    async fn commit(self: Box<Self>) -> StorageResult<()>;
}
