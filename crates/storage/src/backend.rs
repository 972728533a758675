//! Ledger backend trait definition.
//!
//! [`StorageBackend`] is the boundary between the registry and whichever
//! transactional ledger stores its records. The registry never writes through
//! the backend directly: every invocation opens a [`Transaction`], does its
//! reads and buffered writes there, and commits once.
//!
//! # Implementing a Backend
//!
//! 1. Implement the [`StorageBackend`] trait
//! 2. Implement a corresponding [`Transaction`] type
//! 3. Map backend-specific errors to [`StorageError`](crate::StorageError)
//!
//! See [`MemoryBackend`](crate::MemoryBackend) for a reference implementation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::StorageResult,
    transaction::Transaction,
    types::HistoryIterator,
};

/// Abstract transactional ledger.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get`](StorageBackend::get) | Committed read of a single key |
/// | [`get_history_for_key`](StorageBackend::get_history_for_key) | Committed version history of a key |
/// | [`transaction`](StorageBackend::transaction) | Begin a transaction for one invocation |
/// | [`health_check`](StorageBackend::health_check) | Verify backend availability |
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads the latest committed value of a key.
    ///
    /// - `Ok(Some(bytes))` if the key exists
    /// - `Ok(None)` if the key doesn't exist or its latest version is a tombstone
    /// - `Err(...)` on storage errors
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>>;

    /// Returns the committed version history of `key`, oldest first.
    ///
    /// Backends that can tell an unknown key apart from a key with no
    /// versions report the former as [`NotFound`](crate::StorageError::NotFound).
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get_history_for_key(&self, key: &str) -> StorageResult<HistoryIterator>;

    /// Begins a new transaction.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn transaction(&self) -> StorageResult<Box<dyn Transaction>>;

    /// Checks that the backend can serve requests.
    #[must_use = "health check results indicate backend availability and must be inspected"]
    async fn health_check(&self) -> StorageResult<()>;
}
