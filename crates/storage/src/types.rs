//! Common types shared by ledger backends and their consumers.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;

/// Key-value pair returned from range scans.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use medledger_storage::KeyValue;
///
/// let kv = KeyValue::new("Patient-1", Bytes::from(r#"{"id":1}"#));
/// assert_eq!(kv.key, "Patient-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: String,

    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<String>, value: Bytes) -> Self {
        Self { key: key.into(), value }
    }
}

/// Identifier of a committed (or in-flight) ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId(String);

impl TxId {
    /// Wraps a backend-assigned transaction identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One entry of a key's version history.
///
/// A delete produces a tombstone: `is_delete` is `true` and `value` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
    /// Transaction that wrote this version.
    pub tx_id: TxId,

    /// Value written by the transaction, `None` for a tombstone.
    pub value: Option<Bytes>,

    /// Commit time of the transaction.
    pub timestamp: DateTime<Utc>,

    /// Whether this version deleted the key.
    pub is_delete: bool,
}

impl KeyModification {
    /// Creates a history entry for a write.
    #[must_use]
    pub fn write(tx_id: TxId, value: Bytes, timestamp: DateTime<Utc>) -> Self {
        Self { tx_id, value: Some(value), timestamp, is_delete: false }
    }

    /// Creates a history entry for a delete.
    #[must_use]
    pub fn tombstone(tx_id: TxId, timestamp: DateTime<Utc>) -> Self {
        Self { tx_id, value: None, timestamp, is_delete: true }
    }
}

/// Lazy, forward-only sequence of a key's versions, oldest first.
///
/// Each item may fail independently, since remote ledgers page history in
/// over the network.
pub type HistoryIterator = Box<dyn Iterator<Item = StorageResult<KeyModification>> + Send>;
