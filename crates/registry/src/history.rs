//! Rendering of a key's ledger version history as a JSON report.
//!
//! Each version becomes one object:
//!
//! ```json
//! {"TxId": "…", "Value": {…} | null, "Timestamp": "2018-06-01 00:00:00 +0000 UTC", "IsDelete": "false"}
//! ```
//!
//! Entries keep the ledger's iteration order (oldest first). The iterator is
//! consumed exactly once.

use chrono::{DateTime, Utc};
use medledger_storage::{HistoryIterator, KeyModification};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{RegistryError, RegistryResult},
    keys::Entity,
};

/// Timestamp layout used in reports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z UTC";

/// One rendered history entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEntry {
    /// Transaction that wrote this version.
    pub tx_id: String,
    /// Decoded record, or `null` for a deletion.
    pub value: Value,
    /// Commit time, rendered with [`TIMESTAMP_FORMAT`].
    pub timestamp: String,
    /// `"true"` or `"false"`.
    pub is_delete: String,
}

impl HistoryEntry {
    fn from_modification(
        entity: Entity,
        key: &str,
        modification: KeyModification,
    ) -> RegistryResult<Self> {
        let value = match (&modification.value, modification.is_delete) {
            (Some(bytes), false) => {
                serde_json::from_slice(bytes).map_err(|e| RegistryError::MalformedRecord {
                    entity: entity.label(),
                    key: key.to_owned(),
                    message: format!("version {}: {e}", modification.tx_id),
                })?
            },
            _ => Value::Null,
        };

        Ok(Self {
            tx_id: modification.tx_id.to_string(),
            value,
            timestamp: format_timestamp(modification.timestamp),
            is_delete: modification.is_delete.to_string(),
        })
    }
}

/// Renders a timestamp the way history reports show it.
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Collects a history iterator into report entries.
///
/// # Errors
///
/// - [`RegistryError::BackingStore`] if the ledger fails mid-iteration
/// - [`RegistryError::MalformedRecord`] if a stored version is not JSON
pub fn collect_entries(
    entity: Entity,
    key: &str,
    history: HistoryIterator,
) -> RegistryResult<Vec<HistoryEntry>> {
    history
        .map(|modification| {
            let modification = modification.map_err(|e| {
                RegistryError::backing_store(format!("Failed to read {} history", entity.label()), e)
            })?;
            HistoryEntry::from_modification(entity, key, modification)
        })
        .collect()
}

/// Renders a history iterator as a JSON array.
///
/// # Errors
///
/// See [`collect_entries`].
pub fn format_history(
    entity: Entity,
    key: &str,
    history: HistoryIterator,
) -> RegistryResult<Vec<u8>> {
    let entries = collect_entries(entity, key, history)?;
    serde_json::to_vec(&entries).map_err(|e| RegistryError::MalformedRecord {
        entity: entity.label(),
        key: key.to_owned(),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;
    use chrono::TimeZone;
    use medledger_storage::{StorageError, TxId};
    use serde_json::json;

    use super::*;

    fn at(seconds: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, nanos).single().unwrap()
    }

    fn iter(items: Vec<medledger_storage::StorageResult<KeyModification>>) -> HistoryIterator {
        Box::new(items.into_iter())
    }

    #[test]
    fn renders_writes_and_tombstones_in_order() {
        let history = iter(vec![
            Ok(KeyModification::write(
                TxId::from("a"),
                Bytes::from_static(br#"{"id":1}"#),
                at(1_527_811_200, 0),
            )),
            Ok(KeyModification::tombstone(TxId::from("b"), at(1_527_811_201, 500_000_000))),
        ]);

        let bytes = format_history(Entity::Patient, "Patient-1", history).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!([
                {
                    "TxId": "a",
                    "Value": {"id": 1},
                    "Timestamp": "2018-06-01 00:00:00 +0000 UTC",
                    "IsDelete": "false",
                },
                {
                    "TxId": "b",
                    "Value": null,
                    "Timestamp": "2018-06-01 00:00:01.500 +0000 UTC",
                    "IsDelete": "true",
                },
            ])
        );
    }

    #[test]
    fn empty_history_is_empty_array() {
        let bytes = format_history(Entity::Patient, "Patient-9", iter(Vec::new())).unwrap();
        assert_eq!(bytes, b"[]");
    }

    #[test]
    fn iteration_failure_is_backing_store() {
        let history = iter(vec![Err(StorageError::timeout())]);
        let err = format_history(Entity::Patient, "Patient-1", history).unwrap_err();
        assert!(matches!(err, RegistryError::BackingStore { .. }));
    }

    #[test]
    fn non_json_version_is_malformed() {
        let history = iter(vec![Ok(KeyModification::write(
            TxId::from("a"),
            Bytes::from_static(b"\x00"),
            at(0, 0),
        ))]);
        let err = format_history(Entity::Patient, "Patient-1", history).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedRecord { .. }));
    }
}
