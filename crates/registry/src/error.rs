//! Registry error types.
//!
//! Every registry failure falls into one [`RegistryError`] category with a
//! human-readable message naming the field or record involved. The
//! dispatcher turns these into failure [`Response`](crate::Response)s; no
//! error ever escapes as a panic.

use medledger_storage::StorageError;
use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Errors produced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Wrong argument count, empty argument, or unparsable id.
    #[error("{0}")]
    InvalidArgument(String),

    /// A create targeted a key that already holds a record.
    #[error("This {entity} already exists: {key}")]
    AlreadyExists {
        /// Entity kind, as shown to callers ("patient", "Disease").
        entity: &'static str,
        /// Storage key of the existing record.
        key: String,
    },

    /// The record (or its history) is missing.
    #[error("{entity} does not exist")]
    NotFound {
        /// Entity kind, as shown to callers.
        entity: &'static str,
        /// Storage key that was looked up.
        key: String,
    },

    /// The disease is already in the patient's disease list.
    #[error("This Patient:{patient_id}-{patient_name} already have this Disease:{disease_id}-{disease_name}")]
    AlreadyAssociated {
        /// Patient id.
        patient_id: i64,
        /// Patient name as stored.
        patient_name: String,
        /// Disease id.
        disease_id: i64,
        /// Disease name as stored.
        disease_name: String,
    },

    /// Stored bytes could not be decoded into the expected record shape.
    #[error("Malformed {entity} record at {key}: {message}")]
    MalformedRecord {
        /// Entity kind.
        entity: &'static str,
        /// Storage key holding the bytes.
        key: String,
        /// Decoder message.
        message: String,
    },

    /// The dispatcher has no handler registered under this name.
    #[error("Invalid invoke function name {name:?}. Expecting {expected}")]
    UnknownOperation {
        /// Name that was requested.
        name: String,
        /// Quoted, space-separated list of valid names.
        expected: String,
    },

    /// The ledger failed; its message is passed through with context.
    #[error("{context}: {source}")]
    BackingStore {
        /// What the registry was doing ("Failed to get patient").
        context: String,
        /// The ledger error.
        #[source]
        source: StorageError,
    },
}

impl RegistryError {
    /// Creates an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wraps a ledger error with what the registry was doing at the time.
    #[must_use]
    pub fn backing_store(context: impl Into<String>, source: StorageError) -> Self {
        Self::BackingStore { context: context.into(), source }
    }

    /// Returns `true` when re-running the whole invocation may succeed:
    /// a commit-time conflict or a transient ledger failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::BackingStore { source, .. } => source.is_conflict() || source.is_transient(),
            _ => false,
        }
    }

    /// Short machine-readable category name, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::AlreadyExists { .. } => "already_exists",
            Self::NotFound { .. } => "not_found",
            Self::AlreadyAssociated { .. } => "already_associated",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::BackingStore { .. } => "backing_store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_record() {
        let err = RegistryError::AlreadyExists { entity: "patient", key: "Patient-1".into() };
        assert_eq!(err.to_string(), "This patient already exists: Patient-1");

        let err = RegistryError::AlreadyAssociated {
            patient_id: 1,
            patient_name: "ali".into(),
            disease_id: 7,
            disease_name: "diabetes".into(),
        };
        assert_eq!(err.to_string(), "This Patient:1-ali already have this Disease:7-diabetes");
    }

    #[test]
    fn only_ledger_conflicts_and_transients_retry() {
        assert!(
            RegistryError::backing_store("commit", StorageError::conflict("Patient-1"))
                .is_retryable()
        );
        assert!(RegistryError::backing_store("get", StorageError::timeout()).is_retryable());
        assert!(
            !RegistryError::backing_store("get", StorageError::internal("disk")).is_retryable()
        );
        assert!(
            !RegistryError::NotFound { entity: "patient", key: "Patient-1".into() }.is_retryable()
        );
    }

    #[test]
    fn backing_store_passes_message_through() {
        let err = RegistryError::backing_store(
            "Failed to get patient",
            StorageError::connection("peer unreachable"),
        );
        assert_eq!(err.to_string(), "Failed to get patient: Connection error: peer unreachable");
        assert_eq!(err.kind(), "backing_store");
    }
}
