//! Registry operations.
//!
//! Every operation is a [`Handler`]: it validates its string arguments,
//! then reads and buffers writes through the invocation's [`Transaction`].
//! Handlers never commit; the dispatcher commits once the handler returns
//! `Ok`, so an operation's writes land together or not at all.
//!
//! | Name | Arguments | Payload |
//! |------|-----------|---------|
//! | `createPatient` | ID, Name, Address | none |
//! | `updatePatientData` | ID, Name, Address | none |
//! | `addPatientHistory` | ID, History | none |
//! | `getPatientbyID` | ID | stored patient bytes |
//! | `getPatientHistorybyID` | ID | JSON history report |
//! | `createDisease` | ID, Name, Description | none |
//! | `getDiseasebyID` | ID | stored disease bytes |
//! | `assignDiseaseToPatient` | PatientID, DiseaseID | none |
//! | `listPatientIDs` | | JSON array of ids |
//! | `listDiseaseIDs` | | JSON array of ids |

mod disease;
mod index;
mod patient;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use medledger_storage::{StorageError, Transaction};

pub use self::{
    disease::{CreateDisease, GetDiseaseById},
    index::{ListDiseaseIds, ListPatientIds},
    patient::{
        AddPatientHistory, AssignDiseaseToPatient, CreatePatient, GetPatientById,
        GetPatientHistoryById, UpdatePatientData,
    },
};
use crate::{
    error::{RegistryError, RegistryResult},
    keys::{Entity, INDEX_SENTINEL},
    model::Record,
};

/// A named registry operation.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name the dispatcher routes on.
    fn name(&self) -> &'static str;

    /// Runs the operation inside `txn`.
    ///
    /// Returns the operation's payload, if it has one.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] describing the first failure. Nothing
    /// the handler buffered should be committed after an error.
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>>;
}

/// Every built-in operation, in the order they are listed to callers.
#[must_use]
pub fn builtin_handlers() -> Vec<Arc<dyn Handler>> {
    vec![
        Arc::new(CreatePatient),
        Arc::new(UpdatePatientData),
        Arc::new(AddPatientHistory),
        Arc::new(GetPatientById),
        Arc::new(GetPatientHistoryById),
        Arc::new(CreateDisease),
        Arc::new(GetDiseaseById),
        Arc::new(AssignDiseaseToPatient),
        Arc::new(ListPatientIds),
        Arc::new(ListDiseaseIds),
    ]
}

fn read_failed(entity: Entity, source: StorageError) -> RegistryError {
    RegistryError::backing_store(format!("Failed to get {}", entity.label()), source)
}

fn write_failed(entity: Entity, source: StorageError) -> RegistryError {
    RegistryError::backing_store(format!("Failed to put {}", entity.label()), source)
}

/// Unix seconds of the transaction's proposal time.
fn tx_unix_seconds(txn: &dyn Transaction) -> i64 {
    txn.tx_timestamp().timestamp()
}

/// Reads the raw bytes of an existing record.
async fn load_bytes(
    txn: &mut dyn Transaction,
    entity: Entity,
    id: i64,
) -> RegistryResult<(String, Bytes)> {
    let key = entity.key(id);
    match txn.get_state(&key).await.map_err(|e| read_failed(entity, e))? {
        Some(bytes) => Ok((key, bytes)),
        None => Err(RegistryError::NotFound { entity: entity.label(), key }),
    }
}

/// Reads and decodes an existing record.
async fn load<R: Record>(txn: &mut dyn Transaction, id: i64) -> RegistryResult<(String, R)> {
    let (key, bytes) = load_bytes(txn, R::ENTITY, id).await?;
    let record = R::decode(&key, &bytes)?;
    Ok((key, record))
}

/// Encodes and buffers a record over its existing key.
fn store<R: Record>(txn: &mut dyn Transaction, key: &str, record: &R) -> RegistryResult<()> {
    let bytes = record.encode(key)?;
    txn.put_state(key, bytes).map_err(|e| write_failed(R::ENTITY, e))
}

/// Buffers a new record and its index entry after checking the key is free.
async fn insert<R: Record>(txn: &mut dyn Transaction, id: i64, record: &R) -> RegistryResult<()> {
    let entity = R::ENTITY;
    let key = entity.key(id);
    if txn.get_state(&key).await.map_err(|e| read_failed(entity, e))?.is_some() {
        return Err(RegistryError::AlreadyExists { entity: entity.label(), key });
    }

    let bytes = record.encode(&key)?;
    let index_key = entity.index_key(id).map_err(|e| {
        RegistryError::backing_store(format!("Failed to build {} index key", entity.label()), e)
    })?;

    txn.put_state(&key, bytes).map_err(|e| write_failed(entity, e))?;
    txn.put_state(&index_key, INDEX_SENTINEL.to_vec()).map_err(|e| write_failed(entity, e))?;
    Ok(())
}
