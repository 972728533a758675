//! Id enumeration over the secondary indexes.

use async_trait::async_trait;
use bytes::Bytes;
use medledger_storage::Transaction;
use tracing::{debug, warn};

use super::{Handler, read_failed};
use crate::{
    args::{ArgSpec, Args},
    error::{RegistryError, RegistryResult},
    keys::Entity,
};

const NO_FIELDS: &[ArgSpec] = &[];

/// Scans an entity's index and returns its ids in ascending order.
async fn list_ids(txn: &mut dyn Transaction, entity: Entity) -> RegistryResult<Vec<i64>> {
    let entries = txn
        .get_state_by_partial_composite_key(entity.index_name(), &[entity.index_entity()])
        .await
        .map_err(|e| read_failed(entity, e))?;

    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        match entity.id_from_index_key(&entry.key) {
            Some(id) => ids.push(id),
            None => warn!(key = ?entry.key, "skipping unrecognized index entry"),
        }
    }
    Ok(ids)
}

fn render(entity: Entity, ids: &[i64]) -> RegistryResult<Option<Bytes>> {
    let bytes = serde_json::to_vec(ids).map_err(|e| RegistryError::MalformedRecord {
        entity: entity.label(),
        key: entity.index_name().to_owned(),
        message: e.to_string(),
    })?;
    Ok(Some(Bytes::from(bytes)))
}

/// `listPatientIDs()`: ids of every patient, ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListPatientIds;

#[async_trait]
impl Handler for ListPatientIds {
    fn name(&self) -> &'static str {
        "listPatientIDs"
    }

    #[tracing::instrument(name = "list_patient_ids", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        Args::parse(NO_FIELDS, args)?;
        let ids = list_ids(txn, Entity::Patient).await?;
        debug!(count = ids.len(), "patient ids listed");
        render(Entity::Patient, &ids)
    }
}

/// `listDiseaseIDs()`: ids of every disease, ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListDiseaseIds;

#[async_trait]
impl Handler for ListDiseaseIds {
    fn name(&self) -> &'static str {
        "listDiseaseIDs"
    }

    #[tracing::instrument(name = "list_disease_ids", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        Args::parse(NO_FIELDS, args)?;
        let ids = list_ids(txn, Entity::Disease).await?;
        debug!(count = ids.len(), "disease ids listed");
        render(Entity::Disease, &ids)
    }
}
