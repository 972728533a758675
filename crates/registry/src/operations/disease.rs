//! Disease operations.

use async_trait::async_trait;
use bytes::Bytes;
use medledger_storage::Transaction;
use tracing::{debug, info};

use super::{Handler, insert, load_bytes};
use crate::{
    args::{ArgSpec, Args},
    error::RegistryResult,
    keys::Entity,
    model::Disease,
};

const DISEASE_FIELDS: &[ArgSpec] =
    &[ArgSpec::new("ID"), ArgSpec::new("Name"), ArgSpec::new("Description")];
const ID_FIELD: &[ArgSpec] = &[ArgSpec::new("ID")];

/// `createDisease(ID, Name, Description)`: stores a new disease and its index entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDisease;

#[async_trait]
impl Handler for CreateDisease {
    fn name(&self) -> &'static str {
        "createDisease"
    }

    #[tracing::instrument(name = "create_disease", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(DISEASE_FIELDS, args)?;
        let id = args.id(0)?;
        debug!(id, "start create disease");

        let disease = Disease::new(id, args.text(1), args.text(2));
        insert(txn, id, &disease).await?;

        info!(id, "disease created");
        Ok(None)
    }
}

/// `getDiseasebyID(ID)`: returns the stored disease bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDiseaseById;

#[async_trait]
impl Handler for GetDiseaseById {
    fn name(&self) -> &'static str {
        "getDiseasebyID"
    }

    #[tracing::instrument(name = "get_disease", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(ID_FIELD, args)?;
        let id = args.id(0)?;

        let (_, bytes) = load_bytes(txn, Entity::Disease, id).await?;
        debug!(id, bytes = bytes.len(), "disease read");
        Ok(Some(bytes))
    }
}
