//! Patient operations.

use async_trait::async_trait;
use bytes::Bytes;
use medledger_storage::Transaction;
use tracing::{debug, info};

use super::{Handler, insert, load, load_bytes, read_failed, store, tx_unix_seconds};
use crate::{
    args::{ArgSpec, Args},
    error::{RegistryError, RegistryResult},
    history,
    keys::Entity,
    model::{Disease, Patient},
};

const PATIENT_FIELDS: &[ArgSpec] =
    &[ArgSpec::new("ID"), ArgSpec::new("Name"), ArgSpec::new("Address")];
const HISTORY_FIELDS: &[ArgSpec] = &[ArgSpec::new("ID"), ArgSpec::new("History")];
const ID_FIELD: &[ArgSpec] = &[ArgSpec::new("ID")];
const ASSIGN_FIELDS: &[ArgSpec] = &[ArgSpec::new("PatientID"), ArgSpec::new("DiseaseID")];

/// `createPatient(ID, Name, Address)`: stores a new patient and its index entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreatePatient;

#[async_trait]
impl Handler for CreatePatient {
    fn name(&self) -> &'static str {
        "createPatient"
    }

    #[tracing::instrument(name = "create_patient", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(PATIENT_FIELDS, args)?;
        let id = args.id(0)?;
        debug!(id, "start create patient");

        let patient = Patient::new(id, args.text(1), args.text(2), tx_unix_seconds(txn));
        insert(txn, id, &patient).await?;

        info!(id, "patient created");
        Ok(None)
    }
}

/// `updatePatientData(ID, Name, Address)`: replaces name and address.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdatePatientData;

#[async_trait]
impl Handler for UpdatePatientData {
    fn name(&self) -> &'static str {
        "updatePatientData"
    }

    #[tracing::instrument(name = "update_patient_data", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(PATIENT_FIELDS, args)?;
        let id = args.id(0)?;
        debug!(id, "start update patient");

        let (key, mut patient) = load::<Patient>(txn, id).await?;
        patient.update_data(args.text(1), args.text(2), tx_unix_seconds(txn));
        store(txn, &key, &patient)?;

        info!(id, updated_at = patient.updated_at, "patient updated");
        Ok(None)
    }
}

/// `addPatientHistory(ID, History)`: appends one entry to the patient's history.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddPatientHistory;

#[async_trait]
impl Handler for AddPatientHistory {
    fn name(&self) -> &'static str {
        "addPatientHistory"
    }

    #[tracing::instrument(name = "add_patient_history", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(HISTORY_FIELDS, args)?;
        let id = args.id(0)?;
        debug!(id, "start add patient history");

        let (key, mut patient) = load::<Patient>(txn, id).await?;
        patient.add_history(args.text(1), tx_unix_seconds(txn));
        store(txn, &key, &patient)?;

        info!(id, entries = patient.history.len(), "patient history appended");
        Ok(None)
    }
}

/// `getPatientbyID(ID)`: returns the stored patient bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPatientById;

#[async_trait]
impl Handler for GetPatientById {
    fn name(&self) -> &'static str {
        "getPatientbyID"
    }

    #[tracing::instrument(name = "get_patient", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(ID_FIELD, args)?;
        let id = args.id(0)?;

        let (_, bytes) = load_bytes(txn, Entity::Patient, id).await?;
        debug!(id, bytes = bytes.len(), "patient read");
        Ok(Some(bytes))
    }
}

/// `getPatientHistorybyID(ID)`: returns every stored version of the patient
/// as a JSON report.
///
/// A patient that was never written yields `[]` unless the ledger itself
/// reports the key as unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPatientHistoryById;

#[async_trait]
impl Handler for GetPatientHistoryById {
    fn name(&self) -> &'static str {
        "getPatientHistorybyID"
    }

    #[tracing::instrument(name = "get_patient_history", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(ID_FIELD, args)?;
        let id = args.id(0)?;
        let entity = Entity::Patient;
        let key = entity.key(id);

        let versions = match txn.get_history_for_key(&key).await {
            Ok(versions) => versions,
            Err(e) if e.is_not_found() => {
                return Err(RegistryError::NotFound { entity: entity.label(), key });
            },
            Err(e) => return Err(read_failed(entity, e)),
        };

        let report = history::format_history(entity, &key, versions)?;
        debug!(id, bytes = report.len(), "patient history read");
        Ok(Some(Bytes::from(report)))
    }
}

/// `assignDiseaseToPatient(PatientID, DiseaseID)`: copies the disease into
/// the patient's disease list.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignDiseaseToPatient;

#[async_trait]
impl Handler for AssignDiseaseToPatient {
    fn name(&self) -> &'static str {
        "assignDiseaseToPatient"
    }

    #[tracing::instrument(name = "assign_disease", skip_all, fields(tx_id = %txn.tx_id()))]
    async fn handle(
        &self,
        txn: &mut dyn Transaction,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let args = Args::parse(ASSIGN_FIELDS, args)?;
        let patient_id = args.id(0)?;
        let disease_id = args.id(1)?;
        debug!(patient_id, disease_id, "start assign disease to patient");

        let (key, mut patient) = load::<Patient>(txn, patient_id).await?;
        let (_, disease) = load::<Disease>(txn, disease_id).await?;
        patient.assign_disease(disease, tx_unix_seconds(txn))?;
        store(txn, &key, &patient)?;

        info!(patient_id, disease_id, "disease assigned to patient");
        Ok(None)
    }
}
