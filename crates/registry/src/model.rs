//! Record model for patients, diseases and history operations.
//!
//! Records are stored as JSON objects with camelCase field names. Decoding
//! also accepts the PascalCase field names and `null` sequences written by
//! the earlier deployment of the registry, so existing ledgers stay readable.
//!
//! A patient embeds full [`Disease`] snapshots rather than disease ids: a
//! later change to a disease record does not rewrite the copies already
//! assigned to patients.

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::{
    error::{RegistryError, RegistryResult},
    keys::Entity,
};

/// A disease record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disease {
    /// Caller-chosen id, unique among diseases.
    #[serde(alias = "ID")]
    pub id: i64,
    /// Lower-cased name.
    #[serde(alias = "Name")]
    pub name: String,
    /// Lower-cased description.
    #[serde(alias = "Description")]
    pub description: String,
}

impl Disease {
    /// Creates a disease, normalizing text fields to lower case.
    #[must_use]
    pub fn new(id: i64, name: &str, description: &str) -> Self {
        Self { id, name: name.to_lowercase(), description: description.to_lowercase() }
    }
}

/// One entry of a patient's medical history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Lower-cased description of what happened.
    #[serde(alias = "Description")]
    pub description: String,
    /// Unix timestamp (seconds) at which the entry was appended.
    #[serde(alias = "CreatedAt")]
    pub created_at: i64,
}

impl Operation {
    /// Creates a history entry, normalizing the description to lower case.
    #[must_use]
    pub fn new(description: &str, created_at: i64) -> Self {
        Self { description: description.to_lowercase(), created_at }
    }
}

/// A patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Caller-chosen id, unique among patients.
    #[serde(alias = "ID")]
    pub id: i64,
    /// Lower-cased name.
    #[serde(alias = "Name")]
    pub name: String,
    /// Lower-cased address.
    #[serde(alias = "Address")]
    pub address: String,
    /// Unix timestamp (seconds) of creation.
    #[serde(alias = "CreatedAt")]
    pub created_at: i64,
    /// Unix timestamp (seconds) of the latest mutation.
    #[serde(alias = "UpdatedAt")]
    pub updated_at: i64,
    /// Disease snapshots assigned to this patient, in assignment order.
    #[serde(alias = "Diseases", default, deserialize_with = "null_as_empty")]
    pub diseases: Vec<Disease>,
    /// Append-only medical history.
    #[serde(alias = "History", default, deserialize_with = "null_as_empty")]
    pub history: Vec<Operation>,
}

impl Patient {
    /// Creates a patient with empty diseases and history.
    #[must_use]
    pub fn new(id: i64, name: &str, address: &str, now: i64) -> Self {
        Self {
            id,
            name: name.to_lowercase(),
            address: address.to_lowercase(),
            created_at: now,
            updated_at: now,
            diseases: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Refreshes `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: i64) {
        self.updated_at = self.updated_at.max(now).max(self.created_at);
    }

    /// Replaces name and address.
    pub fn update_data(&mut self, name: &str, address: &str, now: i64) {
        self.name = name.to_lowercase();
        self.address = address.to_lowercase();
        self.touch(now);
    }

    /// Appends a history entry.
    pub fn add_history(&mut self, description: &str, now: i64) {
        self.history.push(Operation::new(description, now));
        self.touch(now);
    }

    /// Returns `true` if a disease with this id is already assigned.
    #[must_use]
    pub fn has_disease(&self, disease_id: i64) -> bool {
        self.diseases.iter().any(|disease| disease.id == disease_id)
    }

    /// Appends a disease snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyAssociated`] if a disease with the same
    /// id is already assigned; the patient is left unchanged.
    pub fn assign_disease(&mut self, disease: Disease, now: i64) -> RegistryResult<()> {
        if self.has_disease(disease.id) {
            return Err(RegistryError::AlreadyAssociated {
                patient_id: self.id,
                patient_name: self.name.clone(),
                disease_id: disease.id,
                disease_name: disease.name,
            });
        }
        self.diseases.push(disease);
        self.touch(now);
        Ok(())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A value the registry stores under an [`Entity`] key.
pub trait Record: Serialize + DeserializeOwned {
    /// Entity this record type is stored as.
    const ENTITY: Entity;

    /// Encodes the record into its canonical byte form.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MalformedRecord`] if serialization fails.
    fn encode(&self, key: &str) -> RegistryResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| RegistryError::MalformedRecord {
            entity: Self::ENTITY.label(),
            key: key.to_owned(),
            message: e.to_string(),
        })
    }

    /// Decodes stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MalformedRecord`] if the bytes are not a
    /// record of this type.
    fn decode(key: &str, bytes: &Bytes) -> RegistryResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| RegistryError::MalformedRecord {
            entity: Self::ENTITY.label(),
            key: key.to_owned(),
            message: e.to_string(),
        })
    }
}

impl Record for Patient {
    const ENTITY: Entity = Entity::Patient;
}

impl Record for Disease {
    const ENTITY: Entity = Entity::Disease;
}
