//! Key derivation for registry records and their secondary indexes.
//!
//! Primary keys are a namespace prefix followed by the decimal id, so a
//! patient and a disease may share a numeric id without colliding:
//!
//! | Record  | Primary key   | Index key (composite)                          |
//! |---------|---------------|------------------------------------------------|
//! | Patient | `Patient-42`  | `patient~ID` / `patient` / `800000000000002a`  |
//! | Disease | `Disease-42`  | `Disease~ID` / `Disease` / `800000000000002a`  |
//!
//! The id component of an index key is the id with its sign bit flipped,
//! written as 16 lowercase hex digits. That encoding preserves numeric
//! ordering under byte-wise comparison, so a range scan over an index
//! enumerates records in ascending id order, negative ids included.

use medledger_storage::{StorageResult, create_composite_key, split_composite_key};

/// Prefix of every patient primary key.
pub const PATIENT_KEY_PREFIX: &str = "Patient-";

/// Prefix of every disease primary key.
pub const DISEASE_KEY_PREFIX: &str = "Disease-";

/// Index name for patient id enumeration.
pub const PATIENT_INDEX: &str = "patient~ID";

/// Index name for disease id enumeration.
pub const DISEASE_INDEX: &str = "Disease~ID";

/// Entity type component of patient index entries.
pub const PATIENT_ENTITY: &str = "patient";

/// Entity type component of disease index entries.
pub const DISEASE_ENTITY: &str = "Disease";

/// Value stored under every index key. Only the key's existence matters,
/// but the ledger treats an empty value as a delete.
pub const INDEX_SENTINEL: [u8; 1] = [0x00];

const SIGN_BIT: u64 = 1 << 63;

/// Kind of record a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A patient record.
    Patient,
    /// A disease record.
    Disease,
}

impl Entity {
    /// Primary key prefix for this entity.
    #[must_use]
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Patient => PATIENT_KEY_PREFIX,
            Self::Disease => DISEASE_KEY_PREFIX,
        }
    }

    /// Composite index name for this entity.
    #[must_use]
    pub fn index_name(self) -> &'static str {
        match self {
            Self::Patient => PATIENT_INDEX,
            Self::Disease => DISEASE_INDEX,
        }
    }

    /// Entity type component used inside index keys.
    #[must_use]
    pub fn index_entity(self) -> &'static str {
        match self {
            Self::Patient => PATIENT_ENTITY,
            Self::Disease => DISEASE_ENTITY,
        }
    }

    /// Name used in caller-facing messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Disease => "Disease",
        }
    }

    /// Primary key of the record with this id.
    #[must_use]
    pub fn key(self, id: i64) -> String {
        format!("{}{id}", self.key_prefix())
    }

    /// Composite index key of the record with this id.
    ///
    /// # Errors
    ///
    /// Propagates composite key validation errors; the fixed components
    /// used here never trigger them.
    pub fn index_key(self, id: i64) -> StorageResult<String> {
        let encoded = encode_id(id);
        create_composite_key(self.index_name(), &[self.index_entity(), encoded.as_str()])
    }

    /// Recovers the id from an index key of this entity, if it is one.
    #[must_use]
    pub fn id_from_index_key(self, key: &str) -> Option<i64> {
        let (index, attributes) = split_composite_key(key).ok()?;
        match attributes.as_slice() {
            [entity, id] if index == self.index_name() && entity == self.index_entity() => {
                decode_id(id)
            },
            _ => None,
        }
    }
}

/// Primary key of a patient record.
#[must_use]
pub fn patient_key(id: i64) -> String {
    Entity::Patient.key(id)
}

/// Primary key of a disease record.
#[must_use]
pub fn disease_key(id: i64) -> String {
    Entity::Disease.key(id)
}

/// Composite index key of a patient record.
///
/// # Errors
///
/// See [`Entity::index_key`].
pub fn patient_index_key(id: i64) -> StorageResult<String> {
    Entity::Patient.index_key(id)
}

/// Composite index key of a disease record.
///
/// # Errors
///
/// See [`Entity::index_key`].
pub fn disease_index_key(id: i64) -> StorageResult<String> {
    Entity::Disease.index_key(id)
}

/// Encodes an id as order-preserving fixed-width hex.
#[must_use]
pub fn encode_id(id: i64) -> String {
    hex::encode(((id as u64) ^ SIGN_BIT).to_be_bytes())
}

/// Decodes an id written by [`encode_id`].
#[must_use]
pub fn decode_id(encoded: &str) -> Option<i64> {
    let bytes: [u8; 8] = hex::decode(encoded).ok()?.try_into().ok()?;
    Some((u64::from_be_bytes(bytes) ^ SIGN_BIT) as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn primary_keys_are_namespaced() {
        assert_eq!(patient_key(1), "Patient-1");
        assert_eq!(disease_key(1), "Disease-1");
        assert_eq!(patient_key(-5), "Patient--5");
        assert_ne!(patient_key(7), disease_key(7));
    }

    #[test]
    fn index_key_layout() {
        let key = patient_index_key(42).unwrap();
        assert_eq!(key, "\u{0}patient~ID\u{0}patient\u{0}800000000000002a\u{0}");
        assert_eq!(Entity::Patient.id_from_index_key(&key), Some(42));
    }

    #[test]
    fn index_namespaces_do_not_overlap() {
        let patient = patient_index_key(3).unwrap();
        let disease = disease_index_key(3).unwrap();
        assert_ne!(patient, disease);
        assert_eq!(Entity::Disease.id_from_index_key(&patient), None);
        assert_eq!(Entity::Patient.id_from_index_key(&disease), None);
    }

    #[test]
    fn id_extraction_rejects_foreign_keys() {
        assert_eq!(Entity::Patient.id_from_index_key("Patient-1"), None);
        let bad = create_composite_key(PATIENT_INDEX, &[PATIENT_ENTITY, "zz"]).unwrap();
        assert_eq!(Entity::Patient.id_from_index_key(&bad), None);
    }

    proptest! {
        /// Any id survives an index key round trip.
        #[test]
        fn index_key_round_trip(id in any::<i64>()) {
            let key = Entity::Disease.index_key(id).unwrap();
            prop_assert_eq!(Entity::Disease.id_from_index_key(&key), Some(id));
        }

        /// Byte-wise order of encoded ids matches numeric order.
        #[test]
        fn encoding_preserves_ordering(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(a.cmp(&b), encode_id(a).cmp(&encode_id(b)));
        }

        /// Equal ids always derive equal keys.
        #[test]
        fn derivation_is_deterministic(id in any::<i64>()) {
            prop_assert_eq!(patient_key(id), patient_key(id));
            prop_assert_eq!(patient_index_key(id).unwrap(), patient_index_key(id).unwrap());
        }
    }
}
