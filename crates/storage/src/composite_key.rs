//! Composite key encoding for range-scannable secondary indexes.
//!
//! A composite key is an object type followed by an ordered list of
//! attributes, each terminated by [`COMPOSITE_KEY_DELIMITER`]. The key starts
//! with the delimiter as well, which keeps the whole composite namespace
//! disjoint from simple keys (no simple key may start with `U+0000`).
//!
//! ```text
//! \0 patient~ID \0 patient \0 8000000000000001 \0
//! ```
//!
//! Because every component is terminated, a key built from a prefix of the
//! attributes is a byte prefix of every key that extends it. Range scans over
//! a partial composite key therefore return exactly the index entries whose
//! leading attributes match.

use crate::error::{StorageError, StorageResult};

/// Separator placed before the object type and after every component.
pub const COMPOSITE_KEY_DELIMITER: char = '\u{0}';

/// Highest Unicode scalar; reserved as the exclusive end bound of range scans.
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Builds a composite key from an object type and its ordered attributes.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if the object type is empty or if
/// any component contains [`COMPOSITE_KEY_DELIMITER`] or [`MAX_UNICODE_RUNE`].
pub fn create_composite_key<S: AsRef<str>>(
    object_type: &str,
    attributes: &[S],
) -> StorageResult<String> {
    if object_type.is_empty() {
        return Err(StorageError::invalid_key("composite key object type must not be empty"));
    }
    validate_component(object_type)?;

    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.as_ref().len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_DELIMITER);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_DELIMITER);

    for attribute in attributes {
        let attribute = attribute.as_ref();
        validate_component(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_DELIMITER);
    }

    Ok(key)
}

/// Splits a composite key back into its object type and attributes.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if `key` was not produced by
/// [`create_composite_key`].
pub fn split_composite_key(key: &str) -> StorageResult<(String, Vec<String>)> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_DELIMITER)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_DELIMITER))
        .ok_or_else(|| StorageError::invalid_key(format!("not a composite key: {key:?}")))?;

    let mut components = body.split(COMPOSITE_KEY_DELIMITER).map(str::to_owned);
    let object_type = components
        .next()
        .filter(|object_type| !object_type.is_empty())
        .ok_or_else(|| StorageError::invalid_key("composite key has no object type"))?;

    Ok((object_type, components.collect()))
}

/// Returns `true` if `key` lives in the composite key namespace.
#[must_use]
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_DELIMITER)
}

fn validate_component(component: &str) -> StorageResult<()> {
    if component.contains(COMPOSITE_KEY_DELIMITER) || component.contains(MAX_UNICODE_RUNE) {
        return Err(StorageError::invalid_key(format!(
            "composite key component {component:?} contains a reserved character"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn layout_matches_documented_format() {
        let key = create_composite_key("patient~ID", &["patient", "42"]).unwrap();
        assert_eq!(key, "\u{0}patient~ID\u{0}patient\u{0}42\u{0}");
    }

    #[test]
    fn partial_key_is_prefix_of_full_key() {
        let partial = create_composite_key("patient~ID", &["patient"]).unwrap();
        let full = create_composite_key("patient~ID", &["patient", "42"]).unwrap();
        assert!(full.starts_with(&partial));
    }

    #[test]
    fn reserved_characters_are_rejected() {
        assert!(create_composite_key("idx", &["a\u{0}b"]).is_err());
        assert!(create_composite_key("idx", &["\u{10FFFF}"]).is_err());
        assert!(create_composite_key("", &["a"]).is_err());
    }

    #[test]
    fn split_rejects_simple_keys() {
        assert!(split_composite_key("Patient-1").is_err());
        assert!(!is_composite_key("Patient-1"));
    }

    proptest! {
        /// Splitting a freshly built composite key yields the original parts.
        #[test]
        fn split_reverses_create(
            object_type in "[a-zA-Z~]{1,16}",
            attributes in proptest::collection::vec("[a-zA-Z0-9 -]{0,12}", 0..4),
        ) {
            let key = create_composite_key(&object_type, attributes.as_slice()).unwrap();
            let (split_type, split_attributes) = split_composite_key(&key).unwrap();
            prop_assert_eq!(split_type, object_type);
            prop_assert_eq!(split_attributes, attributes);
        }
    }
}
