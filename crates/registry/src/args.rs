//! Argument validation shared by every registry operation.
//!
//! Validation runs in a fixed order before any ledger access: argument
//! count, then non-emptiness of each argument, then numeric parsing. The
//! first violation is reported with a message naming the argument and the
//! shape it must have.

use crate::error::{RegistryError, RegistryResult};

/// Name of an argument, paired with its position for messages.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    /// Label shown to callers ("ID", "Name", ...).
    pub label: &'static str,
}

impl ArgSpec {
    /// Creates a spec with the given label.
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }
}

/// Validated, positionally-addressed invocation arguments.
#[derive(Debug)]
pub struct Args<'a> {
    specs: &'static [ArgSpec],
    values: &'a [String],
}

impl<'a> Args<'a> {
    /// Checks the argument count, then that every argument is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidArgument`] on the first violation.
    pub fn parse(specs: &'static [ArgSpec], values: &'a [String]) -> RegistryResult<Self> {
        if values.len() != specs.len() {
            return Err(RegistryError::invalid_argument(format!(
                "Incorrect number of arguments. Expecting {}",
                specs.len()
            )));
        }

        for (position, (spec, value)) in specs.iter().zip(values).enumerate() {
            if value.is_empty() {
                return Err(RegistryError::invalid_argument(format!(
                    "{}: {} argument must be a non-empty string",
                    spec.label,
                    ordinal(position + 1)
                )));
            }
        }

        Ok(Self { specs, values })
    }

    /// Returns the argument at `position` as text.
    #[must_use]
    pub fn text(&self, position: usize) -> &'a str {
        self.values.get(position).map_or("", String::as_str)
    }

    /// Parses the argument at `position` as a signed 64-bit decimal id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidArgument`] if it is not one.
    pub fn id(&self, position: usize) -> RegistryResult<i64> {
        let label = self.specs.get(position).map_or("ID", |spec| spec.label);
        self.text(position).parse::<i64>().map_err(|_| {
            RegistryError::invalid_argument(format!(
                "{label}: {} argument must be a numeric 64bit of string",
                ordinal(position + 1)
            ))
        })
    }
}

/// English ordinal ("1st", "2nd", "3rd", "4th", ... "11th", "21st").
#[must_use]
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    const SPECS: &[ArgSpec] = &[ArgSpec::new("ID"), ArgSpec::new("Name"), ArgSpec::new("Address")];

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[rstest]
    #[case(&["1", "Ali"], "Incorrect number of arguments. Expecting 3")]
    #[case(&["1", "Ali", "Cairo", "x"], "Incorrect number of arguments. Expecting 3")]
    #[case(&["", "Ali", "Cairo"], "ID: 1st argument must be a non-empty string")]
    #[case(&["1", "", "Cairo"], "Name: 2nd argument must be a non-empty string")]
    #[case(&["1", "Ali", ""], "Address: 3rd argument must be a non-empty string")]
    fn rejects_shape_violations(#[case] values: &[&str], #[case] message: &str) {
        let values = owned(values);
        let err = Args::parse(SPECS, &values).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn count_is_checked_before_emptiness() {
        let values = owned(&["", ""]);
        let err = Args::parse(SPECS, &values).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect number of arguments. Expecting 3");
    }

    #[rstest]
    #[case("1", Some(1))]
    #[case("-42", Some(-42))]
    #[case("9223372036854775807", Some(i64::MAX))]
    #[case("9223372036854775808", None)]
    #[case("one", None)]
    #[case("1.5", None)]
    #[case(" 1", None)]
    fn parses_ids(#[case] raw: &str, #[case] expected: Option<i64>) {
        let values = owned(&[raw, "Ali", "Cairo"]);
        let args = Args::parse(SPECS, &values).unwrap();
        match expected {
            Some(id) => assert_eq!(args.id(0).unwrap(), id),
            None => assert_eq!(
                args.id(0).unwrap_err().to_string(),
                "ID: 1st argument must be a numeric 64bit of string"
            ),
        }
    }

    #[rstest]
    #[case(1, "1st")]
    #[case(2, "2nd")]
    #[case(3, "3rd")]
    #[case(4, "4th")]
    #[case(11, "11th")]
    #[case(12, "12th")]
    #[case(22, "22nd")]
    fn ordinals(#[case] n: usize, #[case] expected: &str) {
        assert_eq!(ordinal(n), expected);
    }
}
