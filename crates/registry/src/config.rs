//! Configuration for the registry and its retrying client.
//!
//! [`RegistryConfig`] can be built in code through its builder or
//! deserialized from JSON. Both paths run the same validation.
//!
//! ```
//! use std::time::Duration;
//!
//! use medledger_registry::{RegistryConfig, RetryConfig};
//!
//! let config = RegistryConfig::builder()
//!     .chaincode_id("patientssys")
//!     .retry(
//!         RetryConfig::builder()
//!             .max_retries(5)
//!             .initial_backoff(Duration::from_millis(10))
//!             .build()?,
//!     )
//!     .build()?;
//! assert_eq!(config.chaincode_id(), "patientssys");
//!
//! let parsed = RegistryConfig::from_json(r#"{"retry": {"initial_backoff": "20ms"}}"#)?;
//! assert_eq!(parsed.retry().initial_backoff, Duration::from_millis(20));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chaincode id the registry is deployed under.
pub const DEFAULT_CHAINCODE_ID: &str = "patientssys";

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Default cap on a single retry delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required text field is empty.
    #[error("{field} cannot be empty")]
    Empty {
        /// Field name.
        field: &'static str,
    },

    /// A value is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Field name.
        field: &'static str,
        /// Smallest allowed value.
        min: String,
        /// Rejected value.
        value: String,
    },

    /// One value exceeds another that bounds it.
    #[error("{field} ({value}) must not exceed {bound_field} ({bound})")]
    ExceedsBound {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Field holding the bound.
        bound_field: &'static str,
        /// Bound value.
        bound: String,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Retry policy for [`RegistryClient`](crate::RegistryClient).
///
/// The delay before retry `n` (0-based) is `initial_backoff * 2^n`, capped
/// at `max_backoff`, plus up to 50% random jitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry.
    #[serde(with = "humantime_serde", default = "default_initial_backoff")]
    pub initial_backoff: Duration,

    /// Upper bound on a single delay, before jitter.
    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    pub max_backoff: Duration,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_initial_backoff() -> Duration {
    DEFAULT_INITIAL_BACKOFF
}

fn default_max_backoff() -> Duration {
    DEFAULT_MAX_BACKOFF
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

#[bon::bon]
impl RetryConfig {
    /// Creates a retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `initial_backoff` is zero or greater than
    /// `max_backoff`.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_MAX_RETRIES)] max_retries: u32,
        #[builder(default = DEFAULT_INITIAL_BACKOFF)] initial_backoff: Duration,
        #[builder(default = DEFAULT_MAX_BACKOFF)] max_backoff: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self { max_retries, initial_backoff, max_backoff };
        config.validate()?;
        Ok(config)
    }

    /// Checks the policy's invariants.
    ///
    /// # Errors
    ///
    /// See [`RetryConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_backoff.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "initial_backoff",
                min: "1ms".into(),
                value: format!("{:?}", self.initial_backoff),
            });
        }
        if self.initial_backoff > self.max_backoff {
            return Err(ConfigError::ExceedsBound {
                field: "initial_backoff",
                value: format!("{:?}", self.initial_backoff),
                bound_field: "max_backoff",
                bound: format!("{:?}", self.max_backoff),
            });
        }
        Ok(())
    }
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Name the registry is deployed under; recorded on every invocation span.
    #[serde(default = "default_chaincode_id")]
    pub(crate) chaincode_id: String,

    /// Client-side retry policy.
    #[serde(default)]
    pub(crate) retry: RetryConfig,
}

fn default_chaincode_id() -> String {
    DEFAULT_CHAINCODE_ID.to_owned()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { chaincode_id: default_chaincode_id(), retry: RetryConfig::default() }
    }
}

#[bon::bon]
impl RegistryConfig {
    /// Creates a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `chaincode_id` is empty or `retry` is
    /// invalid.
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_CHAINCODE_ID.to_owned())] chaincode_id: String,
        #[builder(default)] retry: RetryConfig,
    ) -> Result<Self, ConfigError> {
        let config = Self { chaincode_id, retry };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON configuration document. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON or unknown fields,
    /// otherwise any validation error.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// See [`RegistryConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chaincode_id.is_empty() {
            return Err(ConfigError::Empty { field: "chaincode_id" });
        }
        self.retry.validate()
    }

    /// Returns the deployment name.
    #[must_use]
    pub fn chaincode_id(&self) -> &str {
        &self.chaincode_id
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}
