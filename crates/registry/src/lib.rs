//! Patient and disease registry kept on a transactional ledger.
//!
//! The registry stores patient and disease records as JSON under namespaced
//! keys, keeps a composite-key index per entity for ordered enumeration, and
//! exposes its operations by name through [`Registry::invoke`]. All
//! persistence goes through the [`medledger_storage`] traits, so the same
//! code runs against the in-memory ledger in tests and a real ledger in
//! production.
//!
//! # Quick Start
//!
//! ```
//! use medledger_registry::Registry;
//! use medledger_storage::MemoryBackend;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = Registry::new(MemoryBackend::new());
//! let args = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
//!
//! assert!(registry.invoke("createPatient", &args(&["1", "Ali", "Cairo"])).await.is_ok());
//!
//! let response = registry.invoke("getPatientbyID", &args(&["1"])).await;
//! let patient: serde_json::Value = serde_json::from_slice(&response.payload).unwrap();
//! assert_eq!(patient["name"], "ali");
//! # });
//! ```
//!
//! # Modules
//!
//! - [`keys`]: primary and index key derivation
//! - [`model`]: record types and their encoding
//! - [`operations`]: one [`Handler`] per operation
//! - [`history`]: version history reports
//! - [`registry`]: name-based dispatch and transaction lifecycle
//! - [`client`]: caller-side retry
//!
//! # Feature Flags
//!
//! - **`failpoints`**: Activates the storage crate's fail points for fault
//!   injection tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod args;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod keys;
pub mod model;
pub mod operations;
pub mod registry;
pub mod response;

pub use client::RegistryClient;
pub use config::{ConfigError, RegistryConfig, RetryConfig};
pub use error::{RegistryError, RegistryResult};
pub use keys::Entity;
pub use model::{Disease, Operation, Patient, Record};
pub use operations::Handler;
pub use registry::Registry;
pub use response::{Response, Status};
