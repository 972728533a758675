//! Ledger abstraction for the MedLedger registry.
//!
//! This crate provides the [`StorageBackend`] and [`Transaction`] traits the
//! registry uses to reach its transactional key-value ledger, together with
//! the canonical [`StorageError`] taxonomy, composite key encoding for
//! secondary indexes, and per-key version history types.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   medledger-registry                        │
//! │   Dispatcher │ Registry operations │ History formatter      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   medledger-storage                         │
//! │        StorageBackend trait │ Transaction trait             │
//! │  (get_state, put_state, composite keys, history, commit)    │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryBackend│        External ledger backends              │
//! │   (testing)  │   (consensus, replication, persistence)      │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use medledger_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::new();
//!
//!     let mut txn = backend.transaction().await?;
//!     txn.put_state("Patient-1", br#"{"id":1}"#.to_vec())?;
//!     txn.commit().await?;
//!
//!     let versions: Vec<_> = backend.get_history_for_key("Patient-1").await?.collect();
//!     assert_eq!(versions.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module (manual clock, seeded backends, assertion
//!   macros).
//! - **`failpoints`**: Activates the fail points compiled into [`MemoryBackend`]
//!   (`memory-get-state`, `memory-commit`, `memory-history-missing`).

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod clock;
pub mod composite_key;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod transaction;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backend::StorageBackend;
pub use clock::{Clock, SystemClock};
pub use composite_key::{create_composite_key, split_composite_key};
pub use error::{BoxError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use transaction::Transaction;
pub use types::{HistoryIterator, KeyModification, KeyValue, TxId};
