//! Name-based dispatch of registry operations over a ledger backend.
//!
//! [`Registry::invoke`] is the whole lifecycle of one invocation: begin a
//! transaction, route to the named [`Handler`], commit if it succeeded, and
//! fold the outcome into a [`Response`]. Hosts that manage their own
//! transactions call [`Registry::execute`] instead.

use std::{collections::BTreeMap, fmt, sync::Arc};

use bytes::Bytes;
use medledger_storage::{StorageBackend, Transaction};
use tracing::{debug, warn};

use crate::{
    config::RegistryConfig,
    error::{RegistryError, RegistryResult},
    operations::{Handler, builtin_handlers},
    response::Response,
};

/// Patient and disease registry bound to one ledger backend.
pub struct Registry<B> {
    backend: B,
    handlers: BTreeMap<&'static str, Arc<dyn Handler>>,
    ordered_names: Vec<&'static str>,
    config: RegistryConfig,
}

impl<B: StorageBackend> Registry<B> {
    /// Creates a registry with the built-in operations and default configuration.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RegistryConfig::default())
    }

    /// Creates a registry with the built-in operations.
    #[must_use]
    pub fn with_config(backend: B, config: RegistryConfig) -> Self {
        let mut registry =
            Self { backend, handlers: BTreeMap::new(), ordered_names: Vec::new(), config };
        for handler in builtin_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Adds (or replaces) a handler under its own name.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        let name = handler.name();
        if self.handlers.insert(name, handler).is_none() {
            self.ordered_names.push(name);
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Names of every registered operation, in registration order.
    pub fn operation_names(&self) -> &[&'static str] {
        &self.ordered_names
    }

    /// Instantiation hook. There is no state to seed, so this always succeeds.
    #[tracing::instrument(skip(self), fields(chaincode = %self.config.chaincode_id()))]
    pub fn init(&self) -> Response {
        debug!("registry initialized");
        Response::success(None)
    }

    /// Runs one invocation in its own transaction and reports the outcome.
    ///
    /// Never panics and never returns a Rust error: every failure becomes a
    /// [`Response::error`].
    #[tracing::instrument(
        skip(self, args),
        fields(chaincode = %self.config.chaincode_id(), args = args.len())
    )]
    pub async fn invoke(&self, function: &str, args: &[String]) -> Response {
        match self.try_invoke(function, args).await {
            Ok(payload) => Response::success(payload),
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "invocation rejected");
                Response::error(err.to_string())
            },
        }
    }

    /// Like [`invoke`](Self::invoke), but keeps the typed error so callers
    /// can decide whether to retry.
    ///
    /// # Errors
    ///
    /// Returns the handler's error, or [`RegistryError::BackingStore`] if
    /// the transaction cannot be opened or committed. Nothing is committed
    /// when an error is returned.
    pub async fn try_invoke(&self, function: &str, args: &[String]) -> RegistryResult<Option<Bytes>> {
        let handler = self.handler(function)?;

        let mut txn = self
            .backend
            .transaction()
            .await
            .map_err(|e| RegistryError::backing_store("Failed to begin transaction", e))?;
        let tx_id = txn.tx_id().clone();

        let payload = handler.handle(txn.as_mut(), args).await?;

        txn.commit()
            .await
            .map_err(|e| RegistryError::backing_store("Failed to commit transaction", e))?;
        debug!(function, tx_id = %tx_id, "invocation committed");
        Ok(payload)
    }

    /// Runs one operation inside a transaction owned by the caller. The
    /// caller commits or drops it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownOperation`] for an unregistered name,
    /// otherwise the handler's error.
    pub async fn execute(
        &self,
        txn: &mut dyn Transaction,
        function: &str,
        args: &[String],
    ) -> RegistryResult<Option<Bytes>> {
        let handler = self.handler(function)?;
        handler.handle(txn, args).await
    }

    fn handler(&self, function: &str) -> RegistryResult<Arc<dyn Handler>> {
        self.handlers.get(function).cloned().ok_or_else(|| RegistryError::UnknownOperation {
            name: function.to_owned(),
            expected: self
                .ordered_names
                .iter()
                .map(|name| format!("{name:?}"))
                .collect::<Vec<_>>()
                .join(" "),
        })
    }
}

impl<B> fmt::Debug for Registry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.ordered_names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
