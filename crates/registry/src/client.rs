//! Caller-side retry around [`Registry`] invocations.
//!
//! Operations never retry internally. A read-modify-write that loses a
//! commit race fails with a ledger conflict, and because every operation is
//! free of side effects outside its own transaction, the caller may simply
//! run it again from scratch. [`RegistryClient`] does that for errors where
//! [`RegistryError::is_retryable`](crate::RegistryError::is_retryable) holds.
//!
//! # Backoff Strategy
//!
//! - Base delay doubles with each attempt: `initial_backoff * 2^attempt`
//! - Delay is capped at `max_backoff`
//! - Random jitter of 0–50% of the computed delay is added so racing
//!   clients spread out

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use medledger_storage::StorageBackend;
use rand::Rng;
use tracing::{debug, warn};

use crate::{
    config::RetryConfig,
    error::RegistryResult,
    registry::Registry,
    response::Response,
};

/// Retrying handle to a shared [`Registry`].
#[derive(Debug)]
pub struct RegistryClient<B> {
    registry: Arc<Registry<B>>,
    retry: RetryConfig,
}

impl<B> Clone for RegistryClient<B> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry), retry: self.retry.clone() }
    }
}

impl<B: StorageBackend> RegistryClient<B> {
    /// Creates a client using the registry's configured retry policy.
    #[must_use]
    pub fn new(registry: Arc<Registry<B>>) -> Self {
        let retry = registry.config().retry().clone();
        Self { registry, retry }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the wrapped registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry<B>> {
        &self.registry
    }

    /// Runs an invocation, re-running it on retryable failures.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last retryable one once
    /// `max_retries` is exhausted.
    #[tracing::instrument(skip(self, args), fields(max_retries = self.retry.max_retries))]
    pub async fn submit(&self, function: &str, args: &[String]) -> RegistryResult<Option<Bytes>> {
        let mut attempt = 0;
        loop {
            match self.registry.try_invoke(function, args).await {
                Ok(payload) => {
                    if attempt > 0 {
                        debug!(function, attempt = attempt + 1, "invocation succeeded after retry");
                    }
                    return Ok(payload);
                },
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = compute_backoff(&self.retry, attempt);
                    debug!(
                        function,
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retryable failure, re-running after backoff",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => {
                    if err.is_retryable() {
                        warn!(function, attempts = attempt + 1, error = %err, "retries exhausted");
                    }
                    return Err(err);
                },
            }
        }
    }

    /// [`submit`](Self::submit), folded into a [`Response`].
    pub async fn invoke(&self, function: &str, args: &[String]) -> Response {
        match self.submit(function, args).await {
            Ok(payload) => Response::success(payload),
            Err(err) => Response::error(err.to_string()),
        }
    }
}

/// Delay before retry number `attempt` (0-based).
fn compute_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.initial_backoff.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let capped = base.min(config.max_backoff);

    let jitter_range = capped.as_millis() as u64 / 2;
    if jitter_range > 0 {
        let jitter = rand::rng().random_range(0..=jitter_range);
        capped + Duration::from_millis(jitter)
    } else {
        capped
    }
}
