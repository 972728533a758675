#![allow(clippy::expect_used, clippy::panic)]
//! Fault injection tests for ledger failures seen through the registry.
//!
//! These tests require the `failpoints` feature:
//! ```bash
//! cargo test -p medledger-registry --features failpoints --test failpoint_tests
//! ```

use std::{sync::Arc, time::Duration};

use medledger_registry::{Registry, RegistryClient, RegistryError, RetryConfig};
use medledger_storage::{MemoryBackend, StorageBackend};

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_retries(max_retries)
        .initial_backoff(Duration::from_millis(1))
        .max_backoff(Duration::from_millis(5))
        .build()
        .expect("retry config")
}

#[tokio::test]
async fn read_failure_is_passed_through_with_context() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("memory-get-state", "return").expect("failed to configure fail point");

    let registry = Registry::new(MemoryBackend::new());
    let response = registry.invoke("getPatientbyID", &args(&["1"])).await;

    assert!(!response.is_ok());
    assert_eq!(
        response.message,
        "Failed to get patient: Connection error: injected read failure for Patient-1"
    );

    scenario.teardown();
}

#[tokio::test]
async fn commit_failure_leaves_no_record_or_index() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("memory-commit", "return").expect("failed to configure fail point");

    let backend = MemoryBackend::new();
    let registry = Registry::new(backend.clone());
    let err = registry
        .try_invoke("createPatient", &args(&["1", "Ali", "Cairo"]))
        .await
        .expect_err("commit should fail");

    assert!(matches!(err, RegistryError::BackingStore { .. }), "got {err:?}");
    assert!(err.is_retryable());
    assert_eq!(backend.key_count(), 0);

    scenario.teardown();
}

#[tokio::test]
async fn missing_history_maps_to_not_found() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("memory-history-missing", "return").expect("failed to configure fail point");

    let registry = Registry::new(MemoryBackend::new());
    let err = registry
        .try_invoke("getPatientHistorybyID", &args(&["3"]))
        .await
        .expect_err("history should be missing");

    assert!(
        matches!(err, RegistryError::NotFound { entity: "patient", ref key } if key == "Patient-3"),
        "got {err:?}"
    );
    assert_eq!(err.to_string(), "patient does not exist");

    scenario.teardown();
}

#[tokio::test]
async fn client_retries_transient_commit_failure() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("memory-commit", "2*return->off").expect("failed to configure fail point");

    let backend = MemoryBackend::new();
    let client =
        RegistryClient::new(Arc::new(Registry::new(backend.clone()))).with_retry(fast_retry(3));

    client
        .submit("createDisease", &args(&["7", "Diabetes", "desc"]))
        .await
        .expect("third attempt commits");
    assert!(backend.get("Disease-7").await.expect("get").is_some());

    scenario.teardown();
}

#[tokio::test]
async fn client_gives_up_after_max_retries() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("memory-commit", "return").expect("failed to configure fail point");

    let backend = MemoryBackend::new();
    let client =
        RegistryClient::new(Arc::new(Registry::new(backend.clone()))).with_retry(fast_retry(2));

    let response = client.invoke("createDisease", &args(&["7", "Diabetes", "desc"])).await;
    assert!(!response.is_ok());
    assert!(response.message.starts_with("Failed to commit transaction"), "{}", response.message);
    assert_eq!(backend.key_count(), 0);

    scenario.teardown();
}
