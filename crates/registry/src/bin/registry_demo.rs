//! Replays a typical registry session against the in-memory ledger and
//! prints every response.
//!
//! Environment:
//!
//! - `RUST_LOG`: log filter (default `info`)
//! - `MEDLEDGER_LOG_FORMAT=json`: emit logs as JSON lines
//! - `MEDLEDGER_CONFIG`: path to a JSON [`RegistryConfig`] document

use std::{env, error::Error, sync::Arc};

use medledger_registry::{Registry, RegistryClient, RegistryConfig};
use medledger_storage::{MemoryBackend, StorageBackend};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const SESSION: &[&[&str]] = &[
    &["getPatientbyID", "1"],
    &["createPatient", "1", "Ali", "cairo"],
    &["getPatientbyID", "1"],
    &["updatePatientData", "1", "Ali Hassan", "Alex"],
    &["getPatientbyID", "1"],
    &["addPatientHistory", "1", "open heart surgery"],
    &["getPatientbyID", "1"],
    &["createDisease", "1", "Diabetes", "f_Diabetes"],
    &["getDiseasebyID", "1"],
    &["assignDiseaseToPatient", "1", "1"],
    &["assignDiseaseToPatient", "1", "1"],
    &["getPatientbyID", "1"],
    &["listPatientIDs"],
    &["getPatientHistorybyID", "1"],
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    let result = if env::var("MEDLEDGER_LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing init failed: {e}");
    }
}

fn load_config() -> Result<RegistryConfig, Box<dyn Error>> {
    match env::var("MEDLEDGER_CONFIG") {
        Ok(path) => {
            let document = std::fs::read_to_string(&path)?;
            Ok(RegistryConfig::from_json(&document)?)
        },
        Err(_) => Ok(RegistryConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let config = load_config()?;
    info!(chaincode = config.chaincode_id(), "starting registry demo");

    let backend = MemoryBackend::new();
    backend.health_check().await?;

    let registry = Arc::new(Registry::with_config(backend, config));
    println!("init -> {}", registry.init());

    let client = RegistryClient::new(Arc::clone(&registry));
    for call in SESSION {
        let Some((function, rest)) = call.split_first() else {
            continue;
        };
        let args: Vec<String> = rest.iter().map(|arg| (*arg).to_owned()).collect();
        let response = client.invoke(function, &args).await;
        println!("{function}{args:?} -> {response}");
    }

    info!(keys = registry.backend().key_count(), "registry demo finished");
    Ok(())
}
