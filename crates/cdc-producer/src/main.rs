//! Binary entry point. A thin bootstrap only: config-file loading, bus
//! client connection, and process wiring. Everything else — CLI argument
//! parsing beyond a bare config path, credential/TLS setup, and linking the
//! source database's real commit-log reader library — is out of scope and
//! is a deployment's job, not this crate's.

use std::env;
use std::fs;
use std::sync::Arc;

use uuid::Uuid;

use cdc_commitlog::parser::UnimplementedParser;
use cdc_extract::metadata::TableMetadataV4;
use cdc_extract::raw::RawMutation;
use cdc_producer::{Pipeline, ProducerConfig, SourceContext};
use cdc_publish::PulsarBusClient;

fn main() -> anyhow::Result<()> {
    cdc_producer::logging::init();

    let config_path = env::args().nth(1).ok_or_else(|| anyhow::anyhow!("usage: cdc-producer <config.toml>"))?;
    let config_text = fs::read_to_string(&config_path).map_err(|e| anyhow::anyhow!("failed to read {config_path}: {e}"))?;
    let config = ProducerConfig::from_toml_str(&config_text)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    // A real deployment would source these from the database's own
    // cluster identity, not generate them fresh.
    let local_host_id = Uuid::new_v4().to_string();
    let context = SourceContext::new("unnamed-cluster", local_host_id.clone(), Uuid::new_v4());

    let bus = runtime.block_on(PulsarBusClient::connect(&config.pulsar_service_url, local_host_id))?;
    let bus = Arc::new(bus);

    // `UnimplementedParser` stands in for the source database's real
    // commit-log reader library until a deployment links one; every segment
    // fails loudly rather than being silently discarded.
    let parser = UnimplementedParser::<RawMutation<TableMetadataV4>>::new();

    let pipeline = Pipeline::spawn(&config, parser, bus, context, runtime.handle().clone())?;

    tracing::info!("cdc producer running");
    pipeline.join()
}
