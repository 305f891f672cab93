//! Platon cube loader
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - PLATON_PROM_ADDRESS: Prometheus host (default: localhost)
//! - PLATON_PROM_PORT: Prometheus port (default: 9090)
//! - PLATON_PROM_SSL: Use https (default: false)
//! - PLATON_QUERY_STEP_SECS: Range query resolution (default: 60)
//! - PLATON_QUERY_TIMEOUT_SECS: Per-query timeout (default: 5)
//! - PLATON_LOOKBACK_SECS: Query window reaching back from now (default: 3600)
//! - PLATON_COLUMN_ORDER: first_seen or sorted (default: first_seen)
//! - PLATON_SORT_ROWS: Sort rows by time before writing (default: false)
//! - PLATON_REJECT_DUPLICATES: Fail on two samples for one metric and timestamp (default: false)
//! - PLATON_MAX_MEMORY_MB: Storage memory budget in MB (default: 1024)
//! - PLATON_CUBES_FILE: JSON file of cube definitions (default: node memory cube)
//! - RUST_LOG: Log level (default: info)

use platon::cube::{load_cubes_file, Cube, CubeLoader, LoaderConfig};
use platon::source::{query_window, MetricSource, PromClient, SourceConfig};
use platon::storage::StorageEngine;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let source_config = SourceConfig::from_env();
    let loader_config = LoaderConfig::from_env();
    let max_memory_bytes = std::env::var("PLATON_MAX_MEMORY_MB")
        .ok()
        .and_then(|m| m.parse::<usize>().ok())
        .map(|mb| mb * 1024 * 1024)
        .unwrap_or(1024 * 1024 * 1024);

    let cubes = match std::env::var("PLATON_CUBES_FILE") {
        Ok(path) => load_cubes_file(&path)?,
        Err(_) => vec![Cube::node_memory()],
    };

    tracing::info!("Platon configuration:");
    tracing::info!("  Prometheus: {}", source_config.url());
    tracing::info!(
        "  Step: {}s, timeout: {}s",
        source_config.step_secs,
        source_config.query_timeout_secs
    );
    tracing::info!("  Lookback: {} seconds", loader_config.lookback_secs);
    tracing::info!("  Max memory: {} MB", max_memory_bytes / (1024 * 1024));
    tracing::info!("  Cubes: {}", cubes.len());
    for cube in &cubes {
        tracing::info!("    - {} ({} metrics)", cube.name, cube.metrics.len());
    }

    let client = PromClient::from_config(&source_config)?;
    let engine = Arc::new(StorageEngine::with_memory_limit(max_memory_bytes));

    let (start, end) = query_window(chrono::Utc::now(), loader_config.lookback());
    match client.list_metric_names(start, end).await {
        Ok(names) => tracing::info!("Prometheus reports {} metric names", names.len()),
        Err(e) => tracing::warn!("Could not list metric names: {}", e),
    }

    let loader = CubeLoader::new(client, Arc::clone(&engine), loader_config);
    let results = loader.load_all(&cubes).await;

    let mut failed = 0;
    for (cube, result) in cubes.iter().zip(results) {
        if let Err(e) = result {
            failed += 1;
            tracing::error!("Cube '{}' failed to load: {}", cube.name, e);
        }
    }

    for stats in engine.all_table_stats() {
        tracing::info!(
            "Table '{}': {} rows, {} label columns, {} metric columns, {} bytes",
            stats.name,
            stats.row_count,
            stats.label_columns,
            stats.metric_columns,
            stats.memory_bytes
        );
    }

    if failed > 0 {
        return Err(format!("{} of {} cubes failed to load", failed, cubes.len()).into());
    }

    Ok(())
}
