//! Whalefeed Server
//!
//! Ingests large ERC-20 transfer webhooks, deduplicates them, and fans
//! paced batches out to connected dashboard clients.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::SourceMode;
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use whalefeed_core::events::{payload_channel, shutdown_channel};
use whalefeed_core::lookup::{LabelBook, PriceBook};
use whalefeed_core::pipeline::Pipeline;
use whalefeed_core::processors::{LedgerPruner, PollIngestor, PushIngestor, Releaser};
use whalefeed_core::source::HttpPayloadSource;

/// Whalefeed - whale transfer ingestion and fan-out server
#[derive(Parser, Debug)]
#[command(name = "whalefeed-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./whalefeed.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting whalefeed-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let file_config = config::load(&args.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = args.listen.unwrap_or(file_config.server.listen);
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Build the pipeline and its lookups
    let prices = PriceBook::from_pairs(file_config.prices.clone());
    let labels = LabelBook::from_pairs(file_config.labels.clone());
    tracing::info!(
        prices = prices.len(),
        labels = labels.len(),
        "Lookup books loaded"
    );
    let pipeline = Arc::new(Pipeline::new(
        file_config.pipeline.to_pipeline_config(),
        prices,
        labels,
    ));

    // Spawn the processors
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let payload_tx = match file_config.source.mode {
        SourceMode::Push => {
            let (payload_tx, payload_rx) = payload_channel();
            tasks.push(tokio::spawn(
                PushIngestor::new(pipeline.clone()).run(shutdown_rx.clone(), payload_rx),
            ));
            Some(payload_tx)
        }
        SourceMode::Poll => {
            let endpoint = file_config
                .source
                .endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("poll mode requires source.endpoint"))?;
            tracing::info!(%endpoint, "Polling remote intake endpoint");
            let source = HttpPayloadSource::new(endpoint);
            tasks.push(tokio::spawn(
                PollIngestor::new(pipeline.clone(), Box::new(source)).run(shutdown_rx.clone()),
            ));
            None
        }
    };
    tasks.push(tokio::spawn(
        Releaser::new(pipeline.clone()).run(shutdown_rx.clone()),
    ));
    tasks.push(tokio::spawn(
        LedgerPruner::new(pipeline.clone()).run(shutdown_rx.clone()),
    ));

    // Build the router
    let state = AppState::new(pipeline, payload_tx);
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the processors and wait for them to drain
    tracing::info!("Signaling processors to stop");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }

    tracing::info!("Server shutdown complete");
    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
