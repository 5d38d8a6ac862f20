//! # CoachFlow Gateway Runtime
//!
//! Server entrypoint for the encrypted interactive-form exchange gateway.
//!
//! ## Startup Sequence
//!
//! 1. Initialize tracing (filter from `FLOW_LOG`, default `info`)
//! 2. Load configuration from `FLOW_*` environment variables
//! 3. Construct the in-memory stores and the gateway service
//! 4. Bind and serve until Ctrl-C
//!
//! Sessions live in volatile memory by design; a restart drops all
//! in-progress flows and the remote client restarts them.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flow_gateway::{
    CompletionSink, FlowGatewayService, GatewayConfig, InMemoryCompletionSink,
    InMemoryTokenMetadata, TokenMetadataStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FLOW_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting CoachFlow gateway runtime");

    let config = GatewayConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    if config.app_secret.is_none() {
        warn!("FLOW_APP_SECRET not set; inbound requests will not be signature-checked");
    }

    let metadata: Arc<dyn TokenMetadataStore> = Arc::new(InMemoryTokenMetadata::new());
    let sink: Arc<dyn CompletionSink> = Arc::new(InMemoryCompletionSink::new());

    let mut service = FlowGatewayService::new(config, metadata, sink)
        .context("Failed to construct the flow gateway")?;
    service.start().await.context("Failed to start the flow gateway")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");
    service.stop();

    Ok(())
}
