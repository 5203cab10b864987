// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM API Server
//!
//! Serves the pool, address and inventory API over HTTP with an in-memory
//! store. When `NATS_URL` is set, every committed change is published on
//! `ipam.<aggregate>.<id>.<operation>`.
//!
//! Run with: cargo run --bin ipam-server

use anyhow::{Context, Result};
use dcim_ipam::{
    api, EventPublisher, Ipam, IpamConfig, MemoryStore, NatsClient, NatsPublisher, NullPublisher,
    ServiceContext,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = IpamConfig::from_env().context("Invalid configuration")?;
    info!(
        listen = %config.listen_addr,
        retry_attempts = config.retry.max_attempts,
        retry_backoff_ms = config.retry.backoff.as_millis() as u64,
        "Starting IPAM server"
    );

    let publisher: Arc<dyn EventPublisher> = match &config.nats {
        Some(nats) => {
            let client = NatsClient::new(nats.clone())
                .await
                .context("Failed to connect to NATS")?;
            Arc::new(NatsPublisher::new(client))
        }
        None => {
            warn!("NATS_URL not set, events will not be published");
            Arc::new(NullPublisher)
        }
    };

    let ipam = Ipam::new(ServiceContext::new(
        Arc::new(MemoryStore::new()),
        publisher,
        config.retry,
    ));

    api::serve(ipam, config.listen_addr)
        .await
        .context("HTTP server failed")?;
    Ok(())
}
