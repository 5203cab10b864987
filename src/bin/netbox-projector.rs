// Copyright (c) 2025 - Cowboy AI, Inc.
//! NetBox Projector Service
//!
//! Subscribes to IPAM events on NATS and projects them into NetBox:
//! - Events → NATS (`ipam.>`) → NetBox Projection Adapter → NetBox API
//!
//! Run with: cargo run --bin netbox-projector --features netbox
//!
//! Prerequisites:
//! 1. NATS server running (NATS_URL, default: localhost:4222)
//! 2. NetBox API accessible (NETBOX_URL)
//! 3. NetBox API token set (NETBOX_API_TOKEN)

use anyhow::{Context, Result};
use dcim_ipam::{
    adapters::{NetBoxConfig, NetBoxProjectionAdapter},
    projection::ProjectionAdapter,
    subjects::SubjectBuilder,
    NatsClient, NatsConfig,
};
use tracing::{error, info, warn};

/// Configuration for the NetBox projector service
#[derive(Debug, Clone)]
struct ProjectorConfig {
    nats: NatsConfig,
    netbox: NetBoxConfig,
}

impl ProjectorConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let nats = NatsConfig {
            servers: vec![std::env::var("NATS_URL").unwrap_or_else(|_| "localhost:4222".to_string())],
            name: std::env::var("NATS_CLIENT_NAME")
                .unwrap_or_else(|_| "netbox-projector".to_string()),
            ..NatsConfig::default()
        };

        let defaults = NetBoxConfig::default();
        let netbox = NetBoxConfig {
            base_url: std::env::var("NETBOX_URL").unwrap_or(defaults.base_url),
            api_token: std::env::var("NETBOX_API_TOKEN").context("NETBOX_API_TOKEN not set")?,
            timeout_secs: match std::env::var("NETBOX_TIMEOUT_SECS") {
                Ok(raw) => raw
                    .parse()
                    .with_context(|| format!("Invalid NETBOX_TIMEOUT_SECS: {}", raw))?,
                Err(_) => defaults.timeout_secs,
            },
        };

        Ok(Self { nats, netbox })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting NetBox projector");

    let config = ProjectorConfig::from_env()?;
    info!("NATS: {:?}", config.nats.servers);
    info!("NetBox URL: {}", config.netbox.base_url);

    let client = NatsClient::new(config.nats.clone())
        .await
        .context("Failed to connect to NATS")?;

    let mut adapter = NetBoxProjectionAdapter::new(config.netbox.clone())
        .await
        .context("Failed to create NetBox adapter")?;
    adapter
        .initialize()
        .await
        .context("Failed to initialize NetBox adapter")?;
    info!("{} ready", adapter.name());

    let mut subscriber = client
        .subscribe(&SubjectBuilder::build_all())
        .await
        .context("Failed to subscribe to IPAM events")?;

    let mut event_count = 0u64;
    let mut error_count = 0u64;

    while let Some(event) = NatsClient::next_event(&mut subscriber).await {
        let event_id = event.event_id();
        let event_type = event.event_type_name();

        match adapter.project(event).await {
            Ok(()) => {
                event_count += 1;
                info!("Projected {} ({}), total {}", event_type, event_id, event_count);
            }
            Err(e) => {
                error_count += 1;
                error!(
                    "Failed to project {} ({}): {} (total errors: {})",
                    event_type, event_id, e, error_count
                );
            }
        }

        if (event_count + error_count) % 100 == 0 {
            info!("Statistics: {} events projected, {} errors", event_count, error_count);
        }
    }

    warn!("Event subscription ended");
    Ok(())
}
