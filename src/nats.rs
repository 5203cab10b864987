//! NATS client for the IPAM event bus

use async_nats::{Client, ConnectOptions, Subscriber};
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{MessagingError, MessagingResult};
use crate::events::IpamEvent;

/// Configuration for NATS connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "dcim-ipam".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// NATS client wrapper publishing and consuming IPAM events as JSON
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    pub async fn new(config: NatsConfig) -> MessagingResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout);

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| MessagingError::NatsConnection(e.to_string()))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Publish a JSON message to a subject
    pub async fn publish<T>(&self, subject: &str, message: &T) -> MessagingResult<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| MessagingError::NatsPublish(e.to_string()))?;

        debug!("Published message to subject: {}", subject);
        Ok(())
    }

    pub async fn subscribe(&self, subject: &str) -> MessagingResult<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| MessagingError::NatsSubscribe(e.to_string()))?;

        info!("Subscribed to subject: {}", subject);
        Ok(subscriber)
    }

    /// Wait for the next decodable IPAM event on a subscription
    ///
    /// Payloads that do not decode are logged and skipped. Returns `None`
    /// when the subscription closes.
    pub async fn next_event(subscriber: &mut Subscriber) -> Option<IpamEvent> {
        while let Some(msg) = subscriber.next().await {
            match decode_event(&msg.payload) {
                Ok(event) => return Some(event),
                Err(e) => warn!("Skipping message on {}: {}", msg.subject, e),
            }
        }
        None
    }

    /// Flush buffered publishes to the server
    pub async fn flush(&self) -> MessagingResult<()> {
        self.client
            .flush()
            .await
            .map_err(|e| MessagingError::NatsPublish(e.to_string()))
    }
}

/// Decode an event payload as published by [`NatsClient::publish`]
pub fn decode_event(payload: &[u8]) -> MessagingResult<IpamEvent> {
    serde_json::from_slice(payload).map_err(|e| MessagingError::Deserialization(e.to_string()))
}
