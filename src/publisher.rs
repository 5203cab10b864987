// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event publication
//!
//! Services hand every committed event to an [`EventPublisher`]. Publication
//! happens after the store commit: a failed publish is logged by the caller
//! and never undoes the committed change.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::MessagingResult;
use crate::events::IpamEvent;
use crate::nats::NatsClient;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &IpamEvent) -> MessagingResult<()>;
}

/// Publisher that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPublisher;

#[async_trait]
impl EventPublisher for NullPublisher {
    async fn publish(&self, event: &IpamEvent) -> MessagingResult<()> {
        debug!(event_type = event.event_type_name(), "event bus disabled, dropping event");
        Ok(())
    }
}

/// Publisher that keeps events in memory, in publication order
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<IpamEvent>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<IpamEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, event: &IpamEvent) -> MessagingResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Publishes each event as JSON on its own subject
#[derive(Clone)]
pub struct NatsPublisher {
    client: NatsClient,
}

impl NatsPublisher {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &IpamEvent) -> MessagingResult<()> {
        self.client.publish(&event.subject(), event).await
    }
}
