// Copyright (c) 2025 - Cowboy AI, Inc.

//! Projection Adapters: IPAM Events → Read Models
//!
//! A projection consumes the event stream published on `ipam.>` and keeps
//! a read model in some target system up to date.
//!
//! ```text
//! IpamEvent stream ──project──> Target state
//!    [e1, e2, e3]                [u1, u2, u3]
//! ```
//!
//! Implementations must preserve:
//! - **Event order**: events are applied in the order received
//! - **Idempotency**: re-applying an event (same `event_id`) is harmless
//!
//! The NetBox adapter (feature `netbox`) mirrors pools and addresses into
//! NetBox. In-process queries go to the store through `AddressLookup`.

use async_trait::async_trait;
use thiserror::Error;

#[async_trait]
pub trait ProjectionAdapter: Send + Sync {
    /// The event type this projection handles
    type Event: Send + Sync;

    /// Error type for projection operations
    type Error: std::error::Error + Send + Sync;

    /// Apply one event to the target
    ///
    /// Calling `project` with the same event twice must be safe.
    async fn project(&mut self, event: Self::Event) -> Result<(), Self::Error>;

    /// Prepare the target (connectivity, schema). Safe to call repeatedly.
    async fn initialize(&mut self) -> Result<(), Self::Error>;

    async fn health_check(&self) -> Result<(), Self::Error>;

    /// Clear all projected state
    async fn reset(&mut self) -> Result<(), Self::Error>;

    fn name(&self) -> &str;
}

/// Errors that can occur during projection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("Projection target unavailable: {0}")]
    TargetUnavailable(String),

    /// Event cannot be projected (malformed, missing references)
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Target rejected update: {0}")]
    TargetError(String),

    #[error("Reset operation not supported by this projection")]
    ResetNotSupported,
}
