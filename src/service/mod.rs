// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for IP Address Management
//!
//! This module provides the application services that orchestrate the pure
//! decision functions, the record store, and event publication.
//!
//! # Architecture
//!
//! ```text
//! Client Request (HTTP)
//!     ↓
//! Service Layer (this module)
//!     ↓
//! Store snapshot → Decision (aggregate) → Change
//!     ↓
//! Store commit (version-checked, retried on conflict)
//!     ↓
//! EventPublisher (NATS)
//!     ↓
//! Projections (NetBox)
//! ```
//!
//! # Services
//!
//! - [`PoolRegistry`]: pool creation and listing
//! - [`AddressLedger`]: allocate and release
//! - [`DeviceBinding`]: inventory and rack placement
//! - [`AddressLookup`]: read-only queries
//!
//! # Transaction Semantics
//!
//! Each mutating call is one transaction:
//! 1. Read a snapshot from the store
//! 2. Decide the change (pure function, `now` passed in)
//! 3. Commit with the snapshot's versions
//! 4. Publish the resulting event
//!
//! A commit that loses a race is retried from step 1 under the configured
//! [`RetryPolicy`]. Publication failures are logged and do not fail the call.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::errors::IpamResult;
use crate::events::IpamEvent;
use crate::publisher::{EventPublisher, NullPublisher};
use crate::store::{InventoryStore, MemoryStore};

pub mod binding;
pub mod ledger;
pub mod lookup;
pub mod pool_registry;

pub use binding::{
    DataCenterTree, DeviceBinding, DeviceLocation, DeviceMatch, RackTree, RackedDevice, RoomTree,
};
pub use ledger::AddressLedger;
pub use lookup::{AddressLookup, AddressOwner, DeviceAddress, PoolAddresses};
pub use pool_registry::PoolRegistry;

/// Handles shared by every service
#[derive(Clone)]
pub struct ServiceContext {
    store: Arc<dyn InventoryStore>,
    publisher: Arc<dyn EventPublisher>,
    retry: RetryPolicy,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        publisher: Arc<dyn EventPublisher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            publisher,
            retry,
        }
    }

    pub fn store(&self) -> &dyn InventoryStore {
        self.store.as_ref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Publish a committed event, logging failures
    pub(crate) async fn emit(&self, event: IpamEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            warn!(
                event_type = event.event_type_name(),
                event_id = %event.event_id(),
                "Failed to publish event: {}",
                e
            );
        }
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error,
    /// or the retry policy is used up
    pub(crate) async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> IpamResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = IpamResult<T>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(e) if e.is_retryable() && tries < self.retry.max_attempts => {
                    debug!(operation, attempt = tries, "Retrying after conflict: {}", e);
                    tokio::time::sleep(self.retry.delay_for(tries)).await;
                    tries += 1;
                }
                Err(e) if e.is_retryable() => {
                    warn!(operation, attempts = tries, "Giving up after conflicts: {}", e);
                    return Err(e);
                }
                result => return result,
            }
        }
    }
}

/// All four services over one store and publisher
#[derive(Clone)]
pub struct Ipam {
    pub pools: PoolRegistry,
    pub ledger: AddressLedger,
    pub binding: DeviceBinding,
    pub lookup: AddressLookup,
}

impl Ipam {
    pub fn new(context: ServiceContext) -> Self {
        Self {
            pools: PoolRegistry::new(context.clone()),
            ledger: AddressLedger::new(context.clone()),
            binding: DeviceBinding::new(context.clone()),
            lookup: AddressLookup::new(context),
        }
    }

    /// In-memory store, no event bus, default retry policy
    pub fn in_memory() -> Self {
        Self::new(ServiceContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NullPublisher),
            RetryPolicy::default(),
        ))
    }
}
