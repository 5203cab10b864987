//! Data-center inventory and IP address management
//!
//! This crate tracks physical inventory (data centers, rooms, racks,
//! devices) and hands out addresses from CIDR pools to devices, one active
//! address per device, never the same address twice at once.
//!
//! - [`domain`]: value objects and entities
//! - [`aggregate`]: pure allocation and placement decisions
//! - [`store`]: version-checked record store
//! - [`service`]: pool registry, address ledger, device binding, lookups
//! - [`api`]: HTTP surface
//! - [`events`], [`publisher`], [`nats`]: event publication on NATS
//! - [`projection`], `adapters`: read-side projections (NetBox)

pub mod aggregate;
pub mod api;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod nats;
pub mod projection;
pub mod publisher;
pub mod service;
pub mod store;
pub mod subjects;

#[cfg(feature = "netbox")]
pub mod adapters;

// Re-export commonly used types
pub use config::{ConfigError, IpamConfig, RetryPolicy};
pub use errors::{IpamError, IpamResult, MessagingError, MessagingResult};
pub use nats::{NatsClient, NatsConfig};
pub use publisher::{EventPublisher, MemoryPublisher, NatsPublisher, NullPublisher};
pub use service::{Ipam, ServiceContext};
pub use store::{InventoryStore, MemoryStore};
