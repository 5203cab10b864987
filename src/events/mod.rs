// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM Domain Events
//!
//! Events are immutable facts representing state changes that have
//! already been committed to the store.
//!
//! # Event Principles
//!
//! 1. **Past tense**: named for what happened (`AddressAllocated`)
//! 2. **Metadata**: `event_id` (UUID v7), `timestamp`, `correlation_id`
//! 3. **Versioned**: `event_version` for schema evolution
//!
//! # Event Flow
//!
//! ```text
//! Request → Service → Decision → Store commit → Event → Publisher (NATS)
//!                                                           ↓
//!                                                  Projections (NetBox)
//! ```
//!
//! All events emitted while serving one request share its correlation id.

pub mod ipam;

pub use ipam::{
    AddressAllocated, AddressReleased, DataCenterDeleted, DeviceInstalled, DeviceUninstalled,
    IpamEvent, PoolCreated, RackDeleted, RoomDeleted,
};
