// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM Domain Models
//!
//! Core domain concepts for data-center inventory and address management.
//!
//! # Value Objects with Invariants
//!
//! - [`Cidr`] - canonical IPv4/IPv6 network prefix with host enumeration
//! - Typed row ids ([`PoolId`], [`DeviceId`], ...)
//!
//! # Entities
//!
//! - [`DataCenter`], [`Room`], [`Rack`], [`Device`] - physical inventory
//! - [`Pool`], [`AddressRecord`] - the address ledger

pub mod ids;
pub mod inventory;
pub mod ledger;
pub mod network;

pub use ids::{DataCenterId, DeviceId, PoolId, RackId, RecordId, RoomId};
pub use inventory::{DataCenter, Device, DeviceState, NewDevice, Placement, Rack, Room};
pub use ledger::{AddressRecord, AddressStatus, Pool, PoolLedger, PoolUtilization};
pub use network::{parse_address, Cidr, HostIter, NetworkError};
