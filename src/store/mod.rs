// Copyright (c) 2025 - Cowboy AI, Inc.
//! Record Store Abstraction
//!
//! This module defines the storage interface the IPAM services run against
//! and an in-memory implementation.
//!
//! # Concurrency Contract
//!
//! Mutations of contended rows are submitted as *changes* that name the
//! row versions they were decided against:
//!
//! ```text
//! read snapshot (version n) → decide (pure) → commit(expected = n)
//!                                                 ↓
//!                                   applied atomically, version n + 1
//!                                   or StoreError::Conflict, nothing written
//! ```
//!
//! Implementations must enforce this at the storage layer, so the no
//! double-allocation guarantee holds across service instances:
//!
//! - A ledger commit is applied only if the pool ledger version and the
//!   bound device's version both still match
//! - A minted address must not already exist anywhere in the ledger
//! - A placement commit is applied only if the device and rack versions match
//! - `insert_pool_if_absent` checks and inserts as one step
//!
//! # Deletes
//!
//! Deleting a data center, room or rack removes everything below it,
//! including the devices racked there. Addresses those devices held are
//! released; pools and ledger records are never deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use thiserror::Error;

use crate::aggregate::{LedgerChange, PlacementChange};
use crate::domain::{
    AddressRecord, Cidr, DataCenter, DataCenterId, Device, DeviceId, NewDevice, Pool, PoolId,
    PoolLedger, Rack, RackId, Room, RoomId,
};

pub mod memory;

pub use memory::MemoryStore;

/// Storage layer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A row changed since the snapshot a commit was decided against
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// Unique name constraint violated
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What a data-center, room or rack delete removed and released
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub rooms: Vec<RoomId>,
    pub racks: Vec<RackId>,
    pub devices: Vec<DeviceId>,
    /// Removed devices that held an address, with the now free record
    pub released: Vec<(DeviceId, AddressRecord)>,
}

/// Every inventory row, read under one lock, in id order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    pub data_centers: Vec<DataCenter>,
    pub rooms: Vec<Room>,
    pub racks: Vec<Rack>,
    pub devices: Vec<Device>,
}

/// Transactional record store for inventory and the address ledger
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // ---- inventory ----

    /// Insert a data center; names are unique
    async fn insert_data_center(&self, name: &str) -> StoreResult<DataCenter>;

    async fn data_center(&self, id: DataCenterId) -> StoreResult<Option<DataCenter>>;

    /// Delete a data center with its rooms, racks and racked devices
    ///
    /// Addresses held by removed devices are released at `now`. Pools and
    /// ledger records are kept. Returns `None` if the data center is unknown.
    async fn delete_data_center(
        &self,
        id: DataCenterId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<CascadeReport>>;

    async fn inventory(&self) -> StoreResult<InventorySnapshot>;

    async fn insert_room(&self, data_center_id: DataCenterId, name: &str) -> StoreResult<Room>;

    async fn room(&self, id: RoomId) -> StoreResult<Option<Room>>;

    /// Delete a room with its racks and racked devices, `None` if unknown
    async fn delete_room(&self, id: RoomId, now: DateTime<Utc>) -> StoreResult<Option<CascadeReport>>;

    async fn insert_rack(&self, room_id: RoomId, name: &str, total_units: u32) -> StoreResult<Rack>;

    async fn rack(&self, id: RackId) -> StoreResult<Option<Rack>>;

    /// Delete a rack with its racked devices, `None` if unknown
    async fn delete_rack(&self, id: RackId, now: DateTime<Utc>) -> StoreResult<Option<CascadeReport>>;

    async fn insert_device(&self, device: NewDevice) -> StoreResult<Device>;

    async fn device(&self, id: DeviceId) -> StoreResult<Option<Device>>;

    /// Devices currently placed in a rack
    async fn devices_in_rack(&self, rack_id: RackId) -> StoreResult<Vec<Device>>;

    /// Device whose `current_address` is `address`
    async fn device_holding(&self, address: IpAddr) -> StoreResult<Option<Device>>;

    /// Apply a placement change, version-checked
    async fn commit_placement(&self, change: &PlacementChange) -> StoreResult<Device>;

    // ---- pools and ledger ----

    /// Return the pool for `cidr`, inserting it first if there is none
    ///
    /// The flag is `true` when this call created the pool. A pool whose
    /// data center was deleted is handed to `data_center_id`.
    async fn insert_pool_if_absent(
        &self,
        data_center_id: DataCenterId,
        cidr: Cidr,
        now: DateTime<Utc>,
    ) -> StoreResult<(Pool, bool)>;

    async fn pool(&self, id: PoolId) -> StoreResult<Option<Pool>>;

    async fn pools(&self) -> StoreResult<Vec<Pool>>;

    /// Snapshot of a pool's ledger, `None` if the pool is unknown
    async fn ledger(&self, pool_id: PoolId) -> StoreResult<Option<PoolLedger>>;

    async fn record_by_address(&self, address: IpAddr) -> StoreResult<Option<AddressRecord>>;

    /// Apply a ledger change and its device binding as one unit
    async fn commit_ledger(&self, change: &LedgerChange) -> StoreResult<AddressRecord>;
}
