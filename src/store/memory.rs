// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Record Store
//!
//! Single-process [`InventoryStore`] backed by ordered maps behind one
//! `RwLock`. Reads share the lock; every commit validates its expected
//! versions and applies its writes under the write lock, so a commit is
//! all-or-nothing and two commits against the same pool ledger serialize.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{CascadeReport, InventorySnapshot, InventoryStore, StoreError, StoreResult};
use crate::aggregate::{release_time, LedgerChange, PlacementChange, RecordWrite};
use crate::domain::{
    AddressRecord, AddressStatus, Cidr, DataCenter, DataCenterId, Device, DeviceId, DeviceState,
    NewDevice, Pool, PoolId, PoolLedger, Rack, RackId, RecordId, Room, RoomId,
};

/// Per-table id sequences, starting at 1
#[derive(Debug, Default)]
struct Sequences {
    data_center: u64,
    room: u64,
    rack: u64,
    device: u64,
    pool: u64,
    record: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct Tables {
    seq: Sequences,
    data_centers: BTreeMap<DataCenterId, DataCenter>,
    rooms: BTreeMap<RoomId, Room>,
    racks: BTreeMap<RackId, Rack>,
    devices: BTreeMap<DeviceId, Device>,
    pools: BTreeMap<PoolId, Pool>,
    pool_by_cidr: HashMap<Cidr, PoolId>,
    ledger_versions: HashMap<PoolId, u64>,
    records: BTreeMap<RecordId, AddressRecord>,
    pool_records: HashMap<PoolId, BTreeSet<RecordId>>,
    by_address: HashMap<IpAddr, RecordId>,
}

impl Tables {
    fn ledger_version(&self, pool_id: PoolId) -> u64 {
        self.ledger_versions.get(&pool_id).copied().unwrap_or(0)
    }

    fn bump_ledger(&mut self, pool_id: PoolId) {
        *self.ledger_versions.entry(pool_id).or_insert(0) += 1;
    }

    fn check_ledger_change(&self, change: &LedgerChange) -> StoreResult<()> {
        if !self.pools.contains_key(&change.pool_id) {
            return Err(StoreError::Backend(format!("unknown pool {}", change.pool_id)));
        }

        let version = self.ledger_version(change.pool_id);
        if version != change.expected_version {
            return Err(StoreError::Conflict(format!(
                "ledger of pool {} is at version {}, expected {}",
                change.pool_id, version, change.expected_version
            )));
        }

        if let Some(binding) = &change.binding {
            let device = self.devices.get(&binding.device_id).ok_or_else(|| {
                StoreError::Conflict(format!("device {} no longer exists", binding.device_id))
            })?;
            if device.version != binding.expected_version {
                return Err(StoreError::Conflict(format!(
                    "device {} is at version {}, expected {}",
                    device.id, device.version, binding.expected_version
                )));
            }
        }

        match &change.write {
            RecordWrite::Mint { address, .. } => {
                if self.by_address.contains_key(address) {
                    return Err(StoreError::Conflict(format!(
                        "address {} is already in the ledger",
                        address
                    )));
                }
            }
            RecordWrite::Reassign { record_id, .. } => {
                self.check_transition(change.pool_id, *record_id, AddressStatus::Held)?;
            }
            RecordWrite::Release { record_id, .. } => {
                self.check_transition(change.pool_id, *record_id, AddressStatus::Free)?;
            }
        }

        Ok(())
    }

    fn check_transition(
        &self,
        pool_id: PoolId,
        record_id: RecordId,
        target: AddressStatus,
    ) -> StoreResult<()> {
        let current = self.pool_record(pool_id, record_id)?.status();
        if !current.can_transition_to(&target) {
            return Err(StoreError::Conflict(format!(
                "record {} is already {}",
                record_id, current
            )));
        }
        Ok(())
    }

    fn records_of(&self, pool_id: PoolId) -> Vec<AddressRecord> {
        self.pool_records
            .get(&pool_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    fn pool_record(&self, pool_id: PoolId, record_id: RecordId) -> StoreResult<&AddressRecord> {
        self.records
            .get(&record_id)
            .filter(|r| r.pool_id == pool_id)
            .ok_or_else(|| {
                StoreError::Backend(format!("record {} not in pool {}", record_id, pool_id))
            })
    }

    fn release_record(&mut self, record_id: RecordId, now: DateTime<Utc>) -> Option<AddressRecord> {
        let pool_id = self.records.get(&record_id).filter(|r| r.is_held())?.pool_id;
        let released_at = release_time(&self.records_of(pool_id), now);

        let record = self.records.get_mut(&record_id)?;
        record.released_at = Some(released_at);
        let released = record.clone();
        self.bump_ledger(pool_id);
        Some(released)
    }

    /// Remove racks and every device placed in them
    ///
    /// Addresses held by the removed devices are released at `now`; their
    /// records stay in the ledger. Rack-unit accounting goes with the racks.
    fn remove_racks(
        &mut self,
        racks: &[RackId],
        now: DateTime<Utc>,
    ) -> (Vec<DeviceId>, Vec<(DeviceId, AddressRecord)>) {
        let devices: Vec<Device> = self
            .devices
            .values()
            .filter(|device| device.placement.is_some_and(|p| racks.contains(&p.rack_id)))
            .cloned()
            .collect();

        let mut released = Vec::new();
        for device in &devices {
            self.devices.remove(&device.id);
            let held = device
                .current_address
                .and_then(|address| self.by_address.get(&address).copied());
            if let Some(record) = held.and_then(|record_id| self.release_record(record_id, now)) {
                released.push((device.id, record));
            }
        }
        for rack in racks {
            self.racks.remove(rack);
        }

        (devices.into_iter().map(|d| d.id).collect(), released)
    }
}

/// In-memory [`InventoryStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn insert_data_center(&self, name: &str) -> StoreResult<DataCenter> {
        let mut tables = self.tables.write().await;
        if tables.data_centers.values().any(|dc| dc.name == name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }

        let data_center = DataCenter {
            id: DataCenterId(next(&mut tables.seq.data_center)),
            name: name.to_string(),
        };
        tables.data_centers.insert(data_center.id, data_center.clone());
        Ok(data_center)
    }

    async fn data_center(&self, id: DataCenterId) -> StoreResult<Option<DataCenter>> {
        Ok(self.tables.read().await.data_centers.get(&id).cloned())
    }

    async fn delete_data_center(
        &self,
        id: DataCenterId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<CascadeReport>> {
        let mut tables = self.tables.write().await;
        if tables.data_centers.remove(&id).is_none() {
            return Ok(None);
        }

        let rooms: Vec<RoomId> = tables
            .rooms
            .values()
            .filter(|room| room.data_center_id == id)
            .map(|room| room.id)
            .collect();
        let racks: Vec<RackId> = tables
            .racks
            .values()
            .filter(|rack| rooms.contains(&rack.room_id))
            .map(|rack| rack.id)
            .collect();
        let (devices, released) = tables.remove_racks(&racks, now);
        for room in &rooms {
            tables.rooms.remove(room);
        }

        debug!(
            data_center = %id,
            rooms = rooms.len(),
            racks = racks.len(),
            devices = devices.len(),
            released = released.len(),
            "Deleted data center"
        );

        Ok(Some(CascadeReport {
            rooms,
            racks,
            devices,
            released,
        }))
    }

    async fn inventory(&self) -> StoreResult<InventorySnapshot> {
        let tables = self.tables.read().await;
        Ok(InventorySnapshot {
            data_centers: tables.data_centers.values().cloned().collect(),
            rooms: tables.rooms.values().cloned().collect(),
            racks: tables.racks.values().cloned().collect(),
            devices: tables.devices.values().cloned().collect(),
        })
    }

    async fn insert_room(&self, data_center_id: DataCenterId, name: &str) -> StoreResult<Room> {
        let mut tables = self.tables.write().await;
        if !tables.data_centers.contains_key(&data_center_id) {
            return Err(StoreError::Conflict(format!(
                "data center {} no longer exists",
                data_center_id
            )));
        }

        let room = Room {
            id: RoomId(next(&mut tables.seq.room)),
            data_center_id,
            name: name.to_string(),
        };
        tables.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn room(&self, id: RoomId) -> StoreResult<Option<Room>> {
        Ok(self.tables.read().await.rooms.get(&id).cloned())
    }

    async fn delete_room(&self, id: RoomId, now: DateTime<Utc>) -> StoreResult<Option<CascadeReport>> {
        let mut tables = self.tables.write().await;
        if tables.rooms.remove(&id).is_none() {
            return Ok(None);
        }

        let racks: Vec<RackId> = tables
            .racks
            .values()
            .filter(|rack| rack.room_id == id)
            .map(|rack| rack.id)
            .collect();
        let (devices, released) = tables.remove_racks(&racks, now);

        debug!(room = %id, racks = racks.len(), devices = devices.len(), "Deleted room");
        Ok(Some(CascadeReport {
            rooms: vec![id],
            racks,
            devices,
            released,
        }))
    }

    async fn insert_rack(&self, room_id: RoomId, name: &str, total_units: u32) -> StoreResult<Rack> {
        let mut tables = self.tables.write().await;
        if !tables.rooms.contains_key(&room_id) {
            return Err(StoreError::Conflict(format!("room {} no longer exists", room_id)));
        }

        let rack = Rack {
            id: RackId(next(&mut tables.seq.rack)),
            room_id,
            name: name.to_string(),
            total_units,
            used_units: 0,
            version: 0,
        };
        tables.racks.insert(rack.id, rack.clone());
        Ok(rack)
    }

    async fn rack(&self, id: RackId) -> StoreResult<Option<Rack>> {
        Ok(self.tables.read().await.racks.get(&id).cloned())
    }

    async fn delete_rack(&self, id: RackId, now: DateTime<Utc>) -> StoreResult<Option<CascadeReport>> {
        let mut tables = self.tables.write().await;
        if !tables.racks.contains_key(&id) {
            return Ok(None);
        }

        let (devices, released) = tables.remove_racks(&[id], now);

        debug!(rack = %id, devices = devices.len(), "Deleted rack");
        Ok(Some(CascadeReport {
            rooms: Vec::new(),
            racks: vec![id],
            devices,
            released,
        }))
    }

    async fn insert_device(&self, device: NewDevice) -> StoreResult<Device> {
        let mut tables = self.tables.write().await;
        let device = Device {
            id: DeviceId(next(&mut tables.seq.device)),
            name: device.name,
            model: device.model,
            service: device.service,
            state: DeviceState::Uninstalled,
            placement: None,
            current_address: None,
            version: 0,
        };
        tables.devices.insert(device.id, device.clone());
        Ok(device)
    }

    async fn device(&self, id: DeviceId) -> StoreResult<Option<Device>> {
        Ok(self.tables.read().await.devices.get(&id).cloned())
    }

    async fn devices_in_rack(&self, rack_id: RackId) -> StoreResult<Vec<Device>> {
        Ok(self
            .tables
            .read()
            .await
            .devices
            .values()
            .filter(|device| device.placement.is_some_and(|p| p.rack_id == rack_id))
            .cloned()
            .collect())
    }

    async fn device_holding(&self, address: IpAddr) -> StoreResult<Option<Device>> {
        Ok(self
            .tables
            .read()
            .await
            .devices
            .values()
            .find(|device| device.current_address == Some(address))
            .cloned())
    }

    async fn commit_placement(&self, change: &PlacementChange) -> StoreResult<Device> {
        let mut tables = self.tables.write().await;

        let device = tables.devices.get(&change.device_id).ok_or_else(|| {
            StoreError::Conflict(format!("device {} no longer exists", change.device_id))
        })?;
        if device.version != change.expected_version {
            return Err(StoreError::Conflict(format!(
                "device {} is at version {}, expected {}",
                device.id, device.version, change.expected_version
            )));
        }
        if let Some(write) = &change.rack {
            let rack = tables.racks.get(&write.rack_id).ok_or_else(|| {
                StoreError::Conflict(format!("rack {} no longer exists", write.rack_id))
            })?;
            if rack.version != write.expected_version {
                return Err(StoreError::Conflict(format!(
                    "rack {} is at version {}, expected {}",
                    rack.id, rack.version, write.expected_version
                )));
            }
        }

        if let Some(write) = &change.rack {
            if let Some(rack) = tables.racks.get_mut(&write.rack_id) {
                rack.used_units = write.used_units;
                rack.version += 1;
            }
        }

        let device = tables
            .devices
            .get_mut(&change.device_id)
            .ok_or_else(|| StoreError::Backend(format!("device {} vanished", change.device_id)))?;
        device.state = change.state;
        device.placement = change.placement;
        device.version += 1;
        Ok(device.clone())
    }

    async fn insert_pool_if_absent(
        &self,
        data_center_id: DataCenterId,
        cidr: Cidr,
        now: DateTime<Utc>,
    ) -> StoreResult<(Pool, bool)> {
        let mut tables = self.tables.write().await;
        if !tables.data_centers.contains_key(&data_center_id) {
            return Err(StoreError::Conflict(format!(
                "data center {} no longer exists",
                data_center_id
            )));
        }

        let existing = tables.pool_by_cidr.get(&cidr).copied();
        if let Some(pool_id) = existing {
            let orphaned = tables
                .pools
                .get(&pool_id)
                .is_some_and(|pool| !tables.data_centers.contains_key(&pool.data_center_id));
            if let Some(pool) = tables.pools.get_mut(&pool_id) {
                if orphaned {
                    info!(pool = %pool_id, from = %pool.data_center_id, to = %data_center_id, "Adopted pool of a deleted data center");
                    pool.data_center_id = data_center_id;
                }
                return Ok((pool.clone(), false));
            }
        }

        let pool = Pool {
            id: PoolId(next(&mut tables.seq.pool)),
            data_center_id,
            cidr,
            created_at: now,
        };
        tables.pool_by_cidr.insert(cidr, pool.id);
        tables.pools.insert(pool.id, pool.clone());
        Ok((pool, true))
    }

    async fn pool(&self, id: PoolId) -> StoreResult<Option<Pool>> {
        Ok(self.tables.read().await.pools.get(&id).cloned())
    }

    async fn pools(&self) -> StoreResult<Vec<Pool>> {
        Ok(self.tables.read().await.pools.values().cloned().collect())
    }

    async fn ledger(&self, pool_id: PoolId) -> StoreResult<Option<PoolLedger>> {
        let tables = self.tables.read().await;
        let Some(pool) = tables.pools.get(&pool_id).cloned() else {
            return Ok(None);
        };

        let records = tables.records_of(pool_id);

        let reserved_elsewhere = tables
            .records
            .values()
            .filter(|r| r.pool_id != pool_id && pool.cidr.contains(r.address))
            .map(|r| r.address)
            .collect();

        Ok(Some(PoolLedger {
            version: tables.ledger_version(pool_id),
            pool,
            records,
            reserved_elsewhere,
        }))
    }

    async fn record_by_address(&self, address: IpAddr) -> StoreResult<Option<AddressRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_address
            .get(&address)
            .and_then(|id| tables.records.get(id))
            .cloned())
    }

    async fn commit_ledger(&self, change: &LedgerChange) -> StoreResult<AddressRecord> {
        let mut tables = self.tables.write().await;
        tables.check_ledger_change(change)?;

        let record = match &change.write {
            RecordWrite::Mint {
                pool_id,
                address,
                assigned_at,
            } => {
                let record = AddressRecord {
                    id: RecordId(next(&mut tables.seq.record)),
                    pool_id: *pool_id,
                    address: *address,
                    assigned_at: Some(*assigned_at),
                    released_at: None,
                };
                tables.by_address.insert(record.address, record.id);
                tables
                    .pool_records
                    .entry(record.pool_id)
                    .or_default()
                    .insert(record.id);
                tables.records.insert(record.id, record.clone());
                record
            }
            RecordWrite::Reassign {
                record_id,
                assigned_at,
            } => {
                let record = tables
                    .records
                    .get_mut(record_id)
                    .ok_or_else(|| StoreError::Backend(format!("record {} vanished", record_id)))?;
                record.assigned_at = Some(*assigned_at);
                record.released_at = None;
                record.clone()
            }
            RecordWrite::Release {
                record_id,
                released_at,
            } => {
                let record = tables
                    .records
                    .get_mut(record_id)
                    .ok_or_else(|| StoreError::Backend(format!("record {} vanished", record_id)))?;
                record.released_at = Some(*released_at);
                record.clone()
            }
        };

        if let Some(binding) = &change.binding {
            if let Some(device) = tables.devices.get_mut(&binding.device_id) {
                device.current_address = binding.address;
                device.version += 1;
            }
        }
        tables.bump_ledger(change.pool_id);

        Ok(record)
    }
}
