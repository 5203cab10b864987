// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Binding
//!
//! Owns the physical inventory (data centers, rooms, racks, devices) and
//! the placement of devices into rack units. Installing or uninstalling a
//! device never touches its IP binding; addresses go through
//! [`AddressLedger`](super::AddressLedger).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ServiceContext;
use crate::aggregate::{handle_install, handle_uninstall, InstallCommand};
use crate::domain::{
    DataCenter, DataCenterId, Device, DeviceId, NewDevice, Placement, Rack, RackId, Room, RoomId,
};
use crate::errors::{IpamError, IpamResult};
use crate::events::IpamEvent;
use crate::store::{CascadeReport, InventorySnapshot};

/// Data center with everything below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataCenterTree {
    #[serde(flatten)]
    pub data_center: DataCenter,
    pub rooms: Vec<RoomTree>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomTree {
    #[serde(flatten)]
    pub room: Room,
    pub racks: Vec<RackTree>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RackTree {
    #[serde(flatten)]
    pub rack: Rack,
    pub devices: Vec<RackedDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RackedDevice {
    #[serde(flatten)]
    pub device: Device,
    pub unit_count: Option<u32>,
}

/// Where a device sits, by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceLocation {
    pub data_center: String,
    pub room: String,
    pub rack: String,
    pub start_unit: u32,
    pub end_unit: u32,
}

/// A device search hit; `location` is `None` for unracked devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceMatch {
    pub device: Device,
    pub location: Option<DeviceLocation>,
}

/// Nest a flat inventory snapshot, children in id order
fn build_tree(snapshot: InventorySnapshot) -> Vec<DataCenterTree> {
    let mut devices: HashMap<RackId, Vec<RackedDevice>> = HashMap::new();
    for device in snapshot.devices {
        if let Some(placement) = device.placement {
            devices.entry(placement.rack_id).or_default().push(RackedDevice {
                unit_count: device.unit_count(),
                device,
            });
        }
    }

    let mut racks: HashMap<RoomId, Vec<RackTree>> = HashMap::new();
    for rack in snapshot.racks {
        racks.entry(rack.room_id).or_default().push(RackTree {
            devices: devices.remove(&rack.id).unwrap_or_default(),
            rack,
        });
    }

    let mut rooms: HashMap<DataCenterId, Vec<RoomTree>> = HashMap::new();
    for room in snapshot.rooms {
        rooms.entry(room.data_center_id).or_default().push(RoomTree {
            racks: racks.remove(&room.id).unwrap_or_default(),
            room,
        });
    }

    snapshot
        .data_centers
        .into_iter()
        .map(|data_center| DataCenterTree {
            rooms: rooms.remove(&data_center.id).unwrap_or_default(),
            data_center,
        })
        .collect()
}

/// Device whose id is `query`, else the first whose name contains it,
/// ignoring case
fn find_device<'a>(devices: &'a [Device], query: &str) -> Option<&'a Device> {
    let by_id = query
        .parse::<u64>()
        .ok()
        .and_then(|id| devices.iter().find(|d| d.id == DeviceId(id)));

    by_id.or_else(|| {
        let needle = query.to_lowercase();
        devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
    })
}

fn locate(snapshot: &InventorySnapshot, placement: Placement) -> Option<DeviceLocation> {
    let data_center = snapshot
        .data_centers
        .iter()
        .find(|dc| dc.id == placement.data_center_id)?;
    let room = snapshot.rooms.iter().find(|r| r.id == placement.room_id)?;
    let rack = snapshot.racks.iter().find(|r| r.id == placement.rack_id)?;

    Some(DeviceLocation {
        data_center: data_center.name.clone(),
        room: room.name.clone(),
        rack: rack.name.clone(),
        start_unit: placement.start_unit,
        end_unit: placement.end_unit,
    })
}

#[derive(Clone)]
pub struct DeviceBinding {
    context: ServiceContext,
}

impl DeviceBinding {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    // ---- inventory ----

    pub async fn create_data_center(&self, name: &str) -> IpamResult<DataCenter> {
        let data_center = self.context.store().insert_data_center(name).await?;
        info!(data_center = %data_center.id, name, "Created data center");
        Ok(data_center)
    }

    pub async fn data_center(&self, id: DataCenterId) -> IpamResult<DataCenter> {
        self.context
            .store()
            .data_center(id)
            .await?
            .ok_or(IpamError::DataCenterNotFound(id))
    }

    /// Delete a data center with its rooms, racks and racked devices
    ///
    /// Addresses held by the removed devices are released; pools and their
    /// ledgers are kept.
    pub async fn delete_data_center(&self, id: DataCenterId) -> IpamResult<CascadeReport> {
        let now = Utc::now();
        let report = self
            .context
            .store()
            .delete_data_center(id, now)
            .await?
            .ok_or(IpamError::DataCenterNotFound(id))?;

        info!(
            data_center = %id,
            rooms = report.rooms.len(),
            racks = report.racks.len(),
            devices = report.devices.len(),
            released = report.released.len(),
            "Deleted data center"
        );

        let correlation_id = Uuid::now_v7();
        self.emit_releases(&report, now, correlation_id).await;
        self.context
            .emit(IpamEvent::data_center_deleted(
                id,
                report.rooms.clone(),
                report.racks.clone(),
                report.devices.clone(),
                now,
                correlation_id,
            ))
            .await;

        Ok(report)
    }

    /// Nested listing of every data center, room, rack and racked device
    pub async fn data_centers(&self) -> IpamResult<Vec<DataCenterTree>> {
        let snapshot = self.context.store().inventory().await?;
        Ok(build_tree(snapshot))
    }

    /// `AddressReleased` for every address a cascade freed
    async fn emit_releases(&self, report: &CascadeReport, now: DateTime<Utc>, correlation_id: Uuid) {
        for (device_id, record) in &report.released {
            self.context
                .emit(IpamEvent::address_released(
                    record.clone(),
                    Some(*device_id),
                    now,
                    correlation_id,
                ))
                .await;
        }
    }

    pub async fn create_room(&self, data_center_id: DataCenterId, name: &str) -> IpamResult<Room> {
        let store = self.context.store();
        if store.data_center(data_center_id).await?.is_none() {
            return Err(IpamError::DataCenterNotFound(data_center_id));
        }
        let room = store.insert_room(data_center_id, name).await?;
        info!(room = %room.id, data_center = %data_center_id, name, "Created room");
        Ok(room)
    }

    pub async fn room(&self, id: RoomId) -> IpamResult<Room> {
        self.context
            .store()
            .room(id)
            .await?
            .ok_or(IpamError::RoomNotFound(id))
    }

    /// Delete a room with its racks and the devices racked in them
    ///
    /// Addresses held by the removed devices are released.
    pub async fn delete_room(&self, id: RoomId) -> IpamResult<CascadeReport> {
        let now = Utc::now();
        let report = self
            .context
            .store()
            .delete_room(id, now)
            .await?
            .ok_or(IpamError::RoomNotFound(id))?;

        info!(
            room = %id,
            racks = report.racks.len(),
            devices = report.devices.len(),
            released = report.released.len(),
            "Deleted room"
        );

        let correlation_id = Uuid::now_v7();
        self.emit_releases(&report, now, correlation_id).await;
        self.context
            .emit(IpamEvent::room_deleted(
                id,
                report.racks.clone(),
                report.devices.clone(),
                now,
                correlation_id,
            ))
            .await;

        Ok(report)
    }

    /// Create an empty rack of `total_units` units
    pub async fn create_rack(&self, room_id: RoomId, name: &str, total_units: u32) -> IpamResult<Rack> {
        if total_units == 0 {
            return Err(IpamError::InvalidUnitSpan {
                start: 1,
                end: 1,
                total: 0,
            });
        }
        let store = self.context.store();
        if store.room(room_id).await?.is_none() {
            return Err(IpamError::RoomNotFound(room_id));
        }
        let rack = store.insert_rack(room_id, name, total_units).await?;
        info!(rack = %rack.id, room = %room_id, name, total_units, "Created rack");
        Ok(rack)
    }

    pub async fn rack(&self, id: RackId) -> IpamResult<Rack> {
        self.context
            .store()
            .rack(id)
            .await?
            .ok_or(IpamError::RackNotFound(id))
    }

    /// Delete a rack and the devices racked in it
    ///
    /// The removed devices are deleted, not unracked, and their addresses
    /// are released.
    pub async fn delete_rack(&self, id: RackId) -> IpamResult<CascadeReport> {
        let now = Utc::now();
        let report = self
            .context
            .store()
            .delete_rack(id, now)
            .await?
            .ok_or(IpamError::RackNotFound(id))?;

        info!(
            rack = %id,
            devices = report.devices.len(),
            released = report.released.len(),
            "Deleted rack"
        );

        let correlation_id = Uuid::now_v7();
        self.emit_releases(&report, now, correlation_id).await;
        self.context
            .emit(IpamEvent::rack_deleted(id, report.devices.clone(), now, correlation_id))
            .await;

        Ok(report)
    }

    /// Register an uninstalled device
    pub async fn create_device(&self, device: NewDevice) -> IpamResult<Device> {
        let device = self.context.store().insert_device(device).await?;
        info!(device = %device.id, name = %device.name, "Created device");
        Ok(device)
    }

    pub async fn device(&self, id: DeviceId) -> IpamResult<Device> {
        self.context
            .store()
            .device(id)
            .await?
            .ok_or(IpamError::DeviceNotFound(id))
    }

    /// Find a device by numeric id or by case-insensitive name fragment
    ///
    /// An id match wins over a name match; among name matches the lowest
    /// device id wins.
    pub async fn search_device(&self, query: &str) -> IpamResult<DeviceMatch> {
        let query = query.trim();
        if query.is_empty() {
            return Err(IpamError::InvalidRequest("search query is empty".to_string()));
        }

        let snapshot = self.context.store().inventory().await?;
        let device = find_device(&snapshot.devices, query)
            .cloned()
            .ok_or_else(|| IpamError::NoMatchingDevice(query.to_string()))?;

        let location = device.placement.and_then(|placement| {
            let location = locate(&snapshot, placement);
            if location.is_none() {
                warn!(device = %device.id, rack = %placement.rack_id, "Placement points at missing inventory");
            }
            location
        });
        debug!(query, device = %device.id, racked = location.is_some(), "Device search");

        Ok(DeviceMatch { device, location })
    }

    // ---- placement ----

    /// Rack a device at the given unit span
    ///
    /// Repeating an install with the same placement and state returns the
    /// device unchanged.
    pub async fn install(&self, device_id: DeviceId, command: InstallCommand) -> IpamResult<Device> {
        let (device, changed) = self
            .context
            .with_retry("install", || self.try_install(device_id, &command))
            .await?;

        if let (true, Some(placement)) = (changed, device.placement) {
            info!(
                device = %device_id,
                rack = %placement.rack_id,
                start_unit = placement.start_unit,
                end_unit = placement.end_unit,
                state = %device.state,
                "Installed device"
            );
            self.context
                .emit(IpamEvent::device_installed(
                    device_id,
                    placement,
                    device.state,
                    Utc::now(),
                    Uuid::now_v7(),
                ))
                .await;
        }

        Ok(device)
    }

    async fn try_install(&self, device_id: DeviceId, command: &InstallCommand) -> IpamResult<(Device, bool)> {
        let store = self.context.store();
        let placement = command.placement;

        let device = store
            .device(device_id)
            .await?
            .ok_or(IpamError::DeviceNotFound(device_id))?;
        if store.data_center(placement.data_center_id).await?.is_none() {
            return Err(IpamError::DataCenterNotFound(placement.data_center_id));
        }
        let room = store
            .room(placement.room_id)
            .await?
            .ok_or(IpamError::RoomNotFound(placement.room_id))?;
        let rack = store
            .rack(placement.rack_id)
            .await?
            .ok_or(IpamError::RackNotFound(placement.rack_id))?;
        let occupants = store.devices_in_rack(rack.id).await?;

        match handle_install(&device, &room, &rack, &occupants, command)? {
            Some(change) => Ok((store.commit_placement(&change).await?, true)),
            None => Ok((device, false)),
        }
    }

    /// Take a device out of its rack, keeping any held address
    pub async fn uninstall(&self, device_id: DeviceId) -> IpamResult<Device> {
        let (device, from_rack) = self
            .context
            .with_retry("uninstall", || self.try_uninstall(device_id))
            .await?;

        if let Some(rack_id) = from_rack {
            info!(device = %device_id, rack = ?rack_id.map(|r| r.value()), "Uninstalled device");
            self.context
                .emit(IpamEvent::device_uninstalled(
                    device_id,
                    rack_id,
                    Utc::now(),
                    Uuid::now_v7(),
                ))
                .await;
        }

        Ok(device)
    }

    /// Returns the device and, if it changed, the rack it left
    async fn try_uninstall(&self, device_id: DeviceId) -> IpamResult<(Device, Option<Option<RackId>>)> {
        let store = self.context.store();
        let device = store
            .device(device_id)
            .await?
            .ok_or(IpamError::DeviceNotFound(device_id))?;

        let rack = match device.placement {
            Some(placement) => {
                let rack = store.rack(placement.rack_id).await?;
                if rack.is_none() {
                    warn!(device = %device_id, rack = %placement.rack_id, "Placed in a rack that no longer exists");
                }
                rack
            }
            None => None,
        };

        match handle_uninstall(&device, rack.as_ref())? {
            Some(change) => {
                let from_rack = device.placement.map(|p| p.rack_id);
                Ok((store.commit_placement(&change).await?, Some(from_rack)))
            }
            None => Ok((device, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceState, Placement};
    use crate::service::Ipam;

    struct Site {
        dc: DataCenterId,
        room: RoomId,
        rack: RackId,
    }

    async fn site(ipam: &Ipam) -> Site {
        let dc = ipam.binding.create_data_center("dc1").await.unwrap();
        let room = ipam.binding.create_room(dc.id, "hall-a").await.unwrap();
        let rack = ipam.binding.create_rack(room.id, "r01", 10).await.unwrap();
        Site {
            dc: dc.id,
            room: room.id,
            rack: rack.id,
        }
    }

    fn at(site: &Site, start_unit: u32, end_unit: u32) -> InstallCommand {
        InstallCommand {
            placement: Placement {
                data_center_id: site.dc,
                room_id: site.room,
                rack_id: site.rack,
                start_unit,
                end_unit,
            },
            state: None,
        }
    }

    async fn device(ipam: &Ipam, name: &str) -> Device {
        ipam.binding
            .create_device(NewDevice {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_install_then_uninstall_restores_units() {
        let ipam = Ipam::in_memory();
        let site = site(&ipam).await;
        let device = device(&ipam, "web-1").await;

        let installed = ipam.binding.install(device.id, at(&site, 3, 4)).await.unwrap();
        assert_eq!(installed.state, DeviceState::Installed);
        assert_eq!(ipam.binding.rack(site.rack).await.unwrap().used_units, 2);

        let uninstalled = ipam.binding.uninstall(device.id).await.unwrap();
        assert_eq!(uninstalled.state, DeviceState::Uninstalled);
        assert_eq!(uninstalled.placement, None);
        assert_eq!(ipam.binding.rack(site.rack).await.unwrap().used_units, 0);
    }

    #[tokio::test]
    async fn test_install_rejects_occupied_units() {
        let ipam = Ipam::in_memory();
        let site = site(&ipam).await;
        let first = device(&ipam, "web-1").await;
        let second = device(&ipam, "web-2").await;

        ipam.binding.install(first.id, at(&site, 1, 2)).await.unwrap();
        let err = ipam.binding.install(second.id, at(&site, 2, 3)).await.unwrap_err();

        assert_eq!(err.kind(), "units_occupied");
        assert_eq!(ipam.binding.rack(site.rack).await.unwrap().used_units, 2);
    }

    #[tokio::test]
    async fn test_install_unknown_rack() {
        let ipam = Ipam::in_memory();
        let site = site(&ipam).await;
        let device = device(&ipam, "web-1").await;

        let mut command = at(&site, 1, 1);
        command.placement.rack_id = RackId(42);
        assert_eq!(
            ipam.binding.install(device.id, command).await,
            Err(IpamError::RackNotFound(RackId(42)))
        );
    }

    #[tokio::test]
    async fn test_create_room_requires_data_center() {
        let ipam = Ipam::in_memory();
        assert_eq!(
            ipam.binding.create_room(DataCenterId(5), "hall").await,
            Err(IpamError::DataCenterNotFound(DataCenterId(5)))
        );
    }

    #[tokio::test]
    async fn test_uninstall_is_idempotent() {
        let ipam = Ipam::in_memory();
        let device = device(&ipam, "spare").await;

        let again = ipam.binding.uninstall(device.id).await.unwrap();
        assert_eq!(again, device);
    }

    #[tokio::test]
    async fn test_delete_rack_removes_racked_devices() {
        let ipam = Ipam::in_memory();
        let site = site(&ipam).await;
        let racked = device(&ipam, "web-1").await;
        let spare = device(&ipam, "web-2").await;
        ipam.binding.install(racked.id, at(&site, 1, 2)).await.unwrap();

        let report = ipam.binding.delete_rack(site.rack).await.unwrap();
        assert_eq!(report.devices, vec![racked.id]);
        assert_eq!(
            ipam.binding.device(racked.id).await,
            Err(IpamError::DeviceNotFound(racked.id))
        );
        assert!(ipam.binding.device(spare.id).await.is_ok());
        assert!(ipam.binding.room(site.room).await.is_ok());
        assert_eq!(
            ipam.binding.delete_rack(site.rack).await,
            Err(IpamError::RackNotFound(site.rack))
        );
    }

    #[tokio::test]
    async fn test_delete_room_cascades_to_racks() {
        let ipam = Ipam::in_memory();
        let site = site(&ipam).await;

        let report = ipam.binding.delete_room(site.room).await.unwrap();
        assert_eq!(report.racks, vec![site.rack]);
        assert_eq!(
            ipam.binding.rack(site.rack).await,
            Err(IpamError::RackNotFound(site.rack))
        );
        assert!(ipam.binding.data_center(site.dc).await.is_ok());
    }

    #[tokio::test]
    async fn test_data_center_tree_nests_racked_devices() {
        let ipam = Ipam::in_memory();
        let site = site(&ipam).await;
        let racked = device(&ipam, "db-1").await;
        device(&ipam, "loose").await;
        ipam.binding.install(racked.id, at(&site, 3, 5)).await.unwrap();
        ipam.binding.create_data_center("dc2").await.unwrap();

        let tree = ipam.binding.data_centers().await.unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree[1].rooms.is_empty());

        let rack = &tree[0].rooms[0].racks[0];
        assert_eq!(rack.rack.used_units, 3);
        assert_eq!(rack.devices.len(), 1);
        assert_eq!(rack.devices[0].device.id, racked.id);
        assert_eq!(rack.devices[0].unit_count, Some(3));
    }

    #[tokio::test]
    async fn test_search_device_by_id_and_name() {
        let ipam = Ipam::in_memory();
        let site = site(&ipam).await;
        let web = device(&ipam, "Web-Frontend").await;
        let db = device(&ipam, "db-1").await;
        ipam.binding.install(web.id, at(&site, 1, 1)).await.unwrap();

        let hit = ipam.binding.search_device("FRONT").await.unwrap();
        assert_eq!(hit.device.id, web.id);
        assert_eq!(
            hit.location,
            Some(DeviceLocation {
                data_center: "dc1".to_string(),
                room: "hall-a".to_string(),
                rack: "r01".to_string(),
                start_unit: 1,
                end_unit: 1,
            })
        );

        let hit = ipam.binding.search_device(&db.id.to_string()).await.unwrap();
        assert_eq!(hit.device.id, db.id);
        assert_eq!(hit.location, None);

        assert_eq!(
            ipam.binding.search_device("nothing").await,
            Err(IpamError::NoMatchingDevice("nothing".to_string()))
        );
        assert_eq!(ipam.binding.search_device("  ").await.unwrap_err().kind(), "invalid_request");
    }

    #[test]
    fn test_numeric_query_falls_back_to_name() {
        let mut named = Device {
            id: DeviceId(1),
            name: "rack-42-switch".to_string(),
            model: None,
            service: None,
            state: DeviceState::Uninstalled,
            placement: None,
            current_address: None,
            version: 0,
        };
        let devices = vec![named.clone()];
        assert_eq!(find_device(&devices, "42").map(|d| d.id), Some(DeviceId(1)));

        named.id = DeviceId(42);
        let devices = vec![devices[0].clone(), named];
        assert_eq!(find_device(&devices, "42").map(|d| d.id), Some(DeviceId(42)));
    }
}
