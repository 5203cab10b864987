// Copyright (c) 2025 - Cowboy AI, Inc.
//! Rack Placement Decisions
//!
//! Pure functions for installing a device into a rack span and taking it
//! out again. Rack-unit accounting (`used_units`) and the device placement
//! are committed together, guarded by both row versions.

use crate::domain::{Device, DeviceId, DeviceState, Placement, Rack, RackId, Room};
use crate::errors::{IpamError, IpamResult};

/// New `used_units` for a rack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RackWrite {
    pub rack_id: RackId,
    pub expected_version: u64,
    pub used_units: u32,
}

/// Device placement mutation, with the rack accounting it implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementChange {
    pub device_id: DeviceId,
    pub expected_version: u64,
    pub state: DeviceState,
    pub placement: Option<Placement>,
    pub rack: Option<RackWrite>,
}

/// Install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    pub placement: Placement,
    /// Defaults to [`DeviceState::Installed`]
    pub state: Option<DeviceState>,
}

/// Decide installing `device` into `rack`
///
/// `occupants` are the devices currently placed in the rack. Returns
/// `Ok(None)` when the device already sits at the requested placement in
/// the requested state.
pub fn handle_install(
    device: &Device,
    room: &Room,
    rack: &Rack,
    occupants: &[Device],
    command: &InstallCommand,
) -> IpamResult<Option<PlacementChange>> {
    let placement = command.placement;
    let state = command.state.unwrap_or(DeviceState::Installed);

    if !state.is_racked() {
        return Err(IpamError::InvalidState(format!(
            "an installed device cannot be {}",
            state
        )));
    }

    if let Some(current) = device.placement {
        if current != placement {
            return Err(IpamError::DeviceAlreadyInstalled(device.id));
        }
        if device.state == state {
            return Ok(None);
        }
        // Same span, state change only
        return Ok(Some(PlacementChange {
            device_id: device.id,
            expected_version: device.version,
            state,
            placement: Some(current),
            rack: None,
        }));
    }

    if room.id != placement.room_id || room.data_center_id != placement.data_center_id {
        return Err(IpamError::PlacementMismatch(format!(
            "room {} is not in data center {}",
            placement.room_id, placement.data_center_id
        )));
    }
    if rack.id != placement.rack_id || rack.room_id != placement.room_id {
        return Err(IpamError::PlacementMismatch(format!(
            "rack {} is not in room {}",
            placement.rack_id, placement.room_id
        )));
    }

    if placement.start_unit == 0
        || placement.end_unit < placement.start_unit
        || placement.end_unit > rack.total_units
    {
        return Err(IpamError::InvalidUnitSpan {
            start: placement.start_unit,
            end: placement.end_unit,
            total: rack.total_units,
        });
    }

    let requested = placement.unit_count();
    if rack.free_units() < requested {
        return Err(IpamError::InsufficientRackUnits {
            rack: rack.id,
            requested,
            free: rack.free_units(),
        });
    }

    if let Some(occupant) = occupants
        .iter()
        .filter(|other| other.id != device.id)
        .find(|other| other.placement.is_some_and(|p| p.overlaps(&placement)))
    {
        return Err(IpamError::UnitsOccupied {
            rack: rack.id,
            start: placement.start_unit,
            end: placement.end_unit,
            occupant: occupant.id,
        });
    }

    Ok(Some(PlacementChange {
        device_id: device.id,
        expected_version: device.version,
        state,
        placement: Some(placement),
        rack: Some(RackWrite {
            rack_id: rack.id,
            expected_version: rack.version,
            used_units: rack.used_units + requested,
        }),
    }))
}

/// Decide taking `device` out of its rack
///
/// `rack` is the rack the device sits in, if it still exists. Returns
/// `Ok(None)` for a device that is not installed.
pub fn handle_uninstall(device: &Device, rack: Option<&Rack>) -> IpamResult<Option<PlacementChange>> {
    let Some(placement) = device.placement else {
        if device.state == DeviceState::Uninstalled {
            return Ok(None);
        }
        return Ok(Some(PlacementChange {
            device_id: device.id,
            expected_version: device.version,
            state: DeviceState::Uninstalled,
            placement: None,
            rack: None,
        }));
    };

    let rack = rack
        .filter(|rack| rack.id == placement.rack_id)
        .map(|rack| RackWrite {
            rack_id: rack.id,
            expected_version: rack.version,
            used_units: rack.used_units.saturating_sub(placement.unit_count()),
        });

    Ok(Some(PlacementChange {
        device_id: device.id,
        expected_version: device.version,
        state: DeviceState::Uninstalled,
        placement: None,
        rack,
    }))
}
