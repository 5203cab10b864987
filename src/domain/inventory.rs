// Copyright (c) 2025 - Cowboy AI, Inc.
//! Physical Inventory Entities
//!
//! Data centers contain rooms, rooms contain racks, and devices are racked
//! into a contiguous span of rack units. Rows that are mutated concurrently
//! (racks and devices) carry a `version` the store bumps on every commit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::ids::{DataCenterId, DeviceId, RackId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenter {
    pub id: DataCenterId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub data_center_id: DataCenterId,
    pub name: String,
}

/// Equipment rack with rack-unit accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rack {
    pub id: RackId,
    pub room_id: RoomId,
    pub name: String,
    pub total_units: u32,
    pub used_units: u32,
    pub version: u64,
}

impl Rack {
    /// Rack units not yet claimed by an installed device
    pub fn free_units(&self) -> u32 {
        self.total_units.saturating_sub(self.used_units)
    }
}

/// Operational state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// Not racked
    #[default]
    Uninstalled,
    /// Racked and in service
    Installed,
    /// Racked but out of service
    Maintenance,
}

impl DeviceState {
    pub fn is_racked(&self) -> bool {
        !matches!(self, DeviceState::Uninstalled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Uninstalled => "uninstalled",
            DeviceState::Installed => "installed",
            DeviceState::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uninstalled" => Ok(DeviceState::Uninstalled),
            "installed" => Ok(DeviceState::Installed),
            "maintenance" => Ok(DeviceState::Maintenance),
            other => Err(format!("unknown device state: {}", other)),
        }
    }
}

/// Where a device sits: data center, room, rack and an inclusive unit span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub data_center_id: DataCenterId,
    pub room_id: RoomId,
    pub rack_id: RackId,
    pub start_unit: u32,
    pub end_unit: u32,
}

impl Placement {
    /// Number of rack units spanned, zero if the span is inverted
    pub fn unit_count(&self) -> u32 {
        if self.end_unit < self.start_unit {
            0
        } else {
            self.end_unit - self.start_unit + 1
        }
    }

    /// Whether two placements claim a common unit of the same rack
    pub fn overlaps(&self, other: &Placement) -> bool {
        self.rack_id == other.rack_id
            && self.start_unit <= other.end_unit
            && other.start_unit <= self.end_unit
    }
}

/// Racked or unracked piece of equipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub model: Option<String>,
    pub service: Option<String>,
    pub state: DeviceState,
    pub placement: Option<Placement>,
    /// Address currently held from the ledger, if any
    pub current_address: Option<IpAddr>,
    pub version: u64,
}

impl Device {
    pub fn is_bound(&self) -> bool {
        self.current_address.is_some()
    }

    pub fn unit_count(&self) -> Option<u32> {
        self.placement.as_ref().map(Placement::unit_count)
    }
}

/// Fields supplied when registering a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDevice {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}
