// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM Domain Events
//!
//! Every committed mutation of a pool ledger or of a device placement is
//! announced as one of these events. They are published after the store
//! commit, so they describe facts, never intentions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AddressRecord, DataCenterId, DeviceId, DeviceState, Placement, Pool, RackId, RoomId,
};
use crate::subjects::{AggregateType, Operation, SubjectBuilder};

/// IPAM events, tagged by `type` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpamEvent {
    /// A pool was registered for a CIDR
    PoolCreated(PoolCreated),

    /// An address was assigned to a device
    AddressAllocated(AddressAllocated),

    /// An address was returned to its pool
    AddressReleased(AddressReleased),

    /// A device was racked
    DeviceInstalled(DeviceInstalled),

    /// A device was unracked
    DeviceUninstalled(DeviceUninstalled),

    /// A data center was deleted with everything racked in it
    DataCenterDeleted(DataCenterDeleted),

    /// A room was deleted with its racks and their devices
    RoomDeleted(RoomDeleted),

    /// A rack was deleted with its devices
    RackDeleted(RackDeleted),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCreated {
    /// Event version for schema evolution
    pub event_version: u32,

    /// Unique event identifier (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for request tracing
    pub correlation_id: Uuid,

    pub pool: Pool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAllocated {
    pub event_version: u32,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,

    /// Ledger record after the assignment
    pub record: AddressRecord,

    pub device_id: DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressReleased {
    pub event_version: u32,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,

    /// Ledger record after the release
    pub record: AddressRecord,

    /// Device that held the address, if it still existed
    pub device_id: Option<DeviceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInstalled {
    pub event_version: u32,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub device_id: DeviceId,
    pub placement: Placement,
    pub state: DeviceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUninstalled {
    pub event_version: u32,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub device_id: DeviceId,

    /// Rack the device was taken out of
    pub rack_id: Option<RackId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenterDeleted {
    pub event_version: u32,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub data_center_id: DataCenterId,
    pub rooms: Vec<RoomId>,
    pub racks: Vec<RackId>,
    pub devices: Vec<DeviceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDeleted {
    pub event_version: u32,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub room_id: RoomId,
    pub racks: Vec<RackId>,
    pub devices: Vec<DeviceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackDeleted {
    pub event_version: u32,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub rack_id: RackId,

    /// Devices that were racked in it and are gone with it
    pub devices: Vec<DeviceId>,
}

/// Current schema version of every event type
pub const CURRENT_VERSION: u32 = 1;

impl IpamEvent {
    pub fn pool_created(pool: Pool, timestamp: DateTime<Utc>, correlation_id: Uuid) -> Self {
        IpamEvent::PoolCreated(PoolCreated {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            pool,
        })
    }

    pub fn address_allocated(
        record: AddressRecord,
        device_id: DeviceId,
        timestamp: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Self {
        IpamEvent::AddressAllocated(AddressAllocated {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            record,
            device_id,
        })
    }

    pub fn address_released(
        record: AddressRecord,
        device_id: Option<DeviceId>,
        timestamp: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Self {
        IpamEvent::AddressReleased(AddressReleased {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            record,
            device_id,
        })
    }

    pub fn device_installed(
        device_id: DeviceId,
        placement: Placement,
        state: DeviceState,
        timestamp: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Self {
        IpamEvent::DeviceInstalled(DeviceInstalled {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            device_id,
            placement,
            state,
        })
    }

    pub fn device_uninstalled(
        device_id: DeviceId,
        rack_id: Option<RackId>,
        timestamp: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Self {
        IpamEvent::DeviceUninstalled(DeviceUninstalled {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            device_id,
            rack_id,
        })
    }

    pub fn data_center_deleted(
        data_center_id: DataCenterId,
        rooms: Vec<RoomId>,
        racks: Vec<RackId>,
        devices: Vec<DeviceId>,
        timestamp: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Self {
        IpamEvent::DataCenterDeleted(DataCenterDeleted {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            data_center_id,
            rooms,
            racks,
            devices,
        })
    }

    pub fn room_deleted(
        room_id: RoomId,
        racks: Vec<RackId>,
        devices: Vec<DeviceId>,
        timestamp: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Self {
        IpamEvent::RoomDeleted(RoomDeleted {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            room_id,
            racks,
            devices,
        })
    }

    pub fn rack_deleted(
        rack_id: RackId,
        devices: Vec<DeviceId>,
        timestamp: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Self {
        IpamEvent::RackDeleted(RackDeleted {
            event_version: CURRENT_VERSION,
            event_id: Uuid::now_v7(),
            timestamp,
            correlation_id,
            rack_id,
            devices,
        })
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            IpamEvent::PoolCreated(e) => e.event_id,
            IpamEvent::AddressAllocated(e) => e.event_id,
            IpamEvent::AddressReleased(e) => e.event_id,
            IpamEvent::DeviceInstalled(e) => e.event_id,
            IpamEvent::DeviceUninstalled(e) => e.event_id,
            IpamEvent::DataCenterDeleted(e) => e.event_id,
            IpamEvent::RoomDeleted(e) => e.event_id,
            IpamEvent::RackDeleted(e) => e.event_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            IpamEvent::PoolCreated(e) => e.timestamp,
            IpamEvent::AddressAllocated(e) => e.timestamp,
            IpamEvent::AddressReleased(e) => e.timestamp,
            IpamEvent::DeviceInstalled(e) => e.timestamp,
            IpamEvent::DeviceUninstalled(e) => e.timestamp,
            IpamEvent::DataCenterDeleted(e) => e.timestamp,
            IpamEvent::RoomDeleted(e) => e.timestamp,
            IpamEvent::RackDeleted(e) => e.timestamp,
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        match self {
            IpamEvent::PoolCreated(e) => e.correlation_id,
            IpamEvent::AddressAllocated(e) => e.correlation_id,
            IpamEvent::AddressReleased(e) => e.correlation_id,
            IpamEvent::DeviceInstalled(e) => e.correlation_id,
            IpamEvent::DeviceUninstalled(e) => e.correlation_id,
            IpamEvent::DataCenterDeleted(e) => e.correlation_id,
            IpamEvent::RoomDeleted(e) => e.correlation_id,
            IpamEvent::RackDeleted(e) => e.correlation_id,
        }
    }

    /// Wire name of the event type, matching the serde tag
    pub fn event_type_name(&self) -> &'static str {
        match self {
            IpamEvent::PoolCreated(_) => "pool_created",
            IpamEvent::AddressAllocated(_) => "address_allocated",
            IpamEvent::AddressReleased(_) => "address_released",
            IpamEvent::DeviceInstalled(_) => "device_installed",
            IpamEvent::DeviceUninstalled(_) => "device_uninstalled",
            IpamEvent::DataCenterDeleted(_) => "data_center_deleted",
            IpamEvent::RoomDeleted(_) => "room_deleted",
            IpamEvent::RackDeleted(_) => "rack_deleted",
        }
    }

    /// NATS subject this event is published on
    pub fn subject(&self) -> String {
        let (aggregate, id, operation) = match self {
            IpamEvent::PoolCreated(e) => (AggregateType::Pool, e.pool.id.value(), Operation::Created),
            IpamEvent::AddressAllocated(e) => {
                (AggregateType::Pool, e.record.pool_id.value(), Operation::Allocated)
            }
            IpamEvent::AddressReleased(e) => {
                (AggregateType::Pool, e.record.pool_id.value(), Operation::Released)
            }
            IpamEvent::DeviceInstalled(e) => {
                (AggregateType::Device, e.device_id.value(), Operation::Installed)
            }
            IpamEvent::DeviceUninstalled(e) => {
                (AggregateType::Device, e.device_id.value(), Operation::Uninstalled)
            }
            IpamEvent::DataCenterDeleted(e) => (
                AggregateType::DataCenter,
                e.data_center_id.value(),
                Operation::Deleted,
            ),
            IpamEvent::RoomDeleted(e) => (AggregateType::Room, e.room_id.value(), Operation::Deleted),
            IpamEvent::RackDeleted(e) => (AggregateType::Rack, e.rack_id.value(), Operation::Deleted),
        };

        SubjectBuilder::new(aggregate).id(id).operation(operation).build()
    }
}
