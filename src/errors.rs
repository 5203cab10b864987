//! Error types for IPAM operations

use std::net::IpAddr;
use thiserror::Error;

use crate::domain::{
    Cidr, DataCenterId, DeviceId, NetworkError, PoolId, RackId, RoomId,
};
use crate::store::StoreError;

/// Errors surfaced by the registry, ledger, binding and lookup services
///
/// Every variant maps to a stable machine-readable [`IpamError::kind`].
/// Only [`IpamError::ConcurrencyConflict`] is worth retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpamError {
    #[error("IP pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("Device {0} not found")]
    DeviceNotFound(DeviceId),

    #[error("No device matches '{0}'")]
    NoMatchingDevice(String),

    #[error("Device {device} already holds address {address}; release it first")]
    DeviceAlreadyBound { device: DeviceId, address: IpAddr },

    #[error("Address {0} was never allocated")]
    AddressNotFound(IpAddr),

    #[error("Address {0} is not currently held")]
    AddressNotHeld(IpAddr),

    #[error("IP pool {pool} ({cidr}) has no unused host addresses")]
    PoolExhausted { pool: PoolId, cidr: Cidr },

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(NetworkError),

    #[error("Invalid address: {0}")]
    InvalidAddress(NetworkError),

    #[error("Concurrent modification, retry the request: {0}")]
    ConcurrencyConflict(String),

    #[error("Data center {0} not found")]
    DataCenterNotFound(DataCenterId),

    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Rack {0} not found")]
    RackNotFound(RackId),

    #[error("Invalid unit span {start}..={end} for a rack of {total} units")]
    InvalidUnitSpan { start: u32, end: u32, total: u32 },

    #[error("Rack {rack} has {free} free units, {requested} requested")]
    InsufficientRackUnits { rack: RackId, requested: u32, free: u32 },

    #[error("Units {start}..={end} of rack {rack} are occupied by device {occupant}")]
    UnitsOccupied {
        rack: RackId,
        start: u32,
        end: u32,
        occupant: DeviceId,
    },

    #[error("Device {0} is already installed elsewhere; uninstall it first")]
    DeviceAlreadyInstalled(DeviceId),

    #[error("Placement mismatch: {0}")]
    PlacementMismatch(String),

    #[error("Invalid device state: {0}")]
    InvalidState(String),

    /// Request body or query string could not be read
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Name already in use: {0}")]
    DuplicateName(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for IPAM operations
pub type IpamResult<T> = Result<T, IpamError>;

impl IpamError {
    /// Stable snake_case identifier for API clients
    pub fn kind(&self) -> &'static str {
        match self {
            IpamError::PoolNotFound(_) => "pool_not_found",
            IpamError::DeviceNotFound(_) => "device_not_found",
            IpamError::NoMatchingDevice(_) => "no_matching_device",
            IpamError::DeviceAlreadyBound { .. } => "device_already_bound",
            IpamError::AddressNotFound(_) => "address_not_found",
            IpamError::AddressNotHeld(_) => "address_not_held",
            IpamError::PoolExhausted { .. } => "pool_exhausted",
            IpamError::InvalidCidr(_) => "invalid_cidr",
            IpamError::InvalidAddress(_) => "invalid_address",
            IpamError::ConcurrencyConflict(_) => "concurrency_conflict",
            IpamError::DataCenterNotFound(_) => "data_center_not_found",
            IpamError::RoomNotFound(_) => "room_not_found",
            IpamError::RackNotFound(_) => "rack_not_found",
            IpamError::InvalidUnitSpan { .. } => "invalid_unit_span",
            IpamError::InsufficientRackUnits { .. } => "insufficient_rack_units",
            IpamError::UnitsOccupied { .. } => "units_occupied",
            IpamError::DeviceAlreadyInstalled(_) => "device_already_installed",
            IpamError::PlacementMismatch(_) => "placement_mismatch",
            IpamError::InvalidState(_) => "invalid_state",
            IpamError::InvalidRequest(_) => "invalid_request",
            IpamError::DuplicateName(_) => "duplicate_name",
            IpamError::Storage(_) => "storage_error",
        }
    }

    /// Whether resubmitting the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, IpamError::ConcurrencyConflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IpamError::PoolNotFound(_)
                | IpamError::DeviceNotFound(_)
                | IpamError::NoMatchingDevice(_)
                | IpamError::AddressNotFound(_)
                | IpamError::DataCenterNotFound(_)
                | IpamError::RoomNotFound(_)
                | IpamError::RackNotFound(_)
        )
    }
}

impl From<StoreError> for IpamError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => IpamError::ConcurrencyConflict(msg),
            StoreError::DuplicateName(name) => IpamError::DuplicateName(name),
            StoreError::Backend(msg) => IpamError::Storage(msg),
        }
    }
}

/// Errors from the event bus
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("NATS connection error: {0}")]
    NatsConnection(String),

    #[error("NATS publish error: {0}")]
    NatsPublish(String),

    #[error("NATS subscribe error: {0}")]
    NatsSubscribe(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type for event bus operations
pub type MessagingResult<T> = Result<T, MessagingError>;

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::Serialization(err.to_string())
    }
}
