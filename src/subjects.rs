// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for IPAM events
//!
//! # Subject Pattern
//!
//! ```text
//! ipam.{aggregate}.{id}.{operation}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`ipam.pool.4.allocated`)
//! - Per-row wildcards (`ipam.pool.4.>`)
//! - Aggregate-level wildcards (`ipam.pool.>`)
//! - Global subscriptions (`ipam.>`)
//!
//! # Examples
//!
//! ```rust
//! use dcim_ipam::subjects::{AggregateType, Operation, SubjectBuilder};
//!
//! let subject = SubjectBuilder::new(AggregateType::Pool)
//!     .id(4)
//!     .operation(Operation::Allocated)
//!     .build();
//! assert_eq!(subject, "ipam.pool.4.allocated");
//!
//! let wildcard = SubjectBuilder::new(AggregateType::Device).build();
//! assert_eq!(wildcard, "ipam.device.>");
//! ```

use std::fmt;

/// Root namespace for all IPAM subjects
pub const IPAM_ROOT: &str = "ipam";

/// Aggregates that emit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateType {
    /// IP pools and their address ledgers
    Pool,
    /// Racked equipment
    Device,
    /// Data centers (cascade deletes)
    DataCenter,
    /// Rooms (cascade deletes)
    Room,
    /// Racks (cascade deletes)
    Rack,
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateType::Pool => write!(f, "pool"),
            AggregateType::Device => write!(f, "device"),
            AggregateType::DataCenter => write!(f, "datacenter"),
            AggregateType::Room => write!(f, "room"),
            AggregateType::Rack => write!(f, "rack"),
        }
    }
}

/// Event operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A pool was created
    Created,
    /// An address was handed to a device
    Allocated,
    /// An address went back to its pool
    Released,
    /// A device was racked
    Installed,
    /// A device was unracked
    Uninstalled,
    /// A data center, room or rack and its contents were removed
    Deleted,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Created => write!(f, "created"),
            Operation::Allocated => write!(f, "allocated"),
            Operation::Released => write!(f, "released"),
            Operation::Installed => write!(f, "installed"),
            Operation::Uninstalled => write!(f, "uninstalled"),
            Operation::Deleted => write!(f, "deleted"),
        }
    }
}

/// Builder for IPAM NATS subjects
///
/// Missing trailing tokens become a `>` wildcard.
#[derive(Debug, Clone)]
pub struct SubjectBuilder {
    aggregate: AggregateType,
    id: Option<u64>,
    operation: Option<Operation>,
}

impl SubjectBuilder {
    pub fn new(aggregate: AggregateType) -> Self {
        Self {
            aggregate,
            id: None,
            operation: None,
        }
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn build(self) -> String {
        match (self.id, self.operation) {
            (Some(id), Some(operation)) => {
                format!("{}.{}.{}.{}", IPAM_ROOT, self.aggregate, id, operation)
            }
            (Some(id), None) => format!("{}.{}.{}.>", IPAM_ROOT, self.aggregate, id),
            (None, Some(operation)) => {
                format!("{}.{}.*.{}", IPAM_ROOT, self.aggregate, operation)
            }
            (None, None) => format!("{}.{}.>", IPAM_ROOT, self.aggregate),
        }
    }

    /// Subscription for every IPAM event: `ipam.>`
    pub fn build_all() -> String {
        format!("{}.>", IPAM_ROOT)
    }
}
