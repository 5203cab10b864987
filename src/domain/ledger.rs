// Copyright (c) 2025 - Cowboy AI, Inc.
//! IP Pools and the Address Ledger
//!
//! A pool is a CIDR owned by one data center. The ledger keeps one record
//! per address ever issued from a pool; records are never deleted and move
//! between `held` and `free` for their whole lifetime. Addresses that were
//! never issued have no record at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use super::ids::{DataCenterId, PoolId, RecordId};
use super::network::Cidr;

/// CIDR-scoped address pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub data_center_id: DataCenterId,
    pub cidr: Cidr,
    pub created_at: DateTime<Utc>,
}

/// Derived lifecycle status of a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStatus {
    /// Assigned to a device
    Held,
    /// Returned to the pool and reusable
    Free,
}

impl AddressStatus {
    /// Held and free alternate; every other move is a caller bug
    pub fn can_transition_to(&self, target: &AddressStatus) -> bool {
        self != target
    }
}

impl fmt::Display for AddressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressStatus::Held => write!(f, "held"),
            AddressStatus::Free => write!(f, "free"),
        }
    }
}

/// One address ever issued from a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: RecordId,
    pub pool_id: PoolId,
    pub address: IpAddr,
    /// Last assignment time, kept after release for audit
    pub assigned_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
}

impl AddressRecord {
    pub fn status(&self) -> AddressStatus {
        if self.released_at.is_some() || self.assigned_at.is_none() {
            AddressStatus::Free
        } else {
            AddressStatus::Held
        }
    }

    pub fn is_held(&self) -> bool {
        self.status() == AddressStatus::Held
    }
}

/// Point-in-time view of one pool's ledger, as read from the store
///
/// `version` is the pool ledger version the snapshot was taken at; a commit
/// built from this snapshot is rejected if the ledger moved on since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLedger {
    pub pool: Pool,
    pub version: u64,
    pub records: Vec<AddressRecord>,
    /// Addresses inside this pool's CIDR already recorded under other pools
    pub reserved_elsewhere: BTreeSet<IpAddr>,
}

impl PoolLedger {
    pub fn held_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_held()).count()
    }

    pub fn free_count(&self) -> usize {
        self.records.len() - self.held_count()
    }
}

/// Address usage of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolUtilization {
    pub pool_id: PoolId,
    pub cidr: Cidr,
    /// Usable host addresses in the CIDR
    pub capacity: u128,
    pub held: u128,
    pub free: u128,
    /// Never issued
    pub unused: u128,
}

impl PoolUtilization {
    pub fn from_ledger(ledger: &PoolLedger) -> Self {
        let capacity = ledger.pool.cidr.capacity();
        let held = ledger.held_count() as u128;
        let free = ledger.free_count() as u128;
        let issued = held + free + ledger.reserved_elsewhere.len() as u128;

        Self {
            pool_id: ledger.pool.id,
            cidr: ledger.pool.cidr,
            capacity,
            held,
            free,
            unused: capacity.saturating_sub(issued),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(assigned: bool, released: bool) -> AddressRecord {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        AddressRecord {
            id: RecordId(1),
            pool_id: PoolId(1),
            address: "10.0.0.1".parse().unwrap(),
            assigned_at: assigned.then_some(at),
            released_at: released.then_some(at),
        }
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(record(true, false).status(), AddressStatus::Held);
        assert_eq!(record(true, true).status(), AddressStatus::Free);
        assert_eq!(record(false, false).status(), AddressStatus::Free);
    }

    #[test]
    fn test_status_transitions() {
        assert!(AddressStatus::Held.can_transition_to(&AddressStatus::Free));
        assert!(AddressStatus::Free.can_transition_to(&AddressStatus::Held));
        assert!(!AddressStatus::Free.can_transition_to(&AddressStatus::Free));
    }

    #[test]
    fn test_utilization() {
        let pool = Pool {
            id: PoolId(1),
            data_center_id: DataCenterId(1),
            cidr: Cidr::new("10.0.0.0/29").unwrap(),
            created_at: Utc::now(),
        };
        let mut free = record(true, true);
        free.id = RecordId(2);
        free.address = "10.0.0.2".parse().unwrap();

        let ledger = PoolLedger {
            pool,
            version: 2,
            records: vec![record(true, false), free],
            reserved_elsewhere: BTreeSet::new(),
        };

        let usage = PoolUtilization::from_ledger(&ledger);
        assert_eq!(usage.capacity, 6);
        assert_eq!(usage.held, 1);
        assert_eq!(usage.free, 1);
        assert_eq!(usage.unused, 4);
    }
}
