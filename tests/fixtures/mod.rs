// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for dcim-ipam
//!
//! Deterministic values for pure tests, plus a small builder that stands up
//! an in-memory IPAM with one data center, room and rack.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use dcim_ipam::aggregate::InstallCommand;
use dcim_ipam::domain::{
    Cidr, DataCenterId, Device, DeviceId, NewDevice, Placement, Pool, PoolId, PoolLedger, RackId,
    RoomId,
};
use dcim_ipam::{Ipam, MemoryPublisher, MemoryStore, RetryPolicy, ServiceContext};

pub const CORRELATION_ID_1: &str = "01934f4a-c001-7000-8000-00000000c001";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("Invalid UUID in test fixture")
}

pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// `fixed_timestamp()` plus `secs` seconds
pub fn at(secs: i64) -> DateTime<Utc> {
    fixed_timestamp() + chrono::Duration::seconds(secs)
}

/// Empty ledger for `cidr` at version 0
pub fn empty_ledger(cidr: &str) -> PoolLedger {
    PoolLedger {
        pool: Pool {
            id: PoolId(1),
            data_center_id: DataCenterId(1),
            cidr: Cidr::new(cidr).expect("Invalid CIDR in test fixture"),
            created_at: fixed_timestamp(),
        },
        version: 0,
        records: Vec::new(),
        reserved_elsewhere: Default::default(),
    }
}

/// Unbound, uninstalled device
pub fn device_fixture(id: u64) -> Device {
    Device {
        id: DeviceId(id),
        name: format!("node-{id:02}"),
        model: None,
        service: None,
        state: Default::default(),
        placement: None,
        current_address: None,
        version: 0,
    }
}

/// In-memory IPAM with one data center, room and 10U rack
pub struct TestSite {
    pub ipam: Ipam,
    pub publisher: Arc<MemoryPublisher>,
    pub dc: DataCenterId,
    pub room: RoomId,
    pub rack: RackId,
}

impl TestSite {
    pub async fn new() -> Self {
        Self::with_retry(RetryPolicy::default()).await
    }

    pub async fn with_retry(retry: RetryPolicy) -> Self {
        let publisher = Arc::new(MemoryPublisher::new());
        let ipam = Ipam::new(ServiceContext::new(
            Arc::new(MemoryStore::new()),
            publisher.clone(),
            retry,
        ));

        let dc = ipam.binding.create_data_center("dc-east").await.unwrap();
        let room = ipam.binding.create_room(dc.id, "hall-1").await.unwrap();
        let rack = ipam.binding.create_rack(room.id, "r01", 10).await.unwrap();

        Self {
            ipam,
            publisher,
            dc: dc.id,
            room: room.id,
            rack: rack.id,
        }
    }

    /// Generous retry policy for heavy contention tests
    pub fn patient_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 100,
            backoff: Duration::from_millis(1),
        }
    }

    pub async fn pool(&self, cidr: &str) -> PoolId {
        self.ipam.pools.create_pool(self.dc, cidr).await.unwrap().id
    }

    pub async fn device(&self, name: &str) -> DeviceId {
        self.ipam
            .binding
            .create_device(NewDevice {
                name: name.to_string(),
                model: Some("R650".to_string()),
                service: Some("web".to_string()),
            })
            .await
            .unwrap()
            .id
    }

    pub fn placement(&self, start_unit: u32, end_unit: u32) -> InstallCommand {
        InstallCommand {
            placement: Placement {
                data_center_id: self.dc,
                room_id: self.room,
                rack_id: self.rack,
                start_unit,
                end_unit,
            },
            state: None,
        }
    }
}
