// Copyright (c) 2025 - Cowboy AI, Inc.
//! Read-only queries over the address ledger

use serde::Serialize;
use std::net::IpAddr;

use super::ServiceContext;
use crate::domain::{AddressRecord, DeviceId, PoolId, PoolUtilization};
use crate::errors::{IpamError, IpamResult};

/// A ledger record and the device holding it, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressOwner {
    pub record: AddressRecord,
    pub device_id: Option<DeviceId>,
}

/// A device and the record of its current address, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceAddress {
    pub device_id: DeviceId,
    pub record: Option<AddressRecord>,
}

/// Every record of a pool, ordered by address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolAddresses {
    pub count: usize,
    pub records: Vec<AddressRecord>,
}

#[derive(Clone)]
pub struct AddressLookup {
    context: ServiceContext,
}

impl AddressLookup {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub async fn find_by_address(&self, address: IpAddr) -> IpamResult<AddressOwner> {
        let store = self.context.store();
        let record = store
            .record_by_address(address)
            .await?
            .ok_or(IpamError::AddressNotFound(address))?;

        let device_id = if record.is_held() {
            store.device_holding(address).await?.map(|d| d.id)
        } else {
            None
        };

        Ok(AddressOwner { record, device_id })
    }

    pub async fn find_by_device(&self, device_id: DeviceId) -> IpamResult<DeviceAddress> {
        let store = self.context.store();
        let device = store
            .device(device_id)
            .await?
            .ok_or(IpamError::DeviceNotFound(device_id))?;

        let record = match device.current_address {
            Some(address) => store.record_by_address(address).await?,
            None => None,
        };

        Ok(DeviceAddress { device_id, record })
    }

    pub async fn list_by_pool(&self, pool_id: PoolId) -> IpamResult<PoolAddresses> {
        let ledger = self
            .context
            .store()
            .ledger(pool_id)
            .await?
            .ok_or(IpamError::PoolNotFound(pool_id))?;

        let mut records = ledger.records;
        records.sort_by_key(|r| r.address);

        Ok(PoolAddresses {
            count: records.len(),
            records,
        })
    }

    pub async fn utilization(&self, pool_id: PoolId) -> IpamResult<PoolUtilization> {
        let ledger = self
            .context
            .store()
            .ledger(pool_id)
            .await?
            .ok_or(IpamError::PoolNotFound(pool_id))?;

        Ok(PoolUtilization::from_ledger(&ledger))
    }
}
