// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Ledger
//!
//! Hands out host addresses of a pool to devices and takes them back.
//!
//! # Allocation Order
//!
//! 1. The pool's free record released earliest (lowest record id on ties)
//! 2. Otherwise the lowest host address of the CIDR not yet in the ledger
//!
//! Two concurrent allocations on one pool race on the pool ledger version.
//! The loser's commit is rejected by the store and retried on a fresh
//! snapshot, so both callers end up with distinct addresses.

use chrono::Utc;
use std::net::IpAddr;
use tracing::info;
use uuid::Uuid;

use super::ServiceContext;
use crate::aggregate::{handle_allocate, handle_release};
use crate::domain::{AddressRecord, DeviceId, PoolId};
use crate::errors::{IpamError, IpamResult};
use crate::events::IpamEvent;

#[derive(Clone)]
pub struct AddressLedger {
    context: ServiceContext,
}

impl AddressLedger {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Assign one address of `pool_id` to `device_id`
    pub async fn allocate(&self, pool_id: PoolId, device_id: DeviceId) -> IpamResult<AddressRecord> {
        let record = self
            .context
            .with_retry("allocate", || self.try_allocate(pool_id, device_id))
            .await?;

        info!(
            pool = %pool_id,
            device = %device_id,
            address = %record.address,
            "Allocated address"
        );
        let timestamp = record.assigned_at.unwrap_or_else(Utc::now);
        self.context
            .emit(IpamEvent::address_allocated(
                record.clone(),
                device_id,
                timestamp,
                Uuid::now_v7(),
            ))
            .await;

        Ok(record)
    }

    async fn try_allocate(&self, pool_id: PoolId, device_id: DeviceId) -> IpamResult<AddressRecord> {
        let store = self.context.store();
        let ledger = store
            .ledger(pool_id)
            .await?
            .ok_or(IpamError::PoolNotFound(pool_id))?;
        let device = store
            .device(device_id)
            .await?
            .ok_or(IpamError::DeviceNotFound(device_id))?;

        let change = handle_allocate(&ledger, &device, Utc::now())?;
        Ok(store.commit_ledger(&change).await?)
    }

    /// Return `address` to its pool and unbind the device holding it
    pub async fn release(&self, address: IpAddr) -> IpamResult<AddressRecord> {
        let (record, holder) = self
            .context
            .with_retry("release", || self.try_release(address))
            .await?;

        info!(
            pool = %record.pool_id,
            address = %record.address,
            device = ?holder.map(|d| d.value()),
            "Released address"
        );
        let timestamp = record.released_at.unwrap_or_else(Utc::now);
        self.context
            .emit(IpamEvent::address_released(
                record.clone(),
                holder,
                timestamp,
                Uuid::now_v7(),
            ))
            .await;

        Ok(record)
    }

    async fn try_release(&self, address: IpAddr) -> IpamResult<(AddressRecord, Option<DeviceId>)> {
        let store = self.context.store();
        let record = store
            .record_by_address(address)
            .await?
            .ok_or(IpamError::AddressNotFound(address))?;
        let ledger = store
            .ledger(record.pool_id)
            .await?
            .ok_or(IpamError::PoolNotFound(record.pool_id))?;
        let holder = store.device_holding(address).await?;

        let change = handle_release(&ledger, address, holder.as_ref(), Utc::now())?;
        let released = store.commit_ledger(&change).await?;
        Ok((released, change.binding.map(|b| b.device_id)))
    }
}
