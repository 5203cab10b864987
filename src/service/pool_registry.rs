// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pool Registry
//!
//! Creates IP pools (one per CIDR, system-wide) and lists them.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ServiceContext;
use crate::domain::{Cidr, DataCenterId, Pool, PoolId};
use crate::errors::{IpamError, IpamResult};
use crate::events::IpamEvent;

#[derive(Clone)]
pub struct PoolRegistry {
    context: ServiceContext,
}

impl PoolRegistry {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Register a pool for `cidr` in a data center
    ///
    /// Creating a CIDR that already has a pool returns the existing pool
    /// unchanged. The CIDR is matched in canonical form, so `10.0.0.1/30`
    /// finds the pool of `10.0.0.0/30`. A pool whose data center has been
    /// deleted is handed to `data_center_id`, ledger and all.
    pub async fn create_pool(&self, data_center_id: DataCenterId, cidr: &str) -> IpamResult<Pool> {
        let cidr = Cidr::new(cidr).map_err(IpamError::InvalidCidr)?;

        let (pool, created) = self
            .context
            .with_retry("create_pool", || self.try_create(data_center_id, cidr))
            .await?;

        if created {
            info!(pool = %pool.id, cidr = %pool.cidr, data_center = %data_center_id, "Created IP pool");
            self.context
                .emit(IpamEvent::pool_created(pool.clone(), pool.created_at, Uuid::now_v7()))
                .await;
        } else if pool.data_center_id != data_center_id {
            warn!(
                pool = %pool.id,
                cidr = %pool.cidr,
                owner = %pool.data_center_id,
                requested = %data_center_id,
                "CIDR already registered by another data center, returning existing pool"
            );
        }

        Ok(pool)
    }

    async fn try_create(&self, data_center_id: DataCenterId, cidr: Cidr) -> IpamResult<(Pool, bool)> {
        let store = self.context.store();
        if store.data_center(data_center_id).await?.is_none() {
            return Err(IpamError::DataCenterNotFound(data_center_id));
        }
        Ok(store.insert_pool_if_absent(data_center_id, cidr, Utc::now()).await?)
    }

    pub async fn pool(&self, id: PoolId) -> IpamResult<Pool> {
        self.context
            .store()
            .pool(id)
            .await?
            .ok_or(IpamError::PoolNotFound(id))
    }

    /// All pools, ordered by id
    pub async fn pools(&self) -> IpamResult<Vec<Pool>> {
        Ok(self.context.store().pools().await?)
    }
}
