// Copyright (c) 2025 - Cowboy AI, Inc.

//! NetBox Projection Adapter
//!
//! Mirrors IPAM pools and address assignments into NetBox through its REST
//! API:
//!
//! ```text
//! PoolCreated       → POST  /api/ipam/prefixes/
//! AddressAllocated  → POST or PATCH /api/ipam/ip-addresses/  (status active)
//! AddressReleased   → PATCH /api/ipam/ip-addresses/{id}/     (status deprecated)
//! ```
//!
//! Ledger records are never deleted, so a released address stays in NetBox
//! as `deprecated` and is switched back to `active` when it is reused.
//!
//! # Example
//!
//! ```rust,no_run
//! use dcim_ipam::adapters::{NetBoxConfig, NetBoxProjectionAdapter};
//! use dcim_ipam::projection::ProjectionAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NetBoxConfig {
//!         base_url: "http://netbox.local".to_string(),
//!         api_token: "your-token-here".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let mut projection = NetBoxProjectionAdapter::new(config).await?;
//!     projection.initialize().await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::domain::{AddressRecord, DeviceId, PoolId};
use crate::events::{AddressAllocated, AddressReleased, IpamEvent, PoolCreated};
use crate::projection::{ProjectionAdapter, ProjectionError};

/// Configuration for NetBox connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBoxConfig {
    /// NetBox base URL (e.g., "http://netbox.local")
    pub base_url: String,

    /// API token for authentication
    pub api_token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for NetBoxConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// NetBox prefix representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBoxPrefix {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// CIDR format: "192.168.1.0/24"
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// NetBox IP address representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBoxIpAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Address with the pool's prefix length: "192.168.1.10/24"
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

/// NetBox projection adapter
pub struct NetBoxProjectionAdapter {
    config: NetBoxConfig,
    client: Client,
    /// Prefix length per pool, learned from `PoolCreated`
    prefix_lengths: HashMap<PoolId, u8>,
}

impl NetBoxProjectionAdapter {
    pub async fn new(config: NetBoxConfig) -> Result<Self, ProjectionError> {
        info!("Connecting to NetBox at {}", config.base_url);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Token {}", config.api_token)
                .parse()
                .map_err(|e| ProjectionError::TargetUnavailable(format!("Invalid API token: {}", e)))?,
        );
        headers.insert(
            "Content-Type",
            "application/json"
                .parse()
                .map_err(|e| ProjectionError::TargetUnavailable(format!("Invalid header: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ProjectionError::TargetUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            client,
            prefix_lengths: HashMap::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Address in NetBox notation, using the pool's prefix length when known
    fn netbox_address(&self, record: &AddressRecord) -> String {
        let host_len = if record.address.is_ipv4() { 32 } else { 128 };
        let prefix = self
            .prefix_lengths
            .get(&record.pool_id)
            .copied()
            .unwrap_or(host_len);
        format!("{}/{}", record.address, prefix)
    }

    async fn project_pool_created(&mut self, event: &PoolCreated) -> Result<(), ProjectionError> {
        let pool = &event.pool;
        self.prefix_lengths.insert(pool.id, pool.cidr.prefix());

        let existing: Page<NetBoxPrefix> = self
            .get_json("ipam/prefixes/", &[("prefix", pool.cidr.to_string())])
            .await?;
        if !existing.results.is_empty() {
            debug!("Prefix {} already in NetBox", pool.cidr);
            return Ok(());
        }

        let prefix = NetBoxPrefix {
            id: None,
            prefix: pool.cidr.to_string(),
            status: Some("active".to_string()),
            description: Some(format!(
                "IPAM pool {} (data center {})",
                pool.id, pool.data_center_id
            )),
        };
        let response = self
            .client
            .post(self.url("ipam/prefixes/"))
            .json(&prefix)
            .send()
            .await
            .map_err(api_error)?;
        check(response).await?;

        debug!("Projected PoolCreated to NetBox: {}", pool.cidr);
        Ok(())
    }

    async fn project_address_allocated(&self, event: &AddressAllocated) -> Result<(), ProjectionError> {
        self.upsert_address(&event.record, "active", Some(event.device_id))
            .await?;
        debug!("Projected AddressAllocated to NetBox: {}", event.record.address);
        Ok(())
    }

    async fn project_address_released(&self, event: &AddressReleased) -> Result<(), ProjectionError> {
        self.upsert_address(&event.record, "deprecated", None).await?;
        debug!("Projected AddressReleased to NetBox: {}", event.record.address);
        Ok(())
    }

    async fn upsert_address(
        &self,
        record: &AddressRecord,
        status: &str,
        device_id: Option<DeviceId>,
    ) -> Result<(), ProjectionError> {
        let body = NetBoxIpAddress {
            id: None,
            address: self.netbox_address(record),
            status: Some(status.to_string()),
            description: Some(match device_id {
                Some(device) => format!("IPAM pool {}, device {}", record.pool_id, device),
                None => format!("IPAM pool {}", record.pool_id),
            }),
        };

        let request = match self.find_address(record.address).await? {
            Some(id) => self.client.patch(self.url(&format!("ipam/ip-addresses/{}/", id))),
            None => self.client.post(self.url("ipam/ip-addresses/")),
        };
        let response = request.json(&body).send().await.map_err(api_error)?;
        check(response).await
    }

    async fn find_address(&self, address: IpAddr) -> Result<Option<i64>, ProjectionError> {
        let page: Page<NetBoxIpAddress> = self
            .get_json("ipam/ip-addresses/", &[("address", address.to_string())])
            .await?;
        Ok(page.results.into_iter().find_map(|a| a.id))
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ProjectionError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(api_error)?;
        let response = check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProjectionError::TargetError(format!("Unexpected NetBox response: {}", e)))
    }
}

fn api_error(err: reqwest::Error) -> ProjectionError {
    ProjectionError::TargetUnavailable(format!("NetBox API error: {}", err))
}

async fn check_response(response: Response) -> Result<Response, ProjectionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProjectionError::TargetError(format!(
        "NetBox API returned {}: {}",
        status, body
    )))
}

async fn check(response: Response) -> Result<(), ProjectionError> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED => Ok(()),
        _ => check_response(response).await.map(|_| ()),
    }
}

#[async_trait]
impl ProjectionAdapter for NetBoxProjectionAdapter {
    type Event = IpamEvent;
    type Error = ProjectionError;

    async fn project(&mut self, event: Self::Event) -> Result<(), Self::Error> {
        debug!(
            "Projecting event to NetBox: {} ({})",
            event.event_type_name(),
            event.event_id()
        );

        match &event {
            IpamEvent::PoolCreated(e) => self.project_pool_created(e).await?,
            IpamEvent::AddressAllocated(e) => self.project_address_allocated(e).await?,
            IpamEvent::AddressReleased(e) => self.project_address_released(e).await?,
            other => {
                debug!("No NetBox mapping for {}", other.event_type_name());
            }
        }

        Ok(())
    }

    async fn initialize(&mut self) -> Result<(), Self::Error> {
        info!("Initializing NetBox projection adapter");
        self.health_check().await?;
        info!("NetBox projection adapter initialized successfully");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Self::Error> {
        let response = self
            .client
            .get(self.url("status/"))
            .send()
            .await
            .map_err(|e| ProjectionError::TargetUnavailable(format!("NetBox health check failed: {}", e)))?;

        if response.status().is_success() {
            debug!("NetBox health check passed");
            Ok(())
        } else {
            Err(ProjectionError::TargetUnavailable(format!(
                "NetBox returned status: {}",
                response.status()
            )))
        }
    }

    async fn reset(&mut self) -> Result<(), Self::Error> {
        error!("NetBox projection reset is not supported, it would delete NetBox data");
        Err(ProjectionError::ResetNotSupported)
    }

    fn name(&self) -> &str {
        "netbox-ipam-projection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordId;

    fn record(address: &str) -> AddressRecord {
        AddressRecord {
            id: RecordId(1),
            pool_id: PoolId(2),
            address: address.parse().unwrap(),
            assigned_at: None,
            released_at: None,
        }
    }

    #[test]
    fn test_config_default() {
        let config = NetBoxConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.api_token.is_empty());
    }

    #[tokio::test]
    async fn test_address_notation_uses_pool_prefix() {
        let mut adapter = NetBoxProjectionAdapter::new(NetBoxConfig::default())
            .await
            .unwrap();

        assert_eq!(adapter.netbox_address(&record("10.0.0.5")), "10.0.0.5/32");
        assert_eq!(adapter.netbox_address(&record("fd00::5")), "fd00::5/128");

        adapter.prefix_lengths.insert(PoolId(2), 24);
        assert_eq!(adapter.netbox_address(&record("10.0.0.5")), "10.0.0.5/24");
    }

    #[test]
    fn test_ip_address_serialization_skips_empty_fields() {
        let body = NetBoxIpAddress {
            id: None,
            address: "10.0.0.5/24".to_string(),
            status: Some("active".to_string()),
            description: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["address"], "10.0.0.5/24");
        assert!(json.get("id").is_none());
        assert!(json.get("description").is_none());
    }
}
