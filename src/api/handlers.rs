// Copyright (c) 2025 - Cowboy AI, Inc.
//! HTTP handlers
//!
//! Each handler parses its input, calls one service operation and maps the
//! result onto a JSON body. Errors are rendered by [`IpamError`]'s
//! `IntoResponse` implementation; request bodies are read with [`ApiJson`]
//! so malformed input gets the same error body.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::aggregate::InstallCommand;
use crate::domain::{
    parse_address, AddressRecord, DataCenterId, DeviceId, DeviceState, NewDevice, Placement, Pool,
    PoolId, RackId, RecordId, RoomId,
};
use super::error::ApiJson;
use crate::errors::{IpamError, IpamResult};
use crate::service::{DataCenterTree, DeviceMatch, Ipam};
use crate::store::CascadeReport;

const SUCCESS: &str = "success";

// ---- request bodies ----

#[derive(Debug, Deserialize)]
pub struct CreatePoolRequest {
    pub dc_id: DataCenterId,
    pub cidr: String,
}

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub range_id: PoolId,
    pub device_id: DeviceId,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub ip: String,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRackRequest {
    pub name: String,
    pub total_units: u32,
}

#[derive(Debug, Deserialize)]
pub struct InstallRequest {
    pub data_center_id: DataCenterId,
    pub room_id: RoomId,
    pub rack_id: RackId,
    pub start_unit: u32,
    pub end_unit: u32,
    #[serde(default)]
    pub state: Option<DeviceState>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

impl From<InstallRequest> for InstallCommand {
    fn from(req: InstallRequest) -> Self {
        InstallCommand {
            placement: Placement {
                data_center_id: req.data_center_id,
                room_id: req.room_id,
                rack_id: req.rack_id,
                start_unit: req.start_unit,
                end_unit: req.end_unit,
            },
            state: req.state,
        }
    }
}

// ---- response bodies ----

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct PoolResponse {
    pub status: &'static str,
    pub id: PoolId,
    pub cidr: String,
    pub dc_id: DataCenterId,
    pub created_at: String,
}

impl From<Pool> for PoolResponse {
    fn from(pool: Pool) -> Self {
        Self {
            status: SUCCESS,
            id: pool.id,
            cidr: pool.cidr.to_string(),
            dc_id: pool.data_center_id,
            created_at: rfc3339(pool.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PoolListResponse {
    pub count: usize,
    pub pools: Vec<PoolResponse>,
}

/// One ledger record; `released` is null while the address is held
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub status: &'static str,
    pub id: RecordId,
    pub ip: IpAddr,
    pub range_id: PoolId,
    pub assigned: Option<String>,
    pub released: Option<String>,
}

impl From<AddressRecord> for AddressResponse {
    fn from(record: AddressRecord) -> Self {
        Self {
            status: SUCCESS,
            id: record.id,
            ip: record.address,
            range_id: record.pool_id,
            assigned: record.assigned_at.map(rfc3339),
            released: record.released_at.map(rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddressOwnerResponse {
    #[serde(flatten)]
    pub address: AddressResponse,
    pub device_id: Option<DeviceId>,
}

#[derive(Debug, Serialize)]
pub struct DeviceAddressResponse {
    pub status: &'static str,
    pub device_id: DeviceId,
    pub address: Option<AddressResponse>,
}

#[derive(Debug, Serialize)]
pub struct PoolAddressesResponse {
    pub count: usize,
    pub addresses: Vec<AddressResponse>,
}

#[derive(Debug, Serialize)]
pub struct DeviceSearchResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub hit: DeviceMatch,
}

#[derive(Debug, Serialize)]
pub struct CascadeResponse {
    pub status: &'static str,
    pub rooms: Vec<RoomId>,
    pub racks: Vec<RackId>,
    pub devices: Vec<DeviceId>,
    pub released: Vec<IpAddr>,
}

impl From<CascadeReport> for CascadeResponse {
    fn from(report: CascadeReport) -> Self {
        Self {
            status: SUCCESS,
            rooms: report.rooms,
            racks: report.racks,
            devices: report.devices,
            released: report.released.into_iter().map(|(_, r)| r.address).collect(),
        }
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn address_param(raw: &str) -> IpamResult<IpAddr> {
    parse_address(raw).map_err(IpamError::InvalidAddress)
}

// ---- health ----

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

// ---- pools and addresses ----

pub async fn create_pool_handler(
    State(ipam): State<Ipam>,
    ApiJson(req): ApiJson<CreatePoolRequest>,
) -> IpamResult<Json<PoolResponse>> {
    let pool = ipam.pools.create_pool(req.dc_id, &req.cidr).await?;
    Ok(Json(pool.into()))
}

pub async fn list_pools_handler(State(ipam): State<Ipam>) -> IpamResult<Json<PoolListResponse>> {
    let pools: Vec<PoolResponse> = ipam.pools.pools().await?.into_iter().map(Into::into).collect();
    Ok(Json(PoolListResponse {
        count: pools.len(),
        pools,
    }))
}

pub async fn get_pool_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<Json<PoolResponse>> {
    Ok(Json(ipam.pools.pool(PoolId(id)).await?.into()))
}

pub async fn pool_utilization_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<impl IntoResponse> {
    Ok(Json(ipam.lookup.utilization(PoolId(id)).await?))
}

pub async fn pool_addresses_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<Json<PoolAddressesResponse>> {
    let listing = ipam.lookup.list_by_pool(PoolId(id)).await?;
    Ok(Json(PoolAddressesResponse {
        count: listing.count,
        addresses: listing.records.into_iter().map(Into::into).collect(),
    }))
}

pub async fn allocate_handler(
    State(ipam): State<Ipam>,
    ApiJson(req): ApiJson<AllocateRequest>,
) -> IpamResult<Json<AddressResponse>> {
    let record = ipam.ledger.allocate(req.range_id, req.device_id).await?;
    Ok(Json(record.into()))
}

pub async fn release_handler(
    State(ipam): State<Ipam>,
    ApiJson(req): ApiJson<ReleaseRequest>,
) -> IpamResult<Json<AddressResponse>> {
    let record = ipam.ledger.release(address_param(&req.ip)?).await?;
    Ok(Json(record.into()))
}

pub async fn find_address_handler(
    State(ipam): State<Ipam>,
    Path(ip): Path<String>,
) -> IpamResult<Json<AddressOwnerResponse>> {
    let owner = ipam.lookup.find_by_address(address_param(&ip)?).await?;
    Ok(Json(AddressOwnerResponse {
        address: owner.record.into(),
        device_id: owner.device_id,
    }))
}

pub async fn device_address_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<Json<DeviceAddressResponse>> {
    let found = ipam.lookup.find_by_device(DeviceId(id)).await?;
    Ok(Json(DeviceAddressResponse {
        status: SUCCESS,
        device_id: found.device_id,
        address: found.record.map(Into::into),
    }))
}

// ---- inventory ----

pub async fn create_data_center_handler(
    State(ipam): State<Ipam>,
    ApiJson(req): ApiJson<NameRequest>,
) -> IpamResult<impl IntoResponse> {
    let data_center = ipam.binding.create_data_center(&req.name).await?;
    Ok((StatusCode::CREATED, Json(data_center)))
}

pub async fn list_data_centers_handler(
    State(ipam): State<Ipam>,
) -> IpamResult<Json<Vec<DataCenterTree>>> {
    Ok(Json(ipam.binding.data_centers().await?))
}

pub async fn delete_data_center_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<Json<CascadeResponse>> {
    let report = ipam.binding.delete_data_center(DataCenterId(id)).await?;
    Ok(Json(report.into()))
}

pub async fn create_room_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
    ApiJson(req): ApiJson<NameRequest>,
) -> IpamResult<impl IntoResponse> {
    let room = ipam.binding.create_room(DataCenterId(id), &req.name).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn delete_room_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<Json<CascadeResponse>> {
    let report = ipam.binding.delete_room(RoomId(id)).await?;
    Ok(Json(report.into()))
}

pub async fn create_rack_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
    ApiJson(req): ApiJson<CreateRackRequest>,
) -> IpamResult<impl IntoResponse> {
    let rack = ipam
        .binding
        .create_rack(RoomId(id), &req.name, req.total_units)
        .await?;
    Ok((StatusCode::CREATED, Json(rack)))
}

pub async fn get_rack_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<impl IntoResponse> {
    Ok(Json(ipam.binding.rack(RackId(id)).await?))
}

pub async fn delete_rack_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<Json<CascadeResponse>> {
    let report = ipam.binding.delete_rack(RackId(id)).await?;
    Ok(Json(report.into()))
}

pub async fn create_device_handler(
    State(ipam): State<Ipam>,
    ApiJson(req): ApiJson<NewDevice>,
) -> IpamResult<impl IntoResponse> {
    let device = ipam.binding.create_device(req).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn get_device_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<impl IntoResponse> {
    Ok(Json(ipam.binding.device(DeviceId(id)).await?))
}

pub async fn search_device_handler(
    State(ipam): State<Ipam>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> IpamResult<Json<DeviceSearchResponse>> {
    let Query(params) = params?;
    let hit = ipam.binding.search_device(&params.query).await?;
    Ok(Json(DeviceSearchResponse {
        status: SUCCESS,
        hit,
    }))
}

pub async fn install_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
    ApiJson(req): ApiJson<InstallRequest>,
) -> IpamResult<impl IntoResponse> {
    Ok(Json(ipam.binding.install(DeviceId(id), req.into()).await?))
}

pub async fn uninstall_handler(
    State(ipam): State<Ipam>,
    Path(id): Path<u64>,
) -> IpamResult<impl IntoResponse> {
    Ok(Json(ipam.binding.uninstall(DeviceId(id)).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_address_response_shape() {
        let assigned = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let record = AddressRecord {
            id: RecordId(4),
            pool_id: PoolId(1),
            address: "10.0.0.2".parse().unwrap(),
            assigned_at: Some(assigned),
            released_at: None,
        };

        let json = serde_json::to_value(AddressResponse::from(record)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["ip"], "10.0.0.2");
        assert_eq!(json["range_id"], 1);
        assert_eq!(json["assigned"], "2026-03-01T12:00:00.000000Z");
        assert!(json["released"].is_null());
    }

    #[test]
    fn test_install_request_defaults_state() {
        let req: InstallRequest = serde_json::from_value(serde_json::json!({
            "data_center_id": 1,
            "room_id": 2,
            "rack_id": 3,
            "start_unit": 1,
            "end_unit": 2
        }))
        .unwrap();

        let command = InstallCommand::from(req);
        assert_eq!(command.state, None);
        assert_eq!(command.placement.rack_id, RackId(3));
    }
}
