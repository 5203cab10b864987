// Copyright (c) 2025 - Cowboy AI, Inc.
//! HTTP API router for the IPAM service

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::service::Ipam;

/// Create the API router with all endpoints.
///
/// # Routes
///
/// ## Pools and Addresses
/// - `POST /pools` - Create (or fetch) the pool for a CIDR
/// - `GET /pools`, `GET /pools/:id`, `GET /pools/:id/utilization`
/// - `GET /pools/:id/addresses` - Ledger records ordered by address
/// - `POST /pools/allocate` - Assign an address to a device
/// - `POST /pools/release` - Return an address to its pool
/// - `GET /addresses/:ip` - Record and holding device
/// - `GET /devices/:id/address` - A device's current address
///
/// ## Inventory
/// - `GET /datacenters` - Data centers with rooms, racks and devices nested
/// - `POST /datacenters`, `DELETE /datacenters/:id`
/// - `POST /datacenters/:id/rooms`, `DELETE /rooms/:id`
/// - `POST /rooms/:id/racks`, `GET /racks/:id`, `DELETE /racks/:id`
/// - `POST /devices`, `GET /devices/:id`
/// - `GET /devices/search?query=` - By id, or by name fragment ignoring case
/// - `POST /devices/:id/install`, `POST /devices/:id/uninstall`
///
/// ## Health
/// - `GET /health`
pub fn create_router(ipam: Ipam) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/pools",
            post(handlers::create_pool_handler).get(handlers::list_pools_handler),
        )
        .route("/pools/allocate", post(handlers::allocate_handler))
        .route("/pools/release", post(handlers::release_handler))
        .route("/pools/:id", get(handlers::get_pool_handler))
        .route("/pools/:id/addresses", get(handlers::pool_addresses_handler))
        .route("/pools/:id/utilization", get(handlers::pool_utilization_handler))
        .route("/addresses/:ip", get(handlers::find_address_handler))
        .route(
            "/datacenters",
            post(handlers::create_data_center_handler).get(handlers::list_data_centers_handler),
        )
        .route("/datacenters/:id", delete(handlers::delete_data_center_handler))
        .route("/datacenters/:id/rooms", post(handlers::create_room_handler))
        .route("/rooms/:id", delete(handlers::delete_room_handler))
        .route("/rooms/:id/racks", post(handlers::create_rack_handler))
        .route(
            "/racks/:id",
            get(handlers::get_rack_handler).delete(handlers::delete_rack_handler),
        )
        .route("/devices", post(handlers::create_device_handler))
        .route("/devices/search", get(handlers::search_device_handler))
        .route("/devices/:id", get(handlers::get_device_handler))
        .route("/devices/:id/address", get(handlers::device_address_handler))
        .route("/devices/:id/install", post(handlers::install_handler))
        .route("/devices/:id/uninstall", post(handlers::uninstall_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(ipam)
}

/// Serve the API until the process is stopped
pub async fn serve(ipam: Ipam, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("IPAM API listening on {}", addr);
    axum::serve(listener, create_router(ipam)).await
}
