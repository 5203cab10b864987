// Copyright (c) 2025 - Cowboy AI, Inc.
//! HTTP API for pools, addresses and inventory
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dcim_ipam::{api, service::Ipam};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     api::serve(Ipam::in_memory(), "127.0.0.1:8080".parse().unwrap()).await
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod router;

pub use error::{ApiJson, ErrorResponse};
pub use router::{create_router, serve};
