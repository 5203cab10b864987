// Copyright (c) 2025 - Cowboy AI, Inc.

//! Projection adapters for external systems

pub mod netbox;

pub use netbox::{NetBoxConfig, NetBoxProjectionAdapter};
