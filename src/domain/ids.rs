// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed row identifiers
//!
//! Every inventory and ledger row is keyed by a store-assigned integer.
//! The wrappers keep a pool id from being passed where a device id is
//! expected; on the wire they are plain integers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

row_id!(
    /// Data center identifier
    DataCenterId
);
row_id!(
    /// Room identifier
    RoomId
);
row_id!(
    /// Rack identifier
    RackId
);
row_id!(
    /// Device identifier
    DeviceId
);
row_id!(
    /// IP pool identifier
    PoolId
);
row_id!(
    /// Address ledger record identifier
    RecordId
);
