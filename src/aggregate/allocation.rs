// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Allocation Decisions
//!
//! Pure functions deciding how a pool ledger changes for an allocation or
//! a release. Input is a ledger snapshot plus the device involved; output
//! is a [`LedgerChange`] the store applies atomically, guarded by the
//! snapshot's version and the device's version.
//!
//! # Allocation order
//!
//! 1. Reuse the free record released longest ago
//! 2. Otherwise mint the lowest host address of the CIDR not yet present
//!    in the ledger
//!
//! Release times within one pool are strictly increasing (see
//! [`release_time`]), so "released longest ago" is the release order.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::domain::{AddressRecord, Device, DeviceId, PoolId, PoolLedger, RecordId};
use crate::errors::{IpamError, IpamResult};

/// Ledger row mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWrite {
    /// Insert a new held record
    Mint {
        pool_id: PoolId,
        address: IpAddr,
        assigned_at: DateTime<Utc>,
    },
    /// Hand a free record out again
    Reassign {
        record_id: RecordId,
        assigned_at: DateTime<Utc>,
    },
    /// Return a held record to the pool
    Release {
        record_id: RecordId,
        released_at: DateTime<Utc>,
    },
}

/// Device `current_address` mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingWrite {
    pub device_id: DeviceId,
    pub expected_version: u64,
    pub address: Option<IpAddr>,
}

/// Everything an allocation or release commits, as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    pub pool_id: PoolId,
    /// Ledger version the decision was made against
    pub expected_version: u64,
    pub write: RecordWrite,
    /// Absent when a released address has no holder left (device deleted)
    pub binding: Option<BindingWrite>,
}

/// Free record to hand out next, oldest release first
pub fn next_free_record(records: &[AddressRecord]) -> Option<&AddressRecord> {
    records
        .iter()
        .filter(|r| !r.is_held())
        .min_by_key(|r| (r.released_at, r.id))
}

/// Timestamp for a release committed after every release in `records`
///
/// Equal to `now` unless the pool already has a release at or after `now`
/// (same clock tick, or a lagging clock on another instance); then it is one
/// microsecond past the latest one. Ledger commits of a pool serialize, so
/// this keeps `released_at` in commit order.
pub fn release_time(records: &[AddressRecord], now: DateTime<Utc>) -> DateTime<Utc> {
    match records.iter().filter_map(|r| r.released_at).max() {
        Some(latest) if latest >= now => latest + Duration::microseconds(1),
        _ => now,
    }
}

/// Lowest host address of the pool not present anywhere in the ledger
pub fn next_unused_address(ledger: &PoolLedger) -> Option<IpAddr> {
    let taken: BTreeSet<IpAddr> = ledger
        .records
        .iter()
        .map(|r| r.address)
        .chain(ledger.reserved_elsewhere.iter().copied())
        .collect();

    ledger.pool.cidr.hosts().find(|address| !taken.contains(address))
}

/// Decide an allocation of one address from `ledger` to `device`
pub fn handle_allocate(
    ledger: &PoolLedger,
    device: &Device,
    now: DateTime<Utc>,
) -> IpamResult<LedgerChange> {
    if let Some(address) = device.current_address {
        return Err(IpamError::DeviceAlreadyBound {
            device: device.id,
            address,
        });
    }

    let (write, address) = match next_free_record(&ledger.records) {
        Some(record) => (
            RecordWrite::Reassign {
                record_id: record.id,
                assigned_at: now,
            },
            record.address,
        ),
        None => {
            let address = next_unused_address(ledger).ok_or(IpamError::PoolExhausted {
                pool: ledger.pool.id,
                cidr: ledger.pool.cidr,
            })?;
            (
                RecordWrite::Mint {
                    pool_id: ledger.pool.id,
                    address,
                    assigned_at: now,
                },
                address,
            )
        }
    };

    Ok(LedgerChange {
        pool_id: ledger.pool.id,
        expected_version: ledger.version,
        write,
        binding: Some(BindingWrite {
            device_id: device.id,
            expected_version: device.version,
            address: Some(address),
        }),
    })
}

/// Decide the release of `address`, clearing `holder`'s binding if given
pub fn handle_release(
    ledger: &PoolLedger,
    address: IpAddr,
    holder: Option<&Device>,
    now: DateTime<Utc>,
) -> IpamResult<LedgerChange> {
    let record = ledger
        .records
        .iter()
        .find(|r| r.address == address)
        .ok_or(IpamError::AddressNotFound(address))?;

    if !record.is_held() {
        return Err(IpamError::AddressNotHeld(address));
    }

    let binding = holder
        .filter(|device| device.current_address == Some(address))
        .map(|device| BindingWrite {
            device_id: device.id,
            expected_version: device.version,
            address: None,
        });

    Ok(LedgerChange {
        pool_id: ledger.pool.id,
        expected_version: ledger.version,
        write: RecordWrite::Release {
            record_id: record.id,
            released_at: release_time(&ledger.records, now),
        },
        binding,
    })
}

/// Fold a committed change into a ledger snapshot
///
/// The store does the same when it commits; this lets pure callers (and
/// property tests) replay a sequence of decisions without a store.
pub fn apply_change(mut ledger: PoolLedger, change: &LedgerChange, minted_id: RecordId) -> PoolLedger {
    match &change.write {
        RecordWrite::Mint {
            pool_id,
            address,
            assigned_at,
        } => ledger.records.push(AddressRecord {
            id: minted_id,
            pool_id: *pool_id,
            address: *address,
            assigned_at: Some(*assigned_at),
            released_at: None,
        }),
        RecordWrite::Reassign {
            record_id,
            assigned_at,
        } => {
            if let Some(record) = ledger.records.iter_mut().find(|r| r.id == *record_id) {
                record.assigned_at = Some(*assigned_at);
                record.released_at = None;
            }
        }
        RecordWrite::Release {
            record_id,
            released_at,
        } => {
            if let Some(record) = ledger.records.iter_mut().find(|r| r.id == *record_id) {
                record.released_at = Some(*released_at);
            }
        }
    }
    ledger.version += 1;
    ledger
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cidr, DataCenterId, DeviceState, Pool};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn ledger(cidr: &str) -> PoolLedger {
        PoolLedger {
            pool: Pool {
                id: PoolId(1),
                data_center_id: DataCenterId(1),
                cidr: Cidr::new(cidr).unwrap(),
                created_at: t0(),
            },
            version: 0,
            records: Vec::new(),
            reserved_elsewhere: BTreeSet::new(),
        }
    }

    fn device(id: u64) -> Device {
        Device {
            id: DeviceId(id),
            name: format!("dev{}", id),
            model: None,
            service: None,
            state: DeviceState::Uninstalled,
            placement: None,
            current_address: None,
            version: 0,
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_allocation_mints_lowest_host() {
        let ledger = ledger("10.0.0.0/29");
        let change = handle_allocate(&ledger, &device(1), t0()).unwrap();

        assert_eq!(
            change.write,
            RecordWrite::Mint {
                pool_id: PoolId(1),
                address: ip("10.0.0.1"),
                assigned_at: t0(),
            }
        );
        assert_eq!(
            change.binding,
            Some(BindingWrite {
                device_id: DeviceId(1),
                expected_version: 0,
                address: Some(ip("10.0.0.1")),
            })
        );
    }

    #[test]
    fn test_bound_device_is_rejected() {
        let ledger = ledger("10.0.0.0/29");
        let mut dev = device(1);
        dev.current_address = Some(ip("10.0.0.1"));

        let err = handle_allocate(&ledger, &dev, t0()).unwrap_err();
        assert_eq!(
            err,
            IpamError::DeviceAlreadyBound {
                device: DeviceId(1),
                address: ip("10.0.0.1"),
            }
        );
    }

    #[test]
    fn test_oldest_released_record_is_reused_first() {
        let mut ledger = ledger("10.0.0.0/29");
        for (id, host, released) in [(1, "10.0.0.1", 30), (2, "10.0.0.2", 10), (3, "10.0.0.3", 20)] {
            ledger.records.push(AddressRecord {
                id: RecordId(id),
                pool_id: PoolId(1),
                address: ip(host),
                assigned_at: Some(t0()),
                released_at: Some(t0() + Duration::minutes(released)),
            });
        }

        let change = handle_allocate(&ledger, &device(9), t0() + Duration::hours(1)).unwrap();
        assert_eq!(
            change.write,
            RecordWrite::Reassign {
                record_id: RecordId(2),
                assigned_at: t0() + Duration::hours(1),
            }
        );
    }

    #[test]
    fn test_mint_skips_addresses_recorded_elsewhere() {
        let mut ledger = ledger("10.0.0.0/29");
        ledger.records.push(AddressRecord {
            id: RecordId(1),
            pool_id: PoolId(1),
            address: ip("10.0.0.1"),
            assigned_at: Some(t0()),
            released_at: None,
        });
        ledger.reserved_elsewhere.insert(ip("10.0.0.2"));

        assert_eq!(next_unused_address(&ledger), Some(ip("10.0.0.3")));
    }

    #[test]
    fn test_exhausted_pool() {
        let mut ledger = ledger("10.0.0.0/30");
        for (n, dev) in [(1, device(1)), (2, device(2))] {
            let change = handle_allocate(&ledger, &dev, t0()).unwrap();
            ledger = apply_change(ledger, &change, RecordId(n));
        }

        let err = handle_allocate(&ledger, &device(3), t0()).unwrap_err();
        assert!(matches!(err, IpamError::PoolExhausted { pool: PoolId(1), .. }));
    }

    #[test]
    fn test_release_lifecycle() {
        let ledger = ledger("10.0.0.0/30");
        let mut holder = device(1);
        let change = handle_allocate(&ledger, &holder, t0()).unwrap();
        let ledger = apply_change(ledger, &change, RecordId(1));
        holder.current_address = Some(ip("10.0.0.1"));
        holder.version = 1;

        let release = handle_release(&ledger, ip("10.0.0.1"), Some(&holder), t0()).unwrap();
        assert_eq!(release.expected_version, 1);
        assert_eq!(
            release.binding,
            Some(BindingWrite {
                device_id: DeviceId(1),
                expected_version: 1,
                address: None,
            })
        );

        let ledger = apply_change(ledger, &release, RecordId(0));
        assert_eq!(
            handle_release(&ledger, ip("10.0.0.1"), None, t0()),
            Err(IpamError::AddressNotHeld(ip("10.0.0.1")))
        );
        assert_eq!(
            handle_release(&ledger, ip("10.0.0.2"), None, t0()),
            Err(IpamError::AddressNotFound(ip("10.0.0.2")))
        );
    }

    #[test]
    fn test_release_ignores_device_not_holding_address() {
        let mut ledger = ledger("10.0.0.0/30");
        ledger.records.push(AddressRecord {
            id: RecordId(1),
            pool_id: PoolId(1),
            address: ip("10.0.0.1"),
            assigned_at: Some(t0()),
            released_at: None,
        });

        let change = handle_release(&ledger, ip("10.0.0.1"), Some(&device(4)), t0()).unwrap();
        assert_eq!(change.binding, None);
    }

    #[test]
    fn test_same_tick_releases_keep_release_order() {
        let mut ledger = ledger("10.0.0.0/29");
        let mut devices = [device(1), device(2)];
        for (n, dev) in devices.iter_mut().enumerate() {
            let change = handle_allocate(&ledger, dev, t0()).unwrap();
            ledger = apply_change(ledger, &change, RecordId(n as u64 + 1));
            dev.current_address = change.binding.and_then(|b| b.address);
            dev.version += 1;
        }

        // Higher address first, both at the same instant
        for dev in devices.iter().rev() {
            let address = dev.current_address.unwrap();
            let change = handle_release(&ledger, address, Some(dev), t0()).unwrap();
            ledger = apply_change(ledger, &change, RecordId(0));
        }

        let released: Vec<_> = ledger.records.iter().map(|r| r.released_at.unwrap()).collect();
        assert_eq!(released[1], t0());
        assert_eq!(released[0], t0() + Duration::microseconds(1));

        let change = handle_allocate(&ledger, &device(3), t0()).unwrap();
        assert_eq!(
            change.write,
            RecordWrite::Reassign {
                record_id: RecordId(2),
                assigned_at: t0(),
            }
        );
    }

    #[test]
    fn test_release_time_never_goes_backwards() {
        let records = vec![AddressRecord {
            id: RecordId(1),
            pool_id: PoolId(1),
            address: ip("10.0.0.1"),
            assigned_at: Some(t0()),
            released_at: Some(t0() + Duration::seconds(5)),
        }];

        assert_eq!(
            release_time(&records, t0()),
            t0() + Duration::seconds(5) + Duration::microseconds(1)
        );
        assert_eq!(
            release_time(&records, t0() + Duration::minutes(1)),
            t0() + Duration::minutes(1)
        );
        assert_eq!(release_time(&[], t0()), t0());
    }
}
