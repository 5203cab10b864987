// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Allocation Decisions
//!
//! Random sequences of allocate and release requests are decided with the
//! pure handlers and folded with `apply_change`. After every step:
//!
//! - No address appears twice in the ledger
//! - Every held record is bound to exactly one device, and vice versa
//! - Held plus free never exceeds the CIDR's host capacity
//! - Every issued address is a host address of the CIDR

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use dcim_ipam::aggregate::{apply_change, handle_allocate, handle_release, LedgerChange};
use dcim_ipam::domain::{Device, PoolLedger, RecordId};
use dcim_ipam::IpamError;

use crate::fixtures::{at, device_fixture, empty_ledger};

#[derive(Debug, Clone)]
enum Step {
    Allocate { device: usize },
    /// Release the n-th ledger record (modulo the record count)
    Release { record: usize },
}

fn step_strategy(devices: usize) -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..devices).prop_map(|device| Step::Allocate { device }),
        2 => any::<usize>().prop_map(|record| Step::Release { record }),
    ]
}

fn cidr_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("10.0.0.0/30"),
        Just("10.0.0.0/29"),
        Just("192.168.7.0/28"),
        Just("10.0.0.0/31"),
        Just("fd00::/125"),
    ]
}

struct Model {
    ledger: PoolLedger,
    devices: Vec<Device>,
    next_record: u64,
}

impl Model {
    fn new(cidr: &str, devices: usize) -> Self {
        Self {
            ledger: empty_ledger(cidr),
            devices: (1..=devices as u64).map(device_fixture).collect(),
            next_record: 1,
        }
    }

    fn commit(&mut self, change: &LedgerChange) {
        let minted = RecordId(self.next_record);
        self.next_record += 1;
        self.ledger = apply_change(self.ledger.clone(), change, minted);

        if let Some(binding) = &change.binding {
            let device = self
                .devices
                .iter_mut()
                .find(|d| d.id == binding.device_id)
                .expect("binding names a known device");
            assert_eq!(binding.expected_version, device.version);
            device.current_address = binding.address;
            device.version += 1;
        }
    }

    fn check_invariants(&self) -> Result<(), TestCaseError> {
        let cidr = self.ledger.pool.cidr;

        let mut seen = HashSet::new();
        for record in &self.ledger.records {
            prop_assert!(seen.insert(record.address), "{} issued twice", record.address);
            prop_assert!(cidr.is_host(record.address), "{} is not a host of {}", record.address, cidr);
        }

        let held: HashMap<_, _> = self
            .ledger
            .records
            .iter()
            .filter(|r| r.is_held())
            .map(|r| (r.address, r.id))
            .collect();
        let bound: Vec<_> = self.devices.iter().filter_map(|d| d.current_address).collect();

        prop_assert_eq!(bound.len(), held.len());
        for address in &bound {
            prop_assert!(held.contains_key(address), "{} bound but not held", address);
        }

        let issued = (self.ledger.held_count() + self.ledger.free_count()) as u128;
        prop_assert!(issued <= cidr.capacity());
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_ledger_invariants_hold(
        cidr in cidr_strategy(),
        steps in prop::collection::vec(step_strategy(8), 1..60),
    ) {
        let mut model = Model::new(cidr, 8);

        for (tick, step) in steps.into_iter().enumerate() {
            let now = at(tick as i64);
            match step {
                Step::Allocate { device } => {
                    let device = model.devices[device].clone();
                    match handle_allocate(&model.ledger, &device, now) {
                        Ok(change) => model.commit(&change),
                        Err(IpamError::DeviceAlreadyBound { address, .. }) => {
                            prop_assert_eq!(device.current_address, Some(address));
                        }
                        Err(IpamError::PoolExhausted { .. }) => {
                            prop_assert_eq!(
                                model.ledger.held_count() as u128,
                                model.ledger.pool.cidr.capacity()
                            );
                        }
                        Err(other) => prop_assert!(false, "unexpected error {other}"),
                    }
                }
                Step::Release { record } => {
                    if model.ledger.records.is_empty() {
                        continue;
                    }
                    let record = model.ledger.records[record % model.ledger.records.len()].clone();
                    let holder = model
                        .devices
                        .iter()
                        .find(|d| d.current_address == Some(record.address))
                        .cloned();

                    match handle_release(&model.ledger, record.address, holder.as_ref(), now) {
                        Ok(change) => {
                            prop_assert!(record.is_held());
                            model.commit(&change);
                        }
                        Err(IpamError::AddressNotHeld(_)) => prop_assert!(!record.is_held()),
                        Err(other) => prop_assert!(false, "unexpected error {other}"),
                    }
                }
            }
            model.check_invariants()?;
        }
    }

    /// Freed addresses are always reused before a new one is minted
    #[test]
    fn prop_free_records_are_reused_before_minting(
        releases in prop::collection::vec(0usize..6, 1..6),
    ) {
        let mut model = Model::new("10.0.0.0/28", 8);

        for (tick, device) in model.devices.clone().iter().take(6).enumerate() {
            let change = handle_allocate(&model.ledger, device, at(tick as i64)).unwrap();
            model.commit(&change);
        }

        let mut released = 0;
        for (tick, index) in releases.into_iter().enumerate() {
            let record = model.ledger.records[index].clone();
            if !record.is_held() {
                continue;
            }
            let holder = model
                .devices
                .iter()
                .find(|d| d.current_address == Some(record.address))
                .cloned();
            let change = handle_release(&model.ledger, record.address, holder.as_ref(), at(100 + tick as i64)).unwrap();
            model.commit(&change);
            released += 1;
        }

        let records_before = model.ledger.records.len();
        let newcomer = model.devices[7].clone();
        let change = handle_allocate(&model.ledger, &newcomer, at(1_000)).unwrap();
        model.commit(&change);

        prop_assert_eq!(model.ledger.records.len(), records_before);
        prop_assert!(released > 0);
    }
}
