// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for CIDR Host Enumeration

use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};

use dcim_ipam::domain::Cidr;

proptest! {
    #[test]
    fn prop_hosts_are_ascending_contained_and_counted(
        octets in any::<[u8; 4]>(),
        prefix in 22u8..=32,
    ) {
        let cidr = Cidr::new(format!("{}/{}", Ipv4Addr::from(octets), prefix)).unwrap();

        let hosts: Vec<IpAddr> = cidr.hosts().collect();
        prop_assert_eq!(hosts.len() as u128, cidr.capacity());
        prop_assert!(hosts.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(hosts.iter().all(|h| cidr.contains(*h) && cidr.is_host(*h)));

        if prefix <= 30 {
            prop_assert!(!hosts.contains(&cidr.network()));
        }
    }

    #[test]
    fn prop_canonical_form_is_stable(
        octets in any::<[u8; 4]>(),
        prefix in 0u8..=32,
    ) {
        let cidr = Cidr::new(format!("{}/{}", Ipv4Addr::from(octets), prefix)).unwrap();
        let again = Cidr::new(cidr.to_string()).unwrap();
        prop_assert_eq!(cidr, again);
        prop_assert_eq!(cidr.prefix(), prefix);
    }
}
