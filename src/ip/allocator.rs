//! Point-to-point subnet allocation.
//!
//! Carves /31 and /127 subnets out of one IPv4 and one IPv6 pool in
//! ascending order. Both candidate sequences advance in lock-step and a
//! pair is only taken when neither half overlaps a used network. Endpoint
//! roles are fixed: `a` is the network address and `b` the next one.

use super::registry::UsedSubnets;
use crate::error::CompileError;
use ipnet::{Ipv4Net, Ipv6Net};
use log::debug;
use std::net::{Ipv4Addr, Ipv6Addr};

pub const P2P_PREFIX_V4: u8 = 31;
pub const P2P_PREFIX_V6: u8 = 127;

/// IPv4 and IPv6 pools that point-to-point links are carved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPools {
    pub v4: Ipv4Net,
    pub v6: Ipv6Net,
}

impl AddressPools {
    /// Host bits in the given prefixes are dropped
    pub fn new(v4: Ipv4Net, v6: Ipv6Net) -> Self {
        Self {
            v4: v4.trunc(),
            v6: v6.trunc(),
        }
    }
}

/// One allocated link: a /31 and a /127 with both endpoint addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P2PAllocation {
    pub net4: Ipv4Net,
    pub a4: Ipv4Net,
    pub b4: Ipv4Net,
    pub net6: Ipv6Net,
    pub a6: Ipv6Net,
    pub b6: Ipv6Net,
}

impl P2PAllocation {
    fn from_networks(net4: Ipv4Net, net6: Ipv6Net) -> Self {
        let base4 = net4.network();
        let base6 = net6.network();
        Self {
            net4,
            a4: Ipv4Net::new_assert(base4, P2P_PREFIX_V4),
            b4: Ipv4Net::new_assert(Ipv4Addr::from(u32::from(base4) + 1), P2P_PREFIX_V4),
            net6,
            a6: Ipv6Net::new_assert(base6, P2P_PREFIX_V6),
            b6: Ipv6Net::new_assert(Ipv6Addr::from(u128::from(base6) + 1), P2P_PREFIX_V6),
        }
    }
}

/// Allocate `count` point-to-point subnet pairs from `pools`
///
/// Returns the allocations together with `used` extended by every subnet
/// handed out. Fails without returning anything if either pool runs out
/// before `count` pairs are found.
pub fn allocate_p2p(
    pools: &AddressPools,
    count: usize,
    used: &UsedSubnets,
) -> Result<(Vec<P2PAllocation>, UsedSubnets), CompileError> {
    let mut used = used.clone();
    if count == 0 {
        return Ok((Vec::new(), used));
    }

    let exhausted = || CompileError::AllocationExhausted {
        requested: count,
        pool4: pools.v4.to_string(),
        pool6: pools.v6.to_string(),
    };

    let mut candidates4 = pools.v4.subnets(P2P_PREFIX_V4).map_err(|_| exhausted())?;
    let mut candidates6 = pools.v6.subnets(P2P_PREFIX_V6).map_err(|_| exhausted())?;

    let mut allocations = Vec::with_capacity(count);
    while allocations.len() < count {
        let (Some(net4), Some(net6)) = (candidates4.next(), candidates6.next()) else {
            return Err(exhausted());
        };

        if used.conflicts_v4(&net4) || used.conflicts_v6(&net6) {
            debug!("Skipping used candidate pair {} / {}", net4, net6);
            continue;
        }

        used.record_v4(net4);
        used.record_v6(net6);
        allocations.push(P2PAllocation::from_networks(net4, net6));
    }

    Ok((allocations, used))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pools(v4: &str, v6: &str) -> AddressPools {
        AddressPools::new(v4.parse().unwrap(), v6.parse().unwrap())
    }

    #[test]
    fn test_allocates_in_ascending_order() {
        let (allocs, used) = allocate_p2p(&pools("10.0.0.0/24", "fd00::/64"), 4, &UsedSubnets::new()).unwrap();

        let nets: Vec<String> = allocs.iter().map(|a| a.net4.to_string()).collect();
        assert_eq!(nets, vec!["10.0.0.0/31", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/31"]);

        for alloc in &allocs {
            assert_eq!(alloc.a4.addr(), alloc.net4.network());
            assert_eq!(u32::from(alloc.b4.addr()), u32::from(alloc.net4.network()) + 1);
            assert_eq!(alloc.a4.prefix_len(), 31);
        }
        assert_eq!(allocs[0].a6.to_string(), "fd00::/127");
        assert_eq!(allocs[0].b6.to_string(), "fd00::1/127");
        assert_eq!(allocs[1].a6.to_string(), "fd00::2/127");
        assert_eq!(used.len(), 8);
    }

    #[test]
    fn test_exhaustion_allocates_nothing() {
        let result = allocate_p2p(&pools("10.0.0.0/31", "fd00::/64"), 2, &UsedSubnets::new());
        match result {
            Err(CompileError::AllocationExhausted { requested, pool4, .. }) => {
                assert_eq!(requested, 2);
                assert_eq!(pool4, "10.0.0.0/31");
            }
            other => panic!("expected AllocationExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_exhaustion_on_ipv6_side() {
        let result = allocate_p2p(&pools("10.0.0.0/24", "fd00::/127"), 2, &UsedSubnets::new());
        assert!(matches!(result, Err(CompileError::AllocationExhausted { .. })));
    }

    #[test]
    fn test_pool_smaller_than_subnet() {
        let result = allocate_p2p(&pools("10.0.0.1/32", "fd00::/64"), 1, &UsedSubnets::new());
        assert!(matches!(result, Err(CompileError::AllocationExhausted { .. })));
    }

    #[test]
    fn test_skips_used_subnets() {
        let mut used = UsedSubnets::new();
        used.record_v4("10.0.0.1/31".parse().unwrap());
        used.record_v6("fd00::2/127".parse().unwrap());

        let (allocs, _) = allocate_p2p(&pools("10.0.0.0/29", "fd00::/120"), 2, &used).unwrap();

        // Index 0 is blocked on IPv4, index 1 on IPv6
        assert_eq!(allocs[0].net4.to_string(), "10.0.0.4/31");
        assert_eq!(allocs[0].net6.to_string(), "fd00::4/127");
        assert_eq!(allocs[1].net4.to_string(), "10.0.0.6/31");
    }

    #[test]
    fn test_threaded_state_prevents_reuse() {
        let p = pools("10.0.0.0/24", "fd00::/64");
        let (first, used) = allocate_p2p(&p, 2, &UsedSubnets::new()).unwrap();
        let (second, _) = allocate_p2p(&p, 2, &used).unwrap();

        assert_eq!(first[1].net4.to_string(), "10.0.0.2/31");
        assert_eq!(second[0].net4.to_string(), "10.0.0.4/31");
    }

    #[test]
    fn test_zero_count() {
        let (allocs, used) = allocate_p2p(&pools("10.0.0.0/32", "fd00::/128"), 0, &UsedSubnets::new()).unwrap();
        assert!(allocs.is_empty());
        assert!(used.is_empty());
    }

    proptest! {
        #[test]
        fn prop_allocations_never_overlap(count in 1usize..32, used_octets in proptest::collection::vec(0u8..64, 0..16)) {
            let mut used = UsedSubnets::new();
            for octet in &used_octets {
                used.record_v4(Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, *octet), 31));
            }
            let p = pools("10.0.0.0/24", "fd00::/64");

            let (allocs, _) = allocate_p2p(&p, count, &used).unwrap();
            prop_assert_eq!(allocs.len(), count);

            for (i, a) in allocs.iter().enumerate() {
                prop_assert!(!used.conflicts_v4(&a.net4));
                prop_assert!(!used.conflicts_v6(&a.net6));
                for b in allocs.iter().skip(i + 1) {
                    prop_assert!(!a.net4.contains(&b.net4) && !b.net4.contains(&a.net4));
                    prop_assert!(!a.net6.contains(&b.net6) && !b.net6.contains(&a.net6));
                }
            }
        }

        #[test]
        fn prop_allocation_is_deterministic(count in 0usize..16) {
            let p = pools("192.0.2.0/26", "2001:db8::/120");
            let first = allocate_p2p(&p, count, &UsedSubnets::new()).unwrap();
            let second = allocate_p2p(&p, count, &UsedSubnets::new()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
