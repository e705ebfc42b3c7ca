//! Used subnet registry.
//!
//! Tracks every IPv4 and IPv6 network already claimed in the fabric so the
//! allocator never hands out a subnet that overlaps an existing one. The
//! registry is a plain value: callers pass it into allocation and receive
//! the updated copy back.

use ipnet::{Ipv4Net, Ipv6Net};
use std::collections::BTreeSet;

/// Networks already in use, stored truncated to their containing network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedSubnets {
    v4: BTreeSet<Ipv4Net>,
    v6: BTreeSet<Ipv6Net>,
}

impl UsedSubnets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the network containing `addr` (`10.0.0.1/31` -> `10.0.0.0/31`)
    pub fn record_v4(&mut self, addr: Ipv4Net) -> bool {
        self.v4.insert(addr.trunc())
    }

    pub fn record_v6(&mut self, addr: Ipv6Net) -> bool {
        self.v6.insert(addr.trunc())
    }

    /// True if `net` overlaps any recorded IPv4 network
    pub fn conflicts_v4(&self, net: &Ipv4Net) -> bool {
        self.v4.iter().any(|used| used.contains(net) || net.contains(used))
    }

    /// True if `net` overlaps any recorded IPv6 network
    pub fn conflicts_v6(&self, net: &Ipv6Net) -> bool {
        self.v6.iter().any(|used| used.contains(net) || net.contains(used))
    }

    pub fn v4(&self) -> impl Iterator<Item = &Ipv4Net> {
        self.v4.iter()
    }

    pub fn v6(&self) -> impl Iterator<Item = &Ipv6Net> {
        self.v6.iter()
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_records_containing_network() {
        let mut used = UsedSubnets::new();
        assert!(used.record_v4(v4("10.0.0.1/31")));
        // Same network via the other host address
        assert!(!used.record_v4(v4("10.0.0.0/31")));
        assert_eq!(used.v4().next(), Some(&v4("10.0.0.0/31")));
    }

    #[test]
    fn test_overlap_detection() {
        let mut used = UsedSubnets::new();
        used.record_v4(v4("10.0.1.7/24"));

        assert!(used.conflicts_v4(&v4("10.0.1.4/31")));
        assert!(used.conflicts_v4(&v4("10.0.0.0/16")));
        assert!(!used.conflicts_v4(&v4("10.0.2.0/31")));
    }

    #[test]
    fn test_ipv6_overlap() {
        let mut used = UsedSubnets::new();
        used.record_v6("fd00::1/127".parse().unwrap());
        assert!(used.conflicts_v6(&"fd00::/127".parse().unwrap()));
        assert!(!used.conflicts_v6(&"fd00::2/127".parse().unwrap()));
        assert_eq!(used.len(), 1);
    }
}
