//! Bridge naming.
//!
//! Every rendered link is backed by a host bridge whose name is derived
//! from a seed string: `br` followed by the first ten hex digits of the
//! seed's SHA-256, capped at the kernel's interface name limit. The hash
//! space is truncated, so [`BridgeRegistry`] refuses any name claimed twice.

use crate::error::CompileError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const BRIDGE_TAG: &str = "br";
pub const BRIDGE_HASH_LEN: usize = 10;
/// IFNAMSIZ minus the trailing NUL
pub const MAX_BRIDGE_NAME_LEN: usize = 15;

/// Seed for the bridge backing `link_id` in a site
pub fn bridge_seed(enterprise: &str, site: &str, link_id: &str) -> String {
    format!("{}-{}-{}", enterprise, site, link_id)
}

/// Deterministic bridge name for `seed`
pub fn bridge_name(seed: &str) -> String {
    let digest = hex::encode(Sha256::digest(seed.as_bytes()));
    let mut name = format!("{}{}", BRIDGE_TAG, &digest[..BRIDGE_HASH_LEN]);
    name.truncate(MAX_BRIDGE_NAME_LEN);
    name
}

/// Bridge names handed out so far, each with the seed it came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeRegistry {
    seeds: BTreeMap<String, String>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and reserve the bridge for `seed`
    pub fn claim(&mut self, seed: &str) -> Result<String, CompileError> {
        let name = bridge_name(seed);
        if let Some(first) = self.seeds.get(&name) {
            return Err(CompileError::BridgeCollision {
                bridge: name,
                first: first.clone(),
                second: seed.to_string(),
            });
        }
        self.seeds.insert(name.clone(), seed.to_string());
        Ok(name)
    }

    pub fn merge(&mut self, other: BridgeRegistry) -> Result<(), CompileError> {
        for (name, seed) in other.seeds {
            if let Some(first) = self.seeds.get(&name) {
                return Err(CompileError::BridgeCollision {
                    bridge: name,
                    first: first.clone(),
                    second: seed,
                });
            }
            self.seeds.insert(name, seed);
        }
        Ok(())
    }

    /// Bridge names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.seeds.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seeds.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_name_shape() {
        let name = bridge_name("acme-hq-l1");
        assert!(name.starts_with(BRIDGE_TAG));
        assert_eq!(name.len(), BRIDGE_TAG.len() + BRIDGE_HASH_LEN);
        assert!(name.len() <= MAX_BRIDGE_NAME_LEN);
        assert!(name[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_bridge_name_is_deterministic() {
        assert_eq!(bridge_name("acme-hq-l1"), bridge_name("acme-hq-l1"));
        assert_ne!(bridge_name("acme-hq-l1"), bridge_name("acme-hq-l2"));
    }

    #[test]
    fn test_claiming_twice_is_a_collision() {
        let mut registry = BridgeRegistry::new();
        let name = registry.claim("acme-hq-client").unwrap();
        assert!(registry.contains(&name));

        match registry.claim("acme-hq-client") {
            Err(CompileError::BridgeCollision { bridge, .. }) => assert_eq!(bridge, name),
            other => panic!("expected BridgeCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_detects_cross_site_collision() {
        // "a-b" + "c" and "a" + "b-c" produce the same seed
        let mut left = BridgeRegistry::new();
        left.claim(&bridge_seed("a-b", "c", "l1")).unwrap();
        let mut right = BridgeRegistry::new();
        right.claim(&bridge_seed("a", "b-c", "l1")).unwrap();

        assert!(matches!(left.merge(right), Err(CompileError::BridgeCollision { .. })));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = BridgeRegistry::new();
        for seed in ["x", "y", "z"] {
            registry.claim(seed).unwrap();
        }
        let names: Vec<&str> = registry.names().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(registry.len(), 3);
    }
}
