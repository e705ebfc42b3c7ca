//! Interface slot assignment.
//!
//! A node's `ethN` slots are its incident links in identifier order,
//! numbered from 1. The slot of a link is therefore a pure function of the
//! node's incident link set and the link id.

use crate::model::Site;

/// Ordered incident links of one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceIndex {
    links: Vec<String>,
}

impl InterfaceIndex {
    pub fn for_node(node_id: &str, site: &Site) -> Self {
        Self::from_links(site.incident_links(node_id).map(|(id, _)| id.to_string()))
    }

    pub fn from_links(links: impl IntoIterator<Item = String>) -> Self {
        let mut links: Vec<String> = links.into_iter().collect();
        links.sort();
        links.dedup();
        Self { links }
    }

    /// 1-based slot of `link_id`, if the node is one of its endpoints
    pub fn slot(&self, link_id: &str) -> Option<u32> {
        self.links
            .binary_search_by(|probe| probe.as_str().cmp(link_id))
            .ok()
            .map(|i| i as u32 + 1)
    }

    /// `(slot, link id)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, link)| (i as u32 + 1, link.as_str()))
    }

    /// First slot not taken by a fabric link
    pub fn next_free(&self) -> u32 {
        self.links.len() as u32 + 1
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_lexicographic_slots() {
        let index = InterfaceIndex::from_links(["wan-2", "a-lan", "p2p-1"].map(String::from));
        assert_eq!(index.slot("a-lan"), Some(1));
        assert_eq!(index.slot("p2p-1"), Some(2));
        assert_eq!(index.slot("wan-2"), Some(3));
        assert_eq!(index.slot("missing"), None);
        assert_eq!(index.next_free(), 4);
    }

    #[test]
    fn test_for_node_uses_incident_links_only() {
        let site: Site = serde_json::from_value(serde_json::json!({
            "nodes": {"r1": {}, "r2": {}, "r3": {}},
            "links": {
                "l2": {"endpoints": {"r1": "x", "r2": "x"}},
                "l1": {"endpoints": {"r2": "x", "r3": "x"}},
                "l3": {"endpoints": {"r1": "x", "r3": "x"}}
            }
        }))
        .unwrap();

        let index = InterfaceIndex::for_node("r1", &site);
        let pairs: Vec<(u32, &str)> = index.iter().collect();
        assert_eq!(pairs, vec![(1, "l2"), (2, "l3")]);
        assert!(InterfaceIndex::for_node("nobody", &site).is_empty());
    }

    proptest! {
        #[test]
        fn prop_slots_are_a_bijection(links in proptest::collection::btree_set("[a-z0-9-]{1,8}", 0..24)) {
            let index = InterfaceIndex::from_links(links.iter().cloned());
            let slots: BTreeSet<u32> = links.iter().filter_map(|l| index.slot(l)).collect();
            let expected: BTreeSet<u32> = (1..=links.len() as u32).collect();
            prop_assert_eq!(slots, expected);
            prop_assert_eq!(index.len(), links.len());
        }

        #[test]
        fn prop_slot_independent_of_input_order(mut links in proptest::collection::vec("[a-z]{1,6}", 1..16)) {
            let forward = InterfaceIndex::from_links(links.clone());
            links.reverse();
            let backward = InterfaceIndex::from_links(links);
            prop_assert_eq!(forward, backward);
        }
    }
}
