//! Site address planning.
//!
//! Before rendering, each site gets its final interface addressing:
//! endpoint addressing carried on links fills interfaces that have none,
//! and, when pools are configured, unaddressed point-to-point links are
//! given fresh /31 + /127 subnets from the allocator.

use super::allocator::{allocate_p2p, AddressPools};
use super::registry::UsedSubnets;
use crate::error::CompileError;
use crate::model::{site_label, Interface, LinkKind, Site, SolverDocument};
use log::{debug, info};

/// Collect every subnet already claimed anywhere in the document
///
/// Interface `addr4`/`addr6` and link endpoint addressing both count.
/// Link-local addresses do not.
pub fn collect_used_subnets(document: &SolverDocument) -> UsedSubnets {
    let mut used = UsedSubnets::new();

    for (_, _, site) in document.iter_sites() {
        for iface in site.nodes.values().flat_map(|node| node.interfaces.values()) {
            if let Some(addr) = iface.addr4 {
                used.record_v4(addr);
            }
            if let Some(addr) = iface.addr6 {
                used.record_v6(addr);
            }
        }

        for addressing in site
            .links
            .values()
            .flat_map(|link| link.endpoints.values())
            .filter_map(|endpoint| endpoint.addressing())
        {
            if let Some(addr) = addressing.addr4 {
                used.record_v4(addr);
            }
            if let Some(addr) = addressing.addr6 {
                used.record_v6(addr);
            }
        }
    }

    info!("Found {} subnet(s) already in use", used.len());
    used
}

/// Produce the fully addressed copy of `site`
///
/// Returns the planned site and `used` extended with any subnets allocated
/// for it, so the next site's planning cannot claim them again.
pub fn plan_site_addressing(
    enterprise: &str,
    site_name: &str,
    site: &Site,
    pools: Option<&AddressPools>,
    used: &UsedSubnets,
) -> Result<(Site, UsedSubnets), CompileError> {
    let label = site_label(enterprise, site_name);
    let mut planned = site.clone();
    apply_endpoint_addressing(&label, &mut planned)?;

    let Some(pools) = pools else {
        return Ok((planned, used.clone()));
    };

    let pending = unaddressed_p2p_links(&planned);
    if pending.is_empty() {
        return Ok((planned, used.clone()));
    }

    let (allocations, used) = allocate_p2p(pools, pending.len(), used)?;
    for ((link_id, a, b), alloc) in pending.iter().zip(&allocations) {
        if let Some(iface) = interface_mut(&mut planned, a, link_id) {
            iface.addr4 = Some(alloc.a4);
            iface.addr6 = Some(alloc.a6);
        }
        if let Some(iface) = interface_mut(&mut planned, b, link_id) {
            iface.addr4 = Some(alloc.b4);
            iface.addr6 = Some(alloc.b6);
        }
        debug!(
            "Allocated {} / {} to link {} ({} <-> {}) in {}",
            alloc.net4, alloc.net6, link_id, a, b, label
        );
    }
    info!("Allocated {} point-to-point subnet pair(s) for {}", allocations.len(), label);

    Ok((planned, used))
}

/// Copy link endpoint addressing into interfaces that carry none
fn apply_endpoint_addressing(label: &str, site: &mut Site) -> Result<(), CompileError> {
    for (link_id, link) in &site.links {
        for (node_id, endpoint) in &link.endpoints {
            let Some(addressing) = endpoint.addressing() else {
                continue;
            };
            if addressing.addr4.is_none() && addressing.addr6.is_none() {
                continue;
            }

            let iface = site
                .nodes
                .get_mut(node_id)
                .and_then(|node| node.interfaces.get_mut(link_id))
                .ok_or_else(|| {
                    CompileError::referential(
                        label,
                        format!(
                            "link {} carries addressing for node {} which has no interface on it",
                            link_id, node_id
                        ),
                    )
                })?;

            if iface.addr4.is_none() {
                iface.addr4 = addressing.addr4;
            }
            if iface.addr6.is_none() {
                iface.addr6 = addressing.addr6;
            }
        }
    }
    Ok(())
}

/// `p2p` links whose two interfaces exist and carry no address at all
fn unaddressed_p2p_links(site: &Site) -> Vec<(String, String, String)> {
    site.links
        .iter()
        .filter(|(_, link)| link.kind == LinkKind::P2p && link.endpoints.len() == 2)
        .filter_map(|(link_id, link)| {
            let mut ids = link.endpoints.keys();
            let a = ids.next()?;
            let b = ids.next()?;
            let unaddressed = |node_id: &str| {
                site.nodes
                    .get(node_id)
                    .and_then(|node| node.interfaces.get(link_id))
                    .map_or(false, Interface::is_unaddressed)
            };
            (unaddressed(a.as_str()) && unaddressed(b.as_str())).then(|| (link_id.clone(), a.clone(), b.clone()))
        })
        .collect()
}

fn interface_mut<'a>(site: &'a mut Site, node_id: &str, link_id: &str) -> Option<&'a mut Interface> {
    site.nodes.get_mut(node_id)?.interfaces.get_mut(link_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::validate_document;
    use serde_json::json;

    fn document() -> SolverDocument {
        validate_document(&json!({
            "meta": {"schemaVersion": 1},
            "sites": {
                "acme": {
                    "hq": {
                        "nodes": {
                            "r1": {"interfaces": {"l1": {}, "l2": {"addr4": "10.0.0.1/31"}, "l3": {}}},
                            "r2": {"interfaces": {"l1": {}, "l2": {"addr4": "10.0.0.0/31"}}},
                            "r3": {"interfaces": {"l3": {}}}
                        },
                        "links": {
                            "l1": {"kind": "p2p", "endpoints": {"r1": "x", "r2": "x"}},
                            "l2": {"kind": "p2p", "endpoints": {"r1": "x", "r2": "x"}},
                            "l3": {"kind": "lan", "endpoints": {
                                "r1": {"addr6": "fd00:1::1/64"},
                                "r3": {"addr4": "10.9.0.2/24", "addr6": "fd00:1::2/64"}
                            }}
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn pools() -> AddressPools {
        AddressPools::new("10.0.0.0/24".parse().unwrap(), "fd00::/64".parse().unwrap())
    }

    #[test]
    fn test_collect_used_subnets() {
        let used = collect_used_subnets(&document());
        let v4: Vec<String> = used.v4().map(|n| n.to_string()).collect();
        assert_eq!(v4, vec!["10.0.0.0/31", "10.9.0.0/24"]);
        assert_eq!(used.v6().count(), 1);
    }

    #[test]
    fn test_endpoint_addressing_fills_interfaces() {
        let doc = document();
        let site = &doc.sites["acme"]["hq"];
        let (planned, _) = plan_site_addressing("acme", "hq", site, None, &UsedSubnets::new()).unwrap();

        let r3 = &planned.nodes["r3"].interfaces["l3"];
        assert_eq!(r3.addr4.unwrap().to_string(), "10.9.0.2/24");
        assert_eq!(r3.addr6.unwrap().to_string(), "fd00:1::2/64");
        // No pools: l1 stays unaddressed
        assert!(planned.nodes["r1"].interfaces["l1"].is_unaddressed());
    }

    #[test]
    fn test_allocator_fills_unaddressed_p2p_links() {
        let doc = document();
        let used = collect_used_subnets(&doc);
        let site = &doc.sites["acme"]["hq"];
        let (planned, used_after) = plan_site_addressing("acme", "hq", site, Some(&pools()), &used).unwrap();

        // 10.0.0.0/31 is already used by l2, so l1 gets the next pair
        let r1 = &planned.nodes["r1"].interfaces["l1"];
        let r2 = &planned.nodes["r2"].interfaces["l1"];
        assert_eq!(r1.addr4.unwrap().to_string(), "10.0.0.2/31");
        assert_eq!(r2.addr4.unwrap().to_string(), "10.0.0.3/31");
        assert_eq!(r1.addr6.unwrap().to_string(), "fd00::2/127");
        assert_eq!(r2.addr6.unwrap().to_string(), "fd00::3/127");

        // Pre-addressed link untouched
        assert_eq!(planned.nodes["r1"].interfaces["l2"].addr4.unwrap().to_string(), "10.0.0.1/31");
        assert_eq!(used_after.len(), used.len() + 2);
    }

    #[test]
    fn test_endpoint_addressing_without_interface() {
        let mut doc = document();
        let site = doc.sites.get_mut("acme").unwrap().get_mut("hq").unwrap();
        site.nodes.get_mut("r3").unwrap().interfaces.clear();

        let result = plan_site_addressing("acme", "hq", site, None, &UsedSubnets::new());
        assert!(matches!(result, Err(CompileError::Referential { .. })));
    }
}
