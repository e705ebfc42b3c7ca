//! Validation client synthesis.
//!
//! Each site gets one extra host hanging off the single access node. The
//! client takes the other address on the access node's two-host uplink
//! subnet and routes everything back through the access node, giving the
//! fabric an externally reachable endpoint for validation traffic.

use super::commands;
use super::interfaces::InterfaceIndex;
use crate::model::{Interface, Node};
use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Link id used to seed the client bridge
pub const CLIENT_LINK_ID: &str = "client";
/// The client's only interface
pub const CLIENT_SLOT: u32 = 1;

/// Rendered name of the client attached to `access_name`
pub fn client_name(access_name: &str) -> String {
    format!("{}-client", access_name)
}

/// First interface, in slot order, carrying a /31 or /127 address
pub fn find_uplink<'a>(node: &'a Node, index: &InterfaceIndex) -> Option<&'a Interface> {
    index
        .iter()
        .filter_map(|(_, link_id)| node.interfaces.get(link_id))
        .find(|iface| iface.has_two_host_prefix())
}

/// The other host on a /31, keeping the prefix length
pub fn peer_v4(addr: Ipv4Net) -> Option<Ipv4Net> {
    if addr.prefix_len() != 31 {
        return None;
    }
    let network = u32::from(addr.network());
    let peer = if u32::from(addr.addr()) == network { network + 1 } else { network };
    Some(Ipv4Net::new_assert(Ipv4Addr::from(peer), 31))
}

/// The other host on a /127, keeping the prefix length
pub fn peer_v6(addr: Ipv6Net) -> Option<Ipv6Net> {
    if addr.prefix_len() != 127 {
        return None;
    }
    let network = u128::from(addr.network());
    let peer = if u128::from(addr.addr()) == network { network + 1 } else { network };
    Some(Ipv6Net::new_assert(Ipv6Addr::from(peer), 127))
}

/// Bring-up commands for a client facing `uplink`
///
/// Forwarding is disabled. Each address family whose uplink address sits on
/// a two-host subnet gets the peer address and a default route via the
/// access node's address.
pub fn client_commands(uplink: &Interface) -> Vec<String> {
    let mut exec = commands::forwarding(false);
    exec.push(commands::link_up(CLIENT_SLOT));

    let v4 = uplink.addr4.and_then(|gw| peer_v4(gw).map(|peer| (peer, gw.addr())));
    let v6 = uplink.addr6.and_then(|gw| peer_v6(gw).map(|peer| (peer, gw.addr())));

    if let Some((peer, _)) = v4 {
        exec.push(commands::addr4_replace(&peer, CLIENT_SLOT));
    }
    if let Some((peer, _)) = v6 {
        exec.push(commands::addr6_replace(&peer, CLIENT_SLOT));
    }
    if let Some((_, gw)) = v4 {
        exec.push(commands::default_route4(gw, CLIENT_SLOT));
    }
    if let Some((_, gw)) = v6 {
        exec.push(commands::default_route6(gw, CLIENT_SLOT));
    }
    exec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_addresses() {
        assert_eq!(peer_v4("192.0.2.0/31".parse().unwrap()).unwrap().to_string(), "192.0.2.1/31");
        assert_eq!(peer_v4("192.0.2.1/31".parse().unwrap()).unwrap().to_string(), "192.0.2.0/31");
        assert_eq!(peer_v4("192.0.2.1/24".parse().unwrap()), None);
        assert_eq!(peer_v6("2001:db8::1/127".parse().unwrap()).unwrap().to_string(), "2001:db8::/127");
    }

    #[test]
    fn test_client_commands_from_v4_uplink() {
        let uplink = Interface {
            addr4: Some("192.0.2.0/31".parse().unwrap()),
            ..Interface::default()
        };

        assert_eq!(
            client_commands(&uplink),
            vec![
                "sysctl -w net.ipv4.ip_forward=0",
                "sysctl -w net.ipv6.conf.all.forwarding=0",
                "ip link set eth1 up",
                "ip addr replace 192.0.2.1/31 dev eth1",
                "ip route replace 0.0.0.0/0 via 192.0.2.0 dev eth1",
            ]
        );
    }

    #[test]
    fn test_client_skips_non_two_host_family() {
        let uplink = Interface {
            addr4: Some("10.0.0.5/24".parse().unwrap()),
            addr6: Some("fd00::/127".parse().unwrap()),
            ..Interface::default()
        };
        let exec = client_commands(&uplink);
        assert!(exec.contains(&"ip -6 addr replace fd00::1/127 dev eth1".to_string()));
        assert!(exec.contains(&"ip -6 route replace ::/0 via fd00:: dev eth1".to_string()));
        assert!(!exec.iter().any(|c| c.starts_with("ip addr") || c.starts_with("ip route")));
    }

    #[test]
    fn test_find_uplink_in_slot_order() {
        let mut node = Node::default();
        node.interfaces.insert(
            "a-lan".to_string(),
            Interface {
                addr4: Some("10.0.0.1/24".parse().unwrap()),
                ..Interface::default()
            },
        );
        node.interfaces.insert(
            "b-up".to_string(),
            Interface {
                addr4: Some("192.0.2.0/31".parse().unwrap()),
                ..Interface::default()
            },
        );
        node.interfaces.insert(
            "c-up".to_string(),
            Interface {
                addr6: Some("fd00::/127".parse().unwrap()),
                ..Interface::default()
            },
        );
        let index = InterfaceIndex::from_links(["a-lan", "b-up", "c-up"].map(String::from));

        let uplink = find_uplink(&node, &index).unwrap();
        assert_eq!(uplink.addr4.unwrap().to_string(), "192.0.2.0/31");
    }
}
