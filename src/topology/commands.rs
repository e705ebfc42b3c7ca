//! Bring-up command vocabulary.
//!
//! Every node command is one shell string from a small fixed set:
//! forwarding sysctls, link up, address replace and route replace.

use crate::model::{Route4, Route6};
use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};

const FORWARDING_V4: &str = "net.ipv4.ip_forward";
const FORWARDING_V6: &str = "net.ipv6.conf.all.forwarding";

/// Forwarding toggles that open every routing node's command list
pub fn forwarding(enabled: bool) -> Vec<String> {
    let value = u8::from(enabled);
    vec![
        format!("sysctl -w {}={}", FORWARDING_V4, value),
        format!("sysctl -w {}={}", FORWARDING_V6, value),
    ]
}

pub fn device(slot: u32) -> String {
    format!("eth{}", slot)
}

/// `node:ethN` reference used in link endpoints
pub fn endpoint_ref(node_name: &str, slot: u32) -> String {
    format!("{}:{}", node_name, device(slot))
}

pub fn link_up(slot: u32) -> String {
    format!("ip link set {} up", device(slot))
}

pub fn addr4_replace(addr: &Ipv4Net, slot: u32) -> String {
    format!("ip addr replace {} dev {}", addr, device(slot))
}

pub fn addr6_replace(addr: &Ipv6Net, slot: u32) -> String {
    format!("ip -6 addr replace {} dev {}", addr, device(slot))
}

pub fn route4_replace(route: &Route4, slot: u32) -> String {
    match route.via4 {
        Some(via) => format!("ip route replace {} via {} dev {}", route.dst, via, device(slot)),
        None => format!("ip route replace {} dev {}", route.dst, device(slot)),
    }
}

pub fn route6_replace(route: &Route6, slot: u32) -> String {
    match route.via6 {
        Some(via) => format!("ip -6 route replace {} via {} dev {}", route.dst, via, device(slot)),
        None => format!("ip -6 route replace {} dev {}", route.dst, device(slot)),
    }
}

pub fn default_route4(via: Ipv4Addr, slot: u32) -> String {
    format!("ip route replace 0.0.0.0/0 via {} dev {}", via, device(slot))
}

pub fn default_route6(via: Ipv6Addr, slot: u32) -> String {
    format!("ip -6 route replace ::/0 via {} dev {}", via, device(slot))
}
