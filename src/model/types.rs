//! Typed solver model.
//!
//! These structures are produced by the validator's strict decode step and
//! are the only view of the solver document the rest of the pipeline sees.
//! All maps are ordered so every traversal is in identifier order.

use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// The only solver schema version this compiler understands
pub const SUPPORTED_SCHEMA_VERSION: u64 = 1;

/// Root of a decoded solver document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDocument {
    pub meta: Meta,
    /// enterprise -> site -> site model
    pub sites: BTreeMap<String, BTreeMap<String, Site>>,
}

impl SolverDocument {
    /// Iterate over every (enterprise, site name, site) in identifier order
    pub fn iter_sites(&self) -> impl Iterator<Item = (&str, &str, &Site)> {
        self.sites.iter().flat_map(|(enterprise, sites)| {
            sites
                .iter()
                .map(move |(name, site)| (enterprise.as_str(), name.as_str(), site))
        })
    }

    pub fn site_count(&self) -> usize {
        self.sites.values().map(BTreeMap::len).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub schema_version: u64,
}

/// One enterprise's network at one location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Site {
    pub nodes: BTreeMap<String, Node>,
    pub links: BTreeMap<String, Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<AssumptionsRecord>,
    #[serde(default, rename = "_debug", skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugHints>,
}

impl Site {
    /// Links whose endpoint set contains `node_id`, in identifier order
    pub fn incident_links<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = (&'a str, &'a Link)> + 'a {
        self.links
            .iter()
            .filter(move |(_, link)| link.endpoints.contains_key(node_id))
            .map(|(id, link)| (id.as_str(), link))
    }
}

/// Explicit routing assumptions as written by the solver
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_selector: Option<String>,
}

/// Solver debug output; only the traversal hints are consumed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DebugHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traversal: Option<TraversalHints>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraversalHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_unit_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_unit_hint: Option<String>,
}

/// A routing entity within a site
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub routing_domain: String,
    /// Container labels; the first non-default one suffixes the rendered name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<String>,
    /// link id -> interface on that link
    #[serde(default)]
    pub interfaces: BTreeMap<String, Interface>,
}

impl Node {
    /// Label used to disambiguate the rendered node name, if any
    pub fn container_suffix(&self) -> Option<&str> {
        self.containers
            .first()
            .map(String::as_str)
            .filter(|label| *label != "default")
    }
}

/// A node's attachment to one link
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Interface {
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub addr4: Option<Ipv4Net>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub addr6: Option<Ipv6Net>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub ll6: Option<Ipv6Net>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes4: Vec<Route4>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes6: Vec<Route6>,
}

impl Interface {
    pub fn is_unaddressed(&self) -> bool {
        self.addr4.is_none() && self.addr6.is_none()
    }

    /// True when either address sits on a two-host (/31 or /127) subnet
    pub fn has_two_host_prefix(&self) -> bool {
        self.addr4.map_or(false, |a| a.prefix_len() == 31)
            || self.addr6.map_or(false, |a| a.prefix_len() == 127)
    }
}

/// IPv4 route; no next hop means an on-link route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route4 {
    pub dst: Ipv4Net,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub via4: Option<Ipv4Addr>,
}

/// IPv6 route; no next hop means an on-link route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route6 {
    pub dst: Ipv6Net,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub via6: Option<Ipv6Addr>,
}

/// Link kinds understood by the renderer
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Shared broadcast domain
    #[default]
    Lan,
    /// Strict point-to-point
    P2p,
    /// Single interior endpoint, far side synthesized
    Wan,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKind::Lan => write!(f, "lan"),
            LinkKind::P2p => write!(f, "p2p"),
            LinkKind::Wan => write!(f, "wan"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Link {
    #[serde(default)]
    pub kind: LinkKind,
    /// node id -> endpoint data
    pub endpoints: BTreeMap<String, Endpoint>,
    /// Upstream name, used as the WAN peer suffix when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
}

/// Endpoint data attached to a link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Endpoint {
    /// Bare interface hint with no addressing
    Hint(String),
    Addressed(EndpointAddressing),
}

impl Endpoint {
    pub fn addressing(&self) -> Option<&EndpointAddressing> {
        match self {
            Endpoint::Hint(_) => None,
            Endpoint::Addressed(addressing) => Some(addressing),
        }
    }
}

/// Pre-computed addressing for one link endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EndpointAddressing {
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub addr4: Option<Ipv4Net>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub addr6: Option<Ipv6Net>,
}

/// Resolved identifiers of the distinguished site roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingAssumptions {
    pub core: String,
    pub policy: String,
    pub single_access: String,
    pub upstream_selector: Option<String>,
}

impl RoutingAssumptions {
    /// Role label for `node_id`, if it holds one of the distinguished roles
    pub fn role_of(&self, node_id: &str) -> Option<&'static str> {
        if node_id == self.core {
            Some("core")
        } else if node_id == self.policy {
            Some("policy")
        } else if node_id == self.single_access {
            Some("access")
        } else if self.upstream_selector.as_deref() == Some(node_id) {
            Some("upstream-selector")
        } else {
            None
        }
    }
}

/// Optional textual field where an empty string means absent
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Identifies a site in logs, errors and rendered names
pub fn site_label(enterprise: &str, site: &str) -> String {
    format!("{}-{}", enterprise, site)
}
