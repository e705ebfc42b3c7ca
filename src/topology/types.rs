//! Rendered topology types.
//!
//! The renderer produces a [`RenderedTopology`] per site; the orchestrator
//! merges them and wraps the result in a [`ClabTopologyFile`] for
//! serialization to containerlab YAML.

use super::bridges::BridgeRegistry;
use crate::error::CompileError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Link type label value for every rendered link
pub const LINK_TYPE_BRIDGE: &str = "bridge";
/// Mode label value marking strict point-to-point links
pub const LINK_MODE_P2P: &str = "p2p";

/// Result of rendering one or more sites
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedTopology {
    /// Rendered node name -> node
    pub nodes: BTreeMap<String, RenderedNode>,
    pub links: Vec<RenderedLink>,
    pub bridges: BridgeRegistry,
}

impl RenderedTopology {
    /// Add a node, refusing to overwrite one that already exists
    pub fn insert_node(&mut self, name: String, node: RenderedNode) -> Result<(), CompileError> {
        if self.nodes.contains_key(&name) {
            return Err(CompileError::DuplicateNode { name });
        }
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Union with another site's topology
    pub fn merge(&mut self, other: RenderedTopology) -> Result<(), CompileError> {
        for (name, node) in other.nodes {
            self.insert_node(name, node)?;
        }
        self.links.extend(other.links);
        self.bridges.merge(other.bridges)
    }
}

/// A containerlab node: its bring-up commands and optional labels
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedNode {
    pub exec: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl RenderedNode {
    pub fn new(exec: Vec<String>) -> Self {
        Self {
            exec,
            labels: BTreeMap::new(),
        }
    }
}

/// A containerlab link between two `node:ethN` endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedLink {
    pub endpoints: Vec<String>,
    pub labels: LinkLabels,
}

impl RenderedLink {
    /// Bridge-backed link; `p2p` adds the point-to-point mode label
    pub fn bridged(endpoints: Vec<String>, bridge: String, p2p: bool) -> Self {
        Self {
            endpoints,
            labels: LinkLabels {
                link_type: LINK_TYPE_BRIDGE.to_string(),
                bridge,
                mode: p2p.then(|| LINK_MODE_P2P.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkLabels {
    #[serde(rename = "clab.link.type")]
    pub link_type: String,
    #[serde(rename = "clab.link.bridge")]
    pub bridge: String,
    #[serde(rename = "clab.link.mode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

// ============================================================================
// Containerlab file types
// ============================================================================

/// Root of the emitted containerlab topology file
#[derive(Serialize, Debug)]
pub struct ClabTopologyFile {
    pub name: String,
    pub topology: ClabTopology,
}

#[derive(Serialize, Debug)]
pub struct ClabTopology {
    pub defaults: ClabDefaults,
    pub nodes: BTreeMap<String, RenderedNode>,
    pub links: Vec<RenderedLink>,
}

/// Settings shared by every node
#[derive(Serialize, Debug)]
pub struct ClabDefaults {
    pub kind: String,
    pub image: String,
    #[serde(rename = "network-mode")]
    pub network_mode: String,
    pub sysctls: BTreeMap<String, String>,
}

impl ClabDefaults {
    pub fn new(kind: &str, image: &str) -> Self {
        let sysctls = [
            ("net.ipv4.ip_forward", "1"),
            ("net.ipv6.conf.all.forwarding", "1"),
            ("net.ipv4.conf.default.rp_filter", "0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            kind: kind.to_string(),
            image: image.to_string(),
            network_mode: "none".to_string(),
            sysctls,
        }
    }
}
