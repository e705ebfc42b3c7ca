//! Site rendering.
//!
//! Turns one planned site into containerlab nodes and links. Nodes come
//! first, each with its bring-up commands in slot order; links follow in
//! identifier order, dispatched on their kind; the validation client is
//! attached last. Any inconsistency found here is fatal.

use super::bridges::bridge_seed;
use super::client::{self, CLIENT_LINK_ID, CLIENT_SLOT};
use super::commands;
use super::interfaces::InterfaceIndex;
use super::types::{RenderedLink, RenderedNode, RenderedTopology};
use crate::error::CompileError;
use crate::model::{site_label, Link, LinkKind, Node, RoutingAssumptions, Site};
use log::debug;
use std::collections::BTreeMap;

/// Node label carrying a distinguished routing role
pub const SITE_ROLE_LABEL: &str = "fabric.site-role";

/// Render one site
pub fn render_site(
    enterprise: &str,
    site_name: &str,
    site: &Site,
    assumptions: &RoutingAssumptions,
) -> Result<RenderedTopology, CompileError> {
    let renderer = SiteRenderer::new(enterprise, site_name, site, assumptions);
    renderer.render()
}

/// Externally visible name of a site node
pub fn scoped_node_name(enterprise: &str, site_name: &str, node_id: &str, node: &Node) -> String {
    match node.container_suffix() {
        Some(suffix) => format!("{}-{}-{}-{}", enterprise, site_name, node_id, suffix),
        None => format!("{}-{}-{}", enterprise, site_name, node_id),
    }
}

/// Name of the synthetic upstream peer for a WAN link
pub fn wan_peer_name(enterprise: &str, site_name: &str, node_id: &str, link_id: &str, link: &Link) -> String {
    let suffix = link
        .upstream
        .as_deref()
        .filter(|upstream| !upstream.is_empty())
        .unwrap_or_else(|| link_id.rsplit('-').next().unwrap_or(link_id));
    format!("{}-{}-{}-isp-{}", enterprise, site_name, node_id, suffix)
}

struct SiteRenderer<'a> {
    enterprise: &'a str,
    site_name: &'a str,
    label: String,
    site: &'a Site,
    assumptions: &'a RoutingAssumptions,
    indexes: BTreeMap<&'a str, InterfaceIndex>,
    names: BTreeMap<&'a str, String>,
    /// Synthetic WAN peer name -> highest slot used so far
    wan_peers: BTreeMap<String, u32>,
    topology: RenderedTopology,
}

impl<'a> SiteRenderer<'a> {
    fn new(
        enterprise: &'a str,
        site_name: &'a str,
        site: &'a Site,
        assumptions: &'a RoutingAssumptions,
    ) -> Self {
        let indexes = site
            .nodes
            .keys()
            .map(|id| (id.as_str(), InterfaceIndex::for_node(id, site)))
            .collect();
        let names = site
            .nodes
            .iter()
            .map(|(id, node)| (id.as_str(), scoped_node_name(enterprise, site_name, id, node)))
            .collect();

        Self {
            enterprise,
            site_name,
            label: site_label(enterprise, site_name),
            site,
            assumptions,
            indexes,
            names,
            wan_peers: BTreeMap::new(),
            topology: RenderedTopology::default(),
        }
    }

    fn render(mut self) -> Result<RenderedTopology, CompileError> {
        let site = self.site;

        for (node_id, node) in &site.nodes {
            let rendered = self.render_node(node_id, node)?;
            let name = self.node_name(node_id)?.to_string();
            self.topology.insert_node(name, rendered)?;
        }

        for (link_id, link) in &site.links {
            match link.kind {
                LinkKind::Wan => self.render_wan(link_id, link)?,
                LinkKind::Lan | LinkKind::P2p => self.render_pair(link_id, link)?,
            }
        }

        self.attach_validation_client()?;

        debug!(
            "Rendered {}: {} nodes, {} links",
            self.label,
            self.topology.nodes.len(),
            self.topology.links.len()
        );
        Ok(self.topology)
    }

    fn render_node(&self, node_id: &str, node: &Node) -> Result<RenderedNode, CompileError> {
        let index = self.index(node_id)?;

        if let Some(stray) = node.interfaces.keys().find(|link_id| index.slot(link_id).is_none()) {
            return Err(CompileError::referential(
                self.label.as_str(),
                format!("node {} has an interface on link {} but is not one of its endpoints", node_id, stray),
            ));
        }

        let mut exec = commands::forwarding(true);
        for (slot, link_id) in index.iter() {
            let iface = node.interfaces.get(link_id).ok_or_else(|| {
                CompileError::referential(
                    self.label.as_str(),
                    format!("link {} lists node {} but the node has no interface on it", link_id, node_id),
                )
            })?;

            exec.push(commands::link_up(slot));
            if let Some(addr) = &iface.addr4 {
                exec.push(commands::addr4_replace(addr, slot));
            }
            if let Some(addr) = &iface.addr6 {
                exec.push(commands::addr6_replace(addr, slot));
            }
            if let Some(addr) = &iface.ll6 {
                exec.push(commands::addr6_replace(addr, slot));
            }
            exec.extend(iface.routes4.iter().map(|route| commands::route4_replace(route, slot)));
            exec.extend(iface.routes6.iter().map(|route| commands::route6_replace(route, slot)));
        }

        let mut rendered = RenderedNode::new(exec);
        if let Some(role) = self.assumptions.role_of(node_id) {
            rendered.labels.insert(SITE_ROLE_LABEL.to_string(), role.to_string());
        }
        Ok(rendered)
    }

    /// LAN and strict point-to-point links: exactly two interior endpoints
    fn render_pair(&mut self, link_id: &str, link: &Link) -> Result<(), CompileError> {
        if link.endpoints.len() != 2 {
            return Err(CompileError::precondition(
                self.label.as_str(),
                link_id,
                format!("{} link needs exactly 2 endpoints, found {}", link.kind, link.endpoints.len()),
            ));
        }

        let endpoints = link
            .endpoints
            .keys()
            .map(|node_id| -> Result<String, CompileError> {
                Ok(commands::endpoint_ref(self.node_name(node_id)?, self.slot(node_id, link_id)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bridge = self
            .topology
            .bridges
            .claim(&bridge_seed(self.enterprise, self.site_name, link_id))?;
        self.topology
            .links
            .push(RenderedLink::bridged(endpoints, bridge, link.kind == LinkKind::P2p));
        Ok(())
    }

    /// WAN links: one interior endpoint, the upstream side is synthesized
    fn render_wan(&mut self, link_id: &str, link: &Link) -> Result<(), CompileError> {
        let mut endpoints = link.endpoints.keys();
        let (Some(node_id), None) = (endpoints.next(), endpoints.next()) else {
            return Err(CompileError::precondition(
                self.label.as_str(),
                link_id,
                format!("wan link needs exactly 1 endpoint, found {}", link.endpoints.len()),
            ));
        };

        let interior = commands::endpoint_ref(self.node_name(node_id)?, self.slot(node_id, link_id)?);
        let peer_name = wan_peer_name(self.enterprise, self.site_name, node_id, link_id, link);

        let peer_slot = match self.wan_peers.get_mut(&peer_name) {
            Some(last) => {
                *last += 1;
                let slot = *last;
                if let Some(peer) = self.topology.nodes.get_mut(&peer_name) {
                    peer.exec.push(commands::link_up(slot));
                }
                slot
            }
            None => {
                let mut exec = commands::forwarding(true);
                exec.push(commands::link_up(1));
                self.topology.insert_node(peer_name.clone(), RenderedNode::new(exec))?;
                self.wan_peers.insert(peer_name.clone(), 1);
                debug!("Synthesized WAN peer {} for link {}", peer_name, link_id);
                1
            }
        };

        let bridge = self
            .topology
            .bridges
            .claim(&bridge_seed(self.enterprise, self.site_name, link_id))?;
        self.topology.links.push(RenderedLink::bridged(
            vec![interior, commands::endpoint_ref(&peer_name, peer_slot)],
            bridge,
            false,
        ));
        Ok(())
    }

    fn attach_validation_client(&mut self) -> Result<(), CompileError> {
        let site = self.site;
        let access_id = self.assumptions.single_access.as_str();
        let access = site.nodes.get(access_id).ok_or_else(|| {
            CompileError::referential(self.label.as_str(), format!("access node {} does not exist", access_id))
        })?;
        let index = self.index(access_id)?;

        let uplink = client::find_uplink(access, index).ok_or_else(|| {
            CompileError::precondition(
                self.label.as_str(),
                CLIENT_LINK_ID,
                format!("access node {} has no /31 or /127 uplink", access_id),
            )
        })?;
        let access_slot = index.next_free();
        let access_name = self.node_name(access_id)?.to_string();
        let client_name = client::client_name(&access_name);

        self.topology
            .insert_node(client_name.clone(), RenderedNode::new(client::client_commands(uplink)))?;
        if let Some(node) = self.topology.nodes.get_mut(&access_name) {
            node.exec.push(commands::link_up(access_slot));
        }

        let bridge = self
            .topology
            .bridges
            .claim(&bridge_seed(self.enterprise, self.site_name, CLIENT_LINK_ID))?;
        self.topology.links.push(RenderedLink::bridged(
            vec![
                commands::endpoint_ref(&client_name, CLIENT_SLOT),
                commands::endpoint_ref(&access_name, access_slot),
            ],
            bridge,
            false,
        ));
        debug!("Attached validation client {} to {}", client_name, access_name);
        Ok(())
    }

    fn index(&self, node_id: &str) -> Result<&InterfaceIndex, CompileError> {
        self.indexes.get(node_id).ok_or_else(|| {
            CompileError::referential(self.label.as_str(), format!("unknown node {}", node_id))
        })
    }

    fn node_name(&self, node_id: &str) -> Result<&str, CompileError> {
        self.names.get(node_id).map(String::as_str).ok_or_else(|| {
            CompileError::referential(self.label.as_str(), format!("unknown node {}", node_id))
        })
    }

    fn slot(&self, node_id: &str, link_id: &str) -> Result<u32, CompileError> {
        self.index(node_id)?.slot(link_id).ok_or_else(|| {
            CompileError::referential(
                self.label.as_str(),
                format!("node {} has no slot for link {}", node_id, link_id),
            )
        })
    }
}
