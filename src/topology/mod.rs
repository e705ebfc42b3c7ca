//! Containerlab topology rendering.
//!
//! This module turns planned sites into containerlab nodes, bridge-backed
//! links and the host bridge set, including the synthetic WAN peers and the
//! per-site validation client.

pub mod bridges;
pub mod client;
pub mod commands;
pub mod interfaces;
pub mod render;
pub mod types;

// Re-export key types and functions for easier access
pub use bridges::{bridge_name, bridge_seed, BridgeRegistry};
pub use interfaces::InterfaceIndex;
pub use render::{render_site, scoped_node_name, wan_peer_name, SITE_ROLE_LABEL};
pub use types::{
    ClabDefaults, ClabTopology, ClabTopologyFile, LinkLabels, RenderedLink, RenderedNode,
    RenderedTopology,
};
