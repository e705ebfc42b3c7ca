//! IP address allocation and management module.
//!
//! This module tracks which subnets the fabric already uses, carves new
//! point-to-point subnets out of the configured pools, and plans the final
//! interface addressing of each site.

pub mod addressing;
pub mod allocator;
pub mod registry;

pub use addressing::{collect_used_subnets, plan_site_addressing};
pub use allocator::{allocate_p2p, AddressPools, P2PAllocation};
pub use registry::UsedSubnets;
