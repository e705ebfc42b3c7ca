//! # fabriclab - Containerlab topology compiler for solver fabrics
//!
//! This library turns the output of a network solver into a runnable
//! containerlab lab: one Linux container per routing node, bring-up
//! commands for every interface, and one host bridge per link.
//!
//! ## Overview
//!
//! The solver describes every site of every enterprise as nodes, links and
//! per-interface addressing. The compiler validates that document, fills in
//! missing point-to-point addressing from configured pools, and renders each
//! site into containerlab nodes and bridge-backed links. Upstream providers
//! on WAN links and one validation client per site are synthesized along
//! the way.
//!
//! ## Key Features
//!
//! - **Strict Validation**: Structural and referential checks before any rendering
//! - **Deterministic Output**: Identical input always yields identical artifacts
//! - **P2P Allocation**: Non-overlapping /31 and /127 pairs carved from pools
//! - **WAN Synthesis**: Upstream peers generated for single-ended links
//! - **Validation Client**: A routed host behind each site's access node
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `error`: The compile error taxonomy
//! - `model`: Typed solver entities, validation and routing assumptions
//! - `ip`: Used-subnet tracking, p2p allocation and address planning
//! - `topology`: Interface slots, bridge naming and site rendering
//! - `config`: Type-safe compiler configuration
//! - `config_loader`: Configuration and solver document loading
//! - `orchestrator`: High-level orchestration of the compile
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fabriclab::{config_loader, orchestrator};
//! use std::path::Path;
//!
//! // Load configuration from YAML file
//! let config = config_loader::load_config(Path::new("fabric.yaml"))?;
//!
//! // Compile the solver document and write the artifacts
//! let fabric = orchestrator::generate_fabric(&config, false)?;
//! println!("{} nodes", fabric.topology.nodes.len());
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! Every section is optional:
//!
//! ```yaml
//! solver: output-network-solver.json
//!
//! output:
//!   topology: fabric.clab.yml
//!   bridges: bridges-generated.nix
//!
//! topology:
//!   name: fabric
//!   kind: linux
//!   image: frrouting/frr:latest
//!
//! pools:
//!   ipv4: 10.200.0.0/16
//!   ipv6: fd00:200::/48
//! ```
//!
//! ## Running the Lab
//!
//! ```bash
//! # Create the bridges listed in bridges-generated.nix, then
//! containerlab deploy -t fabric.clab.yml
//! ```
//!
//! ## Error Handling
//!
//! The compile core returns [`error::CompileError`]; configuration problems
//! are [`config::ConfigError`]. Loading, writing and the binary use
//! `color_eyre` for error reporting with context.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod ip;
pub mod model;
pub mod orchestrator;
pub mod topology;

pub use error::CompileError;
pub use orchestrator::{compile_document, CompiledFabric};
