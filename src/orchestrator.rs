//! Compilation orchestrator.
//!
//! This module coordinates the overall compile, managing the flow from the
//! raw solver document through validation, addressing and per-site
//! rendering to the containerlab YAML and bridge list artifacts.

use crate::config::{CompilerConfig, TopologyConfig};
use crate::config_loader::load_solver_document;
use crate::error::CompileError;
use crate::ip::{collect_used_subnets, plan_site_addressing, AddressPools, UsedSubnets};
use crate::model::{resolve_assumptions, validate_document, RoutingAssumptions, Site};
use crate::topology::{
    render_site, BridgeRegistry, ClabDefaults, ClabTopology, ClabTopologyFile, RenderedTopology,
};
use color_eyre::eyre::WrapErr;
use log::{debug, info};
use rayon::prelude::*;
use serde_json::Value;
use std::path::Path;

/// Outcome of a successful compile
#[derive(Debug, Clone)]
pub struct CompiledFabric {
    pub topology: RenderedTopology,
    /// Every subnet in use once planning finished
    pub used: UsedSubnets,
    pub site_count: usize,
}

/// Serialized artifacts, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub topology_yaml: String,
    pub bridges_nix: String,
}

struct PlannedSite {
    enterprise: String,
    name: String,
    site: Site,
    assumptions: RoutingAssumptions,
}

/// Compile a raw solver document into one merged topology
///
/// Planning runs site by site in identifier order, threading the used-subnet
/// set so allocations never overlap across sites. Rendering is independent
/// per site and runs in parallel; results are merged in site order. The
/// first failure aborts the whole compile.
pub fn compile_document(raw: &Value, pools: Option<&AddressPools>) -> Result<CompiledFabric, CompileError> {
    let document = validate_document(raw)?;
    info!("Validated solver document: {} sites", document.site_count());

    let mut resolved = Vec::with_capacity(document.site_count());
    for (enterprise, name, site) in document.iter_sites() {
        let assumptions = resolve_assumptions(enterprise, name, site)?;
        resolved.push((enterprise, name, site, assumptions));
    }

    let mut used = collect_used_subnets(&document);
    let mut planned = Vec::with_capacity(resolved.len());
    for (enterprise, name, site, assumptions) in resolved {
        let (site, next_used) = plan_site_addressing(enterprise, name, site, pools, &used)?;
        used = next_used;
        planned.push(PlannedSite {
            enterprise: enterprise.to_string(),
            name: name.to_string(),
            site,
            assumptions,
        });
    }
    debug!("Addressing planned, {} subnets in use", used.len());

    let rendered: Vec<Result<RenderedTopology, CompileError>> = planned
        .par_iter()
        .map(|p| render_site(&p.enterprise, &p.name, &p.site, &p.assumptions))
        .collect();

    let mut topology = RenderedTopology::default();
    for site in rendered {
        topology.merge(site?)?;
    }

    info!(
        "Compiled fabric: {} nodes, {} links, {} bridges",
        topology.nodes.len(),
        topology.links.len(),
        topology.bridges.len()
    );

    Ok(CompiledFabric {
        topology,
        used,
        site_count: planned.len(),
    })
}

/// Wrap a compiled fabric in the containerlab file layout
pub fn build_clab_file(fabric: &CompiledFabric, settings: &TopologyConfig) -> ClabTopologyFile {
    ClabTopologyFile {
        name: settings.name.clone(),
        topology: ClabTopology {
            defaults: ClabDefaults::new(&settings.kind, &settings.image),
            nodes: fabric.topology.nodes.clone(),
            links: fabric.topology.links.clone(),
        },
    }
}

/// Nix expression listing every bridge, sorted
pub fn render_bridges_nix(bridges: &BridgeRegistry) -> String {
    let mut out = String::from("{ lib, ... }:\n{\n  bridges = [\n");
    for name in bridges.names() {
        out.push_str(&format!("    \"{}\"\n", name));
    }
    out.push_str("  ];\n}\n");
    out
}

/// Serialize both artifacts in memory
pub fn render_artifacts(fabric: &CompiledFabric, settings: &TopologyConfig) -> color_eyre::Result<Artifacts> {
    let topology_yaml = serde_yaml::to_string(&build_clab_file(fabric, settings))
        .wrap_err("Failed to serialize containerlab topology")?;

    Ok(Artifacts {
        topology_yaml,
        bridges_nix: render_bridges_nix(&fabric.topology.bridges),
    })
}

/// Write already serialized artifacts
pub fn write_outputs(artifacts: &Artifacts, topology_path: &Path, bridges_path: &Path) -> color_eyre::Result<()> {
    for path in [topology_path, bridges_path] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }

    std::fs::write(topology_path, &artifacts.topology_yaml)
        .wrap_err_with(|| format!("Failed to write topology to {:?}", topology_path))?;
    std::fs::write(bridges_path, &artifacts.bridges_nix)
        .wrap_err_with(|| format!("Failed to write bridge list to {:?}", bridges_path))?;

    Ok(())
}

/// Run a full compile as described by `config`
///
/// With `dry_run` set everything is compiled and serialized but nothing is
/// written.
pub fn generate_fabric(config: &CompilerConfig, dry_run: bool) -> color_eyre::Result<CompiledFabric> {
    let pools = config.pools()?;
    let raw = load_solver_document(Path::new(&config.solver))?;

    let fabric = compile_document(&raw, pools.as_ref())
        .wrap_err_with(|| format!("Failed to compile {}", config.solver))?;
    let artifacts = render_artifacts(&fabric, &config.topology)?;

    info!("Fabric '{}' from {}", config.topology.name, config.solver);
    info!("  - Sites: {}", fabric.site_count);
    info!("  - Nodes: {}", fabric.topology.nodes.len());
    info!("  - Links: {}", fabric.topology.links.len());
    info!("  - Bridges: {}", fabric.topology.bridges.len());
    if let Some(pools) = &pools {
        info!("  - Pools: {} / {}", pools.v4, pools.v6);
    }

    if dry_run {
        info!("Dry run, no files written");
        return Ok(fabric);
    }

    let topology_path = Path::new(&config.output.topology);
    let bridges_path = Path::new(&config.output.bridges);
    write_outputs(&artifacts, topology_path, bridges_path)?;
    info!("Wrote containerlab topology to {:?}", topology_path);
    info!("Wrote bridge list to {:?}", bridges_path);

    Ok(fabric)
}
