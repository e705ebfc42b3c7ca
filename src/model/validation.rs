//! Solver document validation and strict decoding.
//!
//! The raw document is checked field by field before any typed decoding so
//! failures can name the exact path that is wrong and dump the smallest
//! enclosing sub-document. The first violation ends the run.

use super::types::{site_label, Meta, Site, SolverDocument, SUPPORTED_SCHEMA_VERSION};
use crate::error::CompileError;
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Endpoint fields that must be textual when present
const ENDPOINT_ADDRESS_FIELDS: [&str; 2] = ["addr4", "addr6"];

/// Fields of an explicit assumptions record
const ASSUMPTION_FIELDS: [&str; 4] = ["core", "policy", "singleAccess", "upstreamSelector"];

/// Validate a raw solver document and decode it into the typed model
///
/// Checks run in a fixed order: schema version, the `sites` tree, the
/// `nodes`/`links` sections of every site, then per site link endpoints,
/// node interfaces, endpoint address fields and assumption fields.
pub fn validate_document(raw: &Value) -> Result<SolverDocument, CompileError> {
    let root = raw
        .as_object()
        .ok_or_else(|| CompileError::structural("$", "solver document must be a mapping", raw))?;

    let schema_version = check_schema_version(root, raw)?;

    let sites = root
        .get("sites")
        .ok_or_else(|| CompileError::structural("sites", "missing required field", raw))?;
    let sites = sites
        .as_object()
        .ok_or_else(|| CompileError::structural("sites", "must be a mapping of enterprises", sites))?;
    if sites.is_empty() {
        return Err(CompileError::structural("sites", "must contain at least one enterprise", raw));
    }

    // Every site must have its sections before any site is inspected further
    let mut site_values = Vec::new();
    for (enterprise, enterprise_value) in sorted_entries(sites) {
        let enterprise_sites = enterprise_value.as_object().ok_or_else(|| {
            CompileError::structural(
                format!("sites.{}", enterprise),
                "must be a mapping of sites",
                enterprise_value,
            )
        })?;
        for (site_name, site_value) in sorted_entries(enterprise_sites) {
            check_site_sections(enterprise, site_name, site_value)?;
            site_values.push((enterprise, site_name, site_value));
        }
    }
    if site_values.is_empty() {
        return Err(CompileError::structural("sites", "must contain at least one site", raw));
    }

    let mut decoded: BTreeMap<String, BTreeMap<String, Site>> = BTreeMap::new();
    for (enterprise, site_name, site_value) in site_values {
        let site = validate_site(enterprise, site_name, site_value)?;
        debug!(
            "Validated site {} ({} nodes, {} links)",
            site_label(enterprise, site_name),
            site.nodes.len(),
            site.links.len()
        );
        decoded
            .entry(enterprise.to_string())
            .or_default()
            .insert(site_name.to_string(), site);
    }

    let document = SolverDocument {
        meta: Meta { schema_version },
        sites: decoded,
    };
    info!(
        "Solver document valid: {} enterprise(s), {} site(s)",
        document.sites.len(),
        document.site_count()
    );
    Ok(document)
}

fn check_schema_version(root: &Map<String, Value>, raw: &Value) -> Result<u64, CompileError> {
    let meta = root
        .get("meta")
        .ok_or_else(|| CompileError::structural("meta", "missing required field", raw))?;
    let version = meta
        .get("schemaVersion")
        .ok_or_else(|| CompileError::structural("meta.schemaVersion", "missing required field", meta))?;

    match version.as_u64() {
        Some(v) if v == SUPPORTED_SCHEMA_VERSION => Ok(v),
        _ => Err(CompileError::UnsupportedVersion {
            found: version.to_string(),
            supported: SUPPORTED_SCHEMA_VERSION,
        }),
    }
}

/// The site is a mapping with `nodes` and `links` mappings
fn check_site_sections(enterprise: &str, site_name: &str, value: &Value) -> Result<(), CompileError> {
    let base = format!("sites.{}.{}", enterprise, site_name);
    let site = value
        .as_object()
        .ok_or_else(|| CompileError::structural(base.as_str(), "site must be a mapping", value))?;
    required_mapping(site, "nodes", &base, value)?;
    required_mapping(site, "links", &base, value)?;
    Ok(())
}

fn validate_site(enterprise: &str, site_name: &str, value: &Value) -> Result<Site, CompileError> {
    let base = format!("sites.{}.{}", enterprise, site_name);
    let label = site_label(enterprise, site_name);

    let site = value
        .as_object()
        .ok_or_else(|| CompileError::structural(base.as_str(), "site must be a mapping", value))?;
    let nodes = required_mapping(site, "nodes", &base, value)?;
    let links = required_mapping(site, "links", &base, value)?;

    for (link_id, link) in sorted_entries(links) {
        let path = format!("{}.links.{}.endpoints", base, link_id);
        let endpoints = link
            .get("endpoints")
            .and_then(Value::as_object)
            .ok_or_else(|| CompileError::structural(path.as_str(), "missing endpoint mapping", link))?;
        if endpoints.is_empty() {
            return Err(CompileError::structural(path, "link has no endpoints", link));
        }
        for node_id in endpoints.keys() {
            if !nodes.contains_key(node_id) {
                return Err(CompileError::referential(
                    label.as_str(),
                    format!("link {} references unknown node {}", link_id, node_id),
                ));
            }
        }
    }

    for (node_id, node) in sorted_entries(nodes) {
        let Some(interfaces) = node.get("interfaces") else {
            continue;
        };
        let interfaces = interfaces.as_object().ok_or_else(|| {
            CompileError::structural(
                format!("{}.nodes.{}.interfaces", base, node_id),
                "must be a mapping of link id to interface",
                node,
            )
        })?;
        for link_id in interfaces.keys() {
            if !links.contains_key(link_id) {
                return Err(CompileError::referential(
                    label.as_str(),
                    format!("node {} has an interface on unknown link {}", node_id, link_id),
                ));
            }
        }
    }

    for (link_id, link) in sorted_entries(links) {
        let Some(endpoints) = link.get("endpoints").and_then(Value::as_object) else {
            continue;
        };
        for (node_id, endpoint) in sorted_entries(endpoints) {
            for field in ENDPOINT_ADDRESS_FIELDS {
                match endpoint.get(field) {
                    None | Some(Value::Null) | Some(Value::String(_)) => {}
                    Some(_) => {
                        return Err(CompileError::structural(
                            format!("{}.links.{}.endpoints.{}.{}", base, link_id, node_id, field),
                            "address must be a string",
                            endpoint,
                        ));
                    }
                }
            }
        }
    }

    if let Some(assumptions) = site.get("assumptions").filter(|v| !v.is_null()) {
        check_assumption_fields(&base, assumptions)?;
    }

    serde_json::from_value(value.clone())
        .map_err(|e| CompileError::structural(base, format!("cannot decode site: {}", e), value))
}

/// Role fields, when present, must name a node by string
fn check_assumption_fields(base: &str, assumptions: &Value) -> Result<(), CompileError> {
    let path = format!("{}.assumptions", base);
    let record = assumptions
        .as_object()
        .ok_or_else(|| CompileError::structural(path.as_str(), "must be a mapping", assumptions))?;

    for field in ASSUMPTION_FIELDS {
        match record.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => {
                return Err(CompileError::structural(
                    format!("{}.{}", path, field),
                    "must be a node id string",
                    assumptions,
                ));
            }
        }
    }
    Ok(())
}

fn required_mapping<'a>(
    site: &'a Map<String, Value>,
    field: &str,
    base: &str,
    context: &Value,
) -> Result<&'a Map<String, Value>, CompileError> {
    let path = format!("{}.{}", base, field);
    site.get(field)
        .ok_or_else(|| CompileError::structural(path.as_str(), "missing required field", context))?
        .as_object()
        .ok_or_else(|| CompileError::structural(path.as_str(), "must be a mapping", context))
}

/// Entries in key order, independent of how the map was built
fn sorted_entries(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries: Vec<(&str, &Value)> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}
