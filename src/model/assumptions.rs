//! Routing assumption resolution.
//!
//! Solvers either emit an explicit `assumptions` record or leave the roles
//! to be inferred from traversal hints and node roles. Both shapes resolve
//! to the same [`RoutingAssumptions`].

use super::types::{site_label, AssumptionsRecord, RoutingAssumptions, Site};
use crate::error::CompileError;
use log::debug;

const POLICY_ROLE: &str = "policy";
const UPSTREAM_SELECTOR_ROLE: &str = "upstream-selector";

/// Resolve the distinguished roles of a site
pub fn resolve_assumptions(
    enterprise: &str,
    site_name: &str,
    site: &Site,
) -> Result<RoutingAssumptions, CompileError> {
    let base = format!("sites.{}.{}", enterprise, site_name);

    let assumptions = match &site.assumptions {
        Some(record) => from_record(&base, record)?,
        None => derive_from_hints(&base, site)?,
    };

    let label = site_label(enterprise, site_name);
    let named = [
        Some(&assumptions.core),
        Some(&assumptions.policy),
        Some(&assumptions.single_access),
        assumptions.upstream_selector.as_ref(),
    ];
    for node_id in named.into_iter().flatten() {
        if !site.nodes.contains_key(node_id) {
            return Err(CompileError::referential(
                label.as_str(),
                format!("routing assumptions name unknown node {}", node_id),
            ));
        }
    }

    debug!(
        "Routing assumptions for {}: core={} policy={} access={} upstream-selector={:?}",
        label, assumptions.core, assumptions.policy, assumptions.single_access, assumptions.upstream_selector
    );
    Ok(assumptions)
}

fn from_record(base: &str, record: &AssumptionsRecord) -> Result<RoutingAssumptions, CompileError> {
    let required = |field: &str, value: &Option<String>| -> Result<String, CompileError> {
        match value.as_deref() {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(CompileError::structural(
                format!("{}.assumptions.{}", base, field),
                "must be a non-empty string",
                record,
            )),
        }
    };

    let core = required("core", &record.core)?;
    let policy = required("policy", &record.policy)?;
    let single_access = required("singleAccess", &record.single_access)?;

    let upstream_selector = match record.upstream_selector.as_deref() {
        None => None,
        Some("") => {
            return Err(CompileError::structural(
                format!("{}.assumptions.upstreamSelector", base),
                "must be non-empty when present",
                record,
            ))
        }
        Some(v) => Some(v.to_string()),
    };

    Ok(RoutingAssumptions {
        core,
        policy,
        single_access,
        upstream_selector,
    })
}

fn derive_from_hints(base: &str, site: &Site) -> Result<RoutingAssumptions, CompileError> {
    let hints = site.debug.as_ref().and_then(|d| d.traversal.as_ref());
    let missing = |role: &str| {
        CompileError::structural(
            format!("{}.assumptions", base),
            format!("no explicit assumptions and {} cannot be derived", role),
            &hints,
        )
    };

    let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    let core = hints
        .and_then(|h| non_empty(&h.core_unit_hint))
        .ok_or_else(|| missing("core (coreUnitHint)"))?;
    let single_access = hints
        .and_then(|h| non_empty(&h.access_unit_hint))
        .ok_or_else(|| missing("access (accessUnitHint)"))?;
    let policy = first_node_with_role(site, POLICY_ROLE).ok_or_else(|| missing("policy"))?;
    let upstream_selector = first_node_with_role(site, UPSTREAM_SELECTOR_ROLE);

    Ok(RoutingAssumptions {
        core,
        policy,
        single_access,
        upstream_selector,
    })
}

fn first_node_with_role(site: &Site, role: &str) -> Option<String> {
    site.nodes
        .iter()
        .find(|(_, node)| node.role == role)
        .map(|(id, _)| id.clone())
}
