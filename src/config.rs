use crate::ip::AddressPools;
use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};

/// Default location of the solver document
pub const DEFAULT_SOLVER_PATH: &str = "output-network-solver.json";
/// Default containerlab topology output
pub const DEFAULT_TOPOLOGY_OUTPUT: &str = "fabric.clab.yml";
/// Default bridge list output
pub const DEFAULT_BRIDGES_OUTPUT: &str = "bridges-generated.nix";
pub const DEFAULT_TOPOLOGY_NAME: &str = "fabric";
pub const DEFAULT_NODE_KIND: &str = "linux";
pub const DEFAULT_NODE_IMAGE: &str = "frrouting/frr:latest";

/// Top-level compiler configuration that mirrors the YAML configuration
///
/// Every section is optional; missing sections take their defaults and the
/// CLI may override individual fields afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Path to the solver document
    pub solver: String,
    pub output: OutputConfig,
    pub topology: TopologyConfig,
    /// Pools for point-to-point allocation; both or neither must be set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pools: Option<PoolConfig>,
}

/// Where the artifacts are written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Containerlab topology YAML
    pub topology: String,
    /// Nix bridge list
    pub bridges: String,
}

/// Settings of the emitted containerlab topology
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TopologyConfig {
    /// Lab name
    pub name: String,
    /// Containerlab node kind applied to every node
    pub kind: String,
    /// Container image applied to every node
    pub image: String,
}

/// Address pools in CIDR notation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

impl CompilerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solver.is_empty() {
            return Err(ConfigError::InvalidPath("solver path cannot be empty".to_string()));
        }
        if self.output.topology.is_empty() || self.output.bridges.is_empty() {
            return Err(ConfigError::InvalidPath("output paths cannot be empty".to_string()));
        }
        if self.output.topology == self.output.bridges {
            return Err(ConfigError::InvalidPath(format!(
                "topology and bridge outputs both point at {}",
                self.output.topology
            )));
        }

        if self.topology.name.is_empty() {
            return Err(ConfigError::InvalidTopology("name cannot be empty".to_string()));
        }
        if self.topology.kind.is_empty() || self.topology.image.is_empty() {
            return Err(ConfigError::InvalidTopology(
                "node kind and image cannot be empty".to_string(),
            ));
        }

        self.pools()?;
        Ok(())
    }

    /// Parsed address pools, or `None` when allocation is disabled
    pub fn pools(&self) -> Result<Option<AddressPools>, ConfigError> {
        let Some(pools) = &self.pools else {
            return Ok(None);
        };

        match (pools.ipv4.as_deref(), pools.ipv6.as_deref()) {
            (None, None) => Ok(None),
            (Some(v4), Some(v6)) => {
                let v4: Ipv4Net = v4
                    .parse()
                    .map_err(|_| ConfigError::InvalidPool(format!("{} is not an IPv4 CIDR", v4)))?;
                let v6: Ipv6Net = v6
                    .parse()
                    .map_err(|_| ConfigError::InvalidPool(format!("{} is not an IPv6 CIDR", v6)))?;
                Ok(Some(AddressPools::new(v4, v6)))
            }
            _ => Err(ConfigError::InvalidPool(
                "ipv4 and ipv6 pools must be given together".to_string(),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid path configuration: {0}")]
    InvalidPath(String),
    #[error("Invalid topology configuration: {0}")]
    InvalidTopology(String),
    #[error("Invalid address pool: {0}")]
    InvalidPool(String),
}

/// Default implementations
impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            solver: DEFAULT_SOLVER_PATH.to_string(),
            output: OutputConfig::default(),
            topology: TopologyConfig::default(),
            pools: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            topology: DEFAULT_TOPOLOGY_OUTPUT.to_string(),
            bridges: DEFAULT_BRIDGES_OUTPUT.to_string(),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOPOLOGY_NAME.to_string(),
            kind: DEFAULT_NODE_KIND.to_string(),
            image: DEFAULT_NODE_IMAGE.to_string(),
        }
    }
}
