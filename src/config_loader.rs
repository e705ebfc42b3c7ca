use crate::config::CompilerConfig;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde_json::Value;
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<CompilerConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(config_path)
        .wrap_err_with(|| format!("Failed to read configuration {:?}", config_path))?;

    // An empty file is an all-default config
    let config: CompilerConfig = if content.trim().is_empty() {
        CompilerConfig::default()
    } else {
        serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse configuration {:?}", config_path))?
    };

    config.validate()?;

    Ok(config)
}

/// Read the solver document as an untyped value
///
/// `.json` files are decoded as JSON, anything else as YAML. Structure is
/// not checked here; that is the validator's job.
pub fn load_solver_document(path: &Path) -> Result<Value> {
    info!("Reading solver document from: {:?}", path);

    let file = File::open(path).wrap_err_with(|| format!("Failed to open solver document {:?}", path))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let value = if is_json {
        serde_json::from_reader(file).wrap_err_with(|| format!("Failed to parse JSON solver document {:?}", path))?
    } else {
        serde_yaml::from_reader(file).wrap_err_with(|| format!("Failed to parse YAML solver document {:?}", path))?
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
solver: "solver.json"
output:
  topology: "lab.clab.yml"
topology:
  name: "lab"
  image: "frrouting/frr:v9.1.0"
pools:
  ipv4: "10.0.0.0/16"
  ipv6: "fd00::/48"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.solver, "solver.json");
        assert_eq!(config.output.topology, "lab.clab.yml");
        assert_eq!(config.output.bridges, "bridges-generated.nix");
        assert_eq!(config.topology.kind, "linux");
        assert!(config.pools().unwrap().is_some());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config, CompilerConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "pools:\n  ipv4: \"10.0.0.0/16\"\n").unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_json_solver_document() {
        let mut temp_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(temp_file, r#"{{"meta": {{"schemaVersion": 1}}, "sites": {{}}}}"#).unwrap();

        let value = load_solver_document(temp_file.path()).unwrap();
        assert_eq!(value["meta"]["schemaVersion"], 1);
    }

    #[test]
    fn test_load_yaml_solver_document() {
        let mut temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(temp_file, "meta:\n  schemaVersion: 1\nsites:\n  acme: {{}}\n").unwrap();

        let value = load_solver_document(temp_file.path()).unwrap();
        assert_eq!(value["meta"]["schemaVersion"], 1);
        assert!(value["sites"]["acme"].is_object());
    }

    #[test]
    fn test_missing_solver_document() {
        assert!(load_solver_document(Path::new("/nonexistent/solver.json")).is_err());
    }
}
