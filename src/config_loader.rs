use crate::config::Config;
use crate::topology::TopologyDocument;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// Load the configuration if a path was given, otherwise use the defaults
pub fn load_config_or_default(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => load_config(path),
        None => {
            info!("No configuration file given, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Load a topology document from JSON
pub fn load_topology(topology_path: &Path) -> Result<TopologyDocument> {
    info!("Loading topology from: {:?}", topology_path);

    let file = File::open(topology_path)
        .wrap_err_with(|| format!("Unable to read topology file '{}'", topology_path.display()))?;

    let document: TopologyDocument = serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("Unable to decode topology '{}'", topology_path.display()))?;

    info!(
        "Loaded {} nodes and {} edges",
        document.nodes.len(),
        document.edges.len()
    );

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
planner:
  unit_cost: 100
  hosts:
    - address: 1.1.1.1
      capacity: 240000
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.planner.unit_cost, 100);
        assert_eq!(config.planner.hosts[0].capacity, 240000);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let yaml = r#"
planner:
  hosts: []
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = load_config_or_default(None).unwrap();
        assert_eq!(config.links.port_base, 5000);
    }

    #[test]
    fn test_load_topology() {
        let json = r#"{"solarSystems": [{"id": 1, "name": "A", "region": "r"}], "jumps": []}"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", json).unwrap();

        let document = load_topology(temp_file.path()).unwrap();
        assert_eq!(document.nodes.len(), 1);
    }

    #[test]
    fn test_malformed_topology() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{{ not json").unwrap();

        assert!(load_topology(temp_file.path()).is_err());
        assert!(load_topology(Path::new("/nonexistent/universe.json")).is_err());
    }
}
