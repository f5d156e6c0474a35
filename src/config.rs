use ipnetwork::Ipv6Network;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Nodes with an identifier above this value are placeholders (wormhole
/// systems in the EVE universe dump) and are left out of the network.
pub const DEFAULT_SKIP_ABOVE: u32 = 31_000_000;

/// Memory, in MB, that a single router VM needs on its host.
pub const DEFAULT_UNIT_COST: u64 = 130;

/// First UDP port handed out on every host.
pub const DEFAULT_PORT_BASE: u16 = 5000;

/// Compiler configuration. Every section is optional; the defaults
/// describe a single local host with practically unlimited memory.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub addressing: AddressingConfig,
    pub planner: PlannerConfig,
    pub links: LinkConfig,
    pub launch: LaunchConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if level.parse::<LevelFilter>().is_err() {
                return Err(ValidationError::InvalidGeneral(format!(
                    "unknown log_level '{}'",
                    level
                )));
            }
        }

        self.addressing.validate()?;

        if self.planner.unit_cost == 0 {
            return Err(ValidationError::InvalidPlanner(
                "unit_cost must be greater than zero".to_string(),
            ));
        }
        if self.planner.hosts.is_empty() {
            return Err(ValidationError::InvalidPlanner(
                "at least one host must be configured".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for host in &self.planner.hosts {
            if !seen.insert(host.address) {
                return Err(ValidationError::InvalidPlanner(format!(
                    "host {} is listed more than once",
                    host.address
                )));
            }
        }

        if self.launch.binary.is_empty() {
            return Err(ValidationError::InvalidLaunch(
                "binary cannot be empty".to_string(),
            ));
        }
        if self.launch.memory_mb == 0 {
            return Err(ValidationError::InvalidLaunch(
                "memory_mb must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Shared general configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Seed for MAC addresses and router ids
    pub seed: u64,
}

impl GeneralConfig {
    /// Configured log level, `info` when unset or unparsable
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::Info)
    }
}

/// How node prefixes and ASNs are derived
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AddressingConfig {
    /// Block that every node prefix is carved out of
    pub base_prefix: Ipv6Network,
    /// Length of each node's prefix
    pub prefix_len: u8,
    pub skip_above: u32,
}

impl AddressingConfig {
    /// Number of bits between the base prefix and a node prefix.
    pub fn index_bits(&self) -> u8 {
        self.prefix_len.saturating_sub(self.base_prefix.prefix())
    }

    /// Largest prefix index (and therefore ASN) the base prefix can hold.
    pub fn max_index(&self) -> u32 {
        match self.index_bits() {
            bits if bits >= 32 => u32::MAX,
            bits => (1u32 << bits) - 1,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.prefix_len <= self.base_prefix.prefix() {
            return Err(ValidationError::InvalidAddressing(format!(
                "prefix_len /{} must be longer than base prefix {}",
                self.prefix_len, self.base_prefix
            )));
        }
        // A /127 pair needs at least two host bits below the node prefix.
        if self.prefix_len > 126 {
            return Err(ValidationError::InvalidAddressing(format!(
                "prefix_len /{} leaves no room for link addresses",
                self.prefix_len
            )));
        }
        Ok(())
    }
}

/// Capacity planning inputs
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PlannerConfig {
    /// Resource units one node consumes on its host
    pub unit_cost: u64,
    /// Host pool, scanned in this order by first-fit
    pub hosts: Vec<HostConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HostConfig {
    pub address: IpAddr,
    pub capacity: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LinkConfig {
    pub port_base: u16,
}

/// Constant parts of the QEMU command line
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LaunchConfig {
    pub binary: String,
    pub kernel: String,
    pub disk_image: String,
    pub append: String,
    pub memory_mb: u32,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid addressing configuration: {0}")]
    InvalidAddressing(String),
    #[error("Invalid planner configuration: {0}")]
    InvalidPlanner(String),
    #[error("Invalid launch configuration: {0}")]
    InvalidLaunch(String),
}

/// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            seed: 0,
        }
    }
}

impl Default for AddressingConfig {
    fn default() -> Self {
        Self {
            base_prefix: Ipv6Network::new(Ipv6Addr::new(0x2a07, 0x1500, 0, 0, 0, 0, 0, 0), 32)
                .expect("/32 is a valid IPv6 prefix length"),
            prefix_len: 48,
            skip_above: DEFAULT_SKIP_ABOVE,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            unit_cost: DEFAULT_UNIT_COST,
            hosts: vec![HostConfig {
                address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                capacity: 99_999_999,
            }],
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_base: DEFAULT_PORT_BASE,
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            binary: "qemu-system-i386".to_string(),
            kernel: "bzImage".to_string(),
            disk_image: "rootfs.ext2".to_string(),
            append: "root=/dev/sda rw".to_string(),
            memory_mb: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.addressing.base_prefix.to_string(), "2a07:1500::/32");
        assert_eq!(config.addressing.prefix_len, 48);
        assert_eq!(config.addressing.skip_above, 31_000_000);
        assert_eq!(config.planner.unit_cost, 130);
        assert_eq!(config.planner.hosts.len(), 1);
        assert_eq!(config.links.port_base, 5000);
        assert_eq!(config.launch.binary, "qemu-system-i386");
    }

    #[test]
    fn test_full_config_parsing() {
        let yaml = r#"
general:
  log_level: debug
  seed: 7
addressing:
  base_prefix: "fd00:aa::/32"
  prefix_len: 48
  skip_above: 1000
planner:
  unit_cost: 256
  hosts:
    - address: 10.0.0.1
      capacity: 240000
    - address: 10.0.0.2
      capacity: 240000
links:
  port_base: 7000
launch:
  memory_mb: 128
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.seed, 7);
        assert_eq!(config.addressing.skip_above, 1000);
        assert_eq!(config.planner.hosts[1].address, "10.0.0.2".parse::<IpAddr>().unwrap());
        assert_eq!(config.links.port_base, 7000);
        assert_eq!(config.launch.memory_mb, 128);
        // Unset launch fields keep their defaults
        assert_eq!(config.launch.kernel, "bzImage");
    }

    #[test]
    fn test_level_filter() {
        let mut general = GeneralConfig::default();
        assert_eq!(general.level_filter(), LevelFilter::Info);
        general.log_level = Some("debug".to_string());
        assert_eq!(general.level_filter(), LevelFilter::Debug);
        general.log_level = None;
        assert_eq!(general.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_max_index() {
        let addressing = AddressingConfig::default();
        assert_eq!(addressing.index_bits(), 16);
        assert_eq!(addressing.max_index(), 0xffff);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.planner.hosts.clear();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidPlanner(_))));

        let mut config = Config::default();
        config.planner.unit_cost = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.addressing.prefix_len = 32;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidAddressing(_))));

        let mut config = Config::default();
        config.addressing.prefix_len = 127;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.log_level = Some("chatty".to_string());
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGeneral(_))));

        let mut config = Config::default();
        let host = config.planner.hosts[0].clone();
        config.planner.hosts.push(host);
        assert!(config.validate().is_err());
    }
}
