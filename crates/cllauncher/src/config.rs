use clcore::{LaunchError, PortProtocol, PortSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const TCP_DISCOVERY_PORT_ID: &str = "tcp-discovery";
pub const UDP_DISCOVERY_PORT_ID: &str = "udp-discovery";
pub const HTTP_PORT_ID: &str = "http";

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] LaunchError),
}

/// Settings shared by every node launch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub image: String,
    pub binary_filepath: String,
    /// The container runs as the "teku" user, so this must be writable by it
    pub data_dirpath: String,
    pub discovery_port_num: u16,
    pub http_port_num: u16,
    /// Where the validator keys end up after the in-container copy
    pub dest_validator_keys_dirpath: String,
    pub dest_validator_secrets_dirpath: String,
    pub fee_recipient: String,
    pub rest_api_docs_enabled: bool,
    /// Teku takes ~35s to bring its HTTP server up
    pub max_health_check_attempts: u32,
    pub health_check_interval_ms: u64,
    pub event_buffer_size: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            image: "consensys/teku:latest".to_string(),
            binary_filepath: "/opt/teku/bin/teku".to_string(),
            data_dirpath: "/opt/teku/consensus-data".to_string(),
            discovery_port_num: 9000,
            http_port_num: 4000,
            dest_validator_keys_dirpath: "$HOME/validator-keys".to_string(),
            dest_validator_secrets_dirpath: "$HOME/validator-secrets".to_string(),
            fee_recipient: "0x0000000000000000000000000000000000000001".to_string(),
            rest_api_docs_enabled: true,
            max_health_check_attempts: 60,
            health_check_interval_ms: 1000,
            event_buffer_size: 1000,
        }
    }
}

impl LauncherConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let raw = std::fs::read_to_string(path)?;
        let config: LauncherConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.max_health_check_attempts == 0 {
            return Err(LaunchError::Configuration(
                "max_health_check_attempts must be at least 1".to_string(),
            ));
        }
        if self.http_port_num == self.discovery_port_num {
            return Err(LaunchError::Configuration(format!(
                "http port {} collides with the discovery port",
                self.http_port_num
            )));
        }
        if !is_eth_address(&self.fee_recipient) {
            return Err(LaunchError::Configuration(format!(
                "fee recipient '{}' is not a 0x-prefixed 20-byte hex address",
                self.fee_recipient
            )));
        }
        Ok(())
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// Ports every node container exposes, keyed by port id
    pub fn used_ports(&self) -> BTreeMap<String, PortSpec> {
        // TODO: expose the metrics port once the node is started with --metrics-enabled
        BTreeMap::from([
            (
                TCP_DISCOVERY_PORT_ID.to_string(),
                PortSpec::new(self.discovery_port_num, PortProtocol::Tcp),
            ),
            (
                UDP_DISCOVERY_PORT_ID.to_string(),
                PortSpec::new(self.discovery_port_num, PortProtocol::Udp),
            ),
            (
                HTTP_PORT_ID.to_string(),
                PortSpec::new(self.http_port_num, PortProtocol::Tcp),
            ),
        ])
    }
}

fn is_eth_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}
