use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How other services reach a running consensus-layer client.
///
/// Returned from a successful launch and passed as the bootnode of every
/// later launch in the same network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClClientContext {
    enr: String,
    ip_addr: String,
    http_port_num: u16,
}

impl ClClientContext {
    pub fn new(enr: impl Into<String>, ip_addr: impl Into<String>, http_port_num: u16) -> Self {
        Self {
            enr: enr.into(),
            ip_addr: ip_addr.into(),
            http_port_num,
        }
    }

    pub fn enr(&self) -> &str {
        &self.enr
    }

    pub fn ip_addr(&self) -> &str {
        &self.ip_addr
    }

    pub fn http_port_num(&self) -> u16 {
        self.http_port_num
    }
}

/// Connection info of the execution-layer client a node follows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElClientContext {
    ip_addr: String,
    rpc_port_num: u16,
}

impl ElClientContext {
    pub fn new(ip_addr: impl Into<String>, rpc_port_num: u16) -> Self {
        Self {
            ip_addr: ip_addr.into(),
            rpc_port_num,
        }
    }

    pub fn ip_addr(&self) -> &str {
        &self.ip_addr
    }

    pub fn rpc_port_num(&self) -> u16 {
        self.rpc_port_num
    }

    pub fn rpc_url(&self) -> String {
        format!("http://{}:{}", self.ip_addr, self.rpc_port_num)
    }
}

/// Validator keystores generated for one node, on the launcher's filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreDirpaths {
    pub keys_dirpath: PathBuf,
    pub secrets_dirpath: PathBuf,
}

/// Genesis outputs on the launcher's filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisArtifacts {
    pub config_yml_filepath: PathBuf,
    pub genesis_ssz_filepath: PathBuf,
}

/// `data` object of the beacon node identity endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub enr: String,
    #[serde(default)]
    pub peer_id: String,
    #[serde(default)]
    pub p2p_addresses: Vec<String>,
    #[serde(default)]
    pub discovery_addresses: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}
