// crates/cllauncher/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use clcore::{
    ApiError, BeaconApi, BeaconApiFactory, ContainerConfig, FileStager, GenesisArtifacts,
    KeystoreDirpaths, NodeIdentity, Scheduler, SchedulerError, ServiceAllocation,
    ServiceContext, ServiceId, SharedPath, StagingError,
};
use cllauncher::{ClClientLauncher, LauncherConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub fn test_config() -> LauncherConfig {
    LauncherConfig {
        max_health_check_attempts: 5,
        health_check_interval_ms: 1,
        ..LauncherConfig::default()
    }
}

pub fn genesis() -> GenesisArtifacts {
    GenesisArtifacts {
        config_yml_filepath: PathBuf::from("/module/genesis/config.yml"),
        genesis_ssz_filepath: PathBuf::from("/module/genesis/genesis.ssz"),
    }
}

pub fn keystores(node: usize) -> KeystoreDirpaths {
    KeystoreDirpaths {
        keys_dirpath: PathBuf::from(format!("/module/keystores/node-{}/keys", node)),
        secrets_dirpath: PathBuf::from(format!("/module/keystores/node-{}/secrets", node)),
    }
}

/// Scheduler that hands out 10.0.0.10, 10.0.0.11, ... and records starts
#[derive(Default)]
pub struct FakeScheduler {
    pub missing_port: Option<String>,
    /// Report this port id under a different number than configured
    pub remapped_port: Option<(String, u16)>,
    pub reject_allocate: bool,
    pub reject_start: bool,
    pub allocations: AtomicU32,
    pub started: Mutex<Vec<(ServiceAllocation, ContainerConfig)>>,
}

impl FakeScheduler {
    pub fn started_configs(&self) -> Vec<ContainerConfig> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|(_, config)| config.clone())
            .collect()
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }
}

#[async_trait]
impl Scheduler for FakeScheduler {
    async fn allocate(&self, service_id: &ServiceId) -> Result<ServiceAllocation, SchedulerError> {
        if self.reject_allocate {
            return Err(SchedulerError::AddressExhausted("10.0.0.0/24".to_string()));
        }
        let n = self.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(ServiceAllocation {
            service_id: service_id.clone(),
            private_ip_addr: format!("10.0.0.{}", 10 + n),
            shared_dir: SharedPath::new(
                format!("/launcher/shared/{}", service_id),
                "/shared",
            ),
        })
    }

    async fn start(
        &self,
        allocation: ServiceAllocation,
        config: ContainerConfig,
    ) -> Result<ServiceContext, SchedulerError> {
        if self.reject_start {
            return Err(SchedulerError::ImagePull(config.image.clone()));
        }

        let mut private_ports = config.used_ports.clone();
        if let Some(port_id) = &self.missing_port {
            private_ports.remove(port_id);
        }
        if let Some((port_id, number)) = &self.remapped_port {
            if let Some(port) = private_ports.get_mut(port_id) {
                port.number = *number;
            }
        }
        let ctx = ServiceContext {
            service_id: allocation.service_id.clone(),
            private_ip_addr: allocation.private_ip_addr.clone(),
            private_ports,
        };
        self.started.lock().unwrap().push((allocation, config));
        Ok(ctx)
    }
}

/// Stager that only records what it was asked to copy
#[derive(Default)]
pub struct FakeStager {
    /// Fail any copy whose source path contains this
    pub fail_on: Option<String>,
    pub copies: Mutex<Vec<(PathBuf, SharedPath)>>,
}

impl FakeStager {
    fn record(&self, src: &Path, dest: &SharedPath) -> Result<(), StagingError> {
        if let Some(pattern) = &self.fail_on {
            if src.to_string_lossy().contains(pattern.as_str()) {
                return Err(StagingError::Copy {
                    from: src.to_path_buf(),
                    to: dest.path_on_launcher().to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }
        self.copies
            .lock()
            .unwrap()
            .push((src.to_path_buf(), dest.clone()));
        Ok(())
    }
}

#[async_trait]
impl FileStager for FakeStager {
    async fn copy_file(&self, src: &Path, dest: &SharedPath) -> Result<(), StagingError> {
        self.record(src, dest)
    }

    async fn copy_dir_recursive(&self, src: &Path, dest: &SharedPath) -> Result<(), StagingError> {
        self.record(src, dest)
    }
}

/// Beacon API whose health endpoint fails a fixed number of times.
/// Identity is `enr:<ip>` unless overridden.
#[derive(Default)]
pub struct FakeApiState {
    pub health_failures: u32,
    pub identity_override: Option<Result<NodeIdentity, ApiError>>,
    pub health_calls: AtomicU32,
    pub identity_calls: AtomicU32,
    pub connections: Mutex<Vec<(String, u16)>>,
}

pub struct FakeApi {
    state: Arc<FakeApiState>,
    ip_addr: String,
}

#[async_trait]
impl BeaconApi for FakeApi {
    async fn health(&self) -> Result<(), ApiError> {
        let call = self.state.health_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.state.health_failures {
            Err(ApiError::Request(format!("connection refused ({})", call + 1)))
        } else {
            Ok(())
        }
    }

    async fn node_identity(&self) -> Result<NodeIdentity, ApiError> {
        self.state.identity_calls.fetch_add(1, Ordering::SeqCst);
        match &self.state.identity_override {
            Some(result) => result.clone(),
            None => Ok(identity(&format!("enr:{}", self.ip_addr))),
        }
    }
}

#[derive(Clone)]
pub struct FakeApiFactory {
    pub state: Arc<FakeApiState>,
}

impl FakeApiFactory {
    pub fn new(state: FakeApiState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

impl BeaconApiFactory for FakeApiFactory {
    fn connect(&self, ip_addr: &str, port_num: u16) -> Box<dyn BeaconApi> {
        self.state
            .connections
            .lock()
            .unwrap()
            .push((ip_addr.to_string(), port_num));
        Box::new(FakeApi {
            state: self.state.clone(),
            ip_addr: ip_addr.to_string(),
        })
    }
}

pub fn identity(enr: &str) -> NodeIdentity {
    NodeIdentity {
        enr: enr.to_string(),
        peer_id: "16Uiu2HAm".to_string(),
        p2p_addresses: vec![],
        discovery_addresses: vec![],
        metadata: serde_json::Value::Null,
    }
}

pub struct Harness {
    pub launcher: ClClientLauncher,
    pub scheduler: Arc<FakeScheduler>,
    pub stager: Arc<FakeStager>,
    pub api: FakeApiFactory,
}

pub fn harness(scheduler: FakeScheduler, stager: FakeStager, api: FakeApiState) -> Harness {
    harness_with_config(test_config(), scheduler, stager, api)
}

pub fn harness_with_config(
    config: LauncherConfig,
    scheduler: FakeScheduler,
    stager: FakeStager,
    api: FakeApiState,
) -> Harness {
    let scheduler = Arc::new(scheduler);
    let stager = Arc::new(stager);
    let api = FakeApiFactory::new(api);
    let launcher = ClClientLauncher::new(
        config,
        genesis(),
        scheduler.clone(),
        stager.clone(),
        Arc::new(api.clone()),
    );
    Harness {
        launcher,
        scheduler,
        stager,
        api,
    }
}

/// The single shell line handed to `sh -c`
pub fn shell_line(config: &ContainerConfig) -> &str {
    assert_eq!(config.entrypoint_override, vec!["sh", "-c"]);
    assert_eq!(config.cmd_override.len(), 1);
    &config.cmd_override[0]
}
