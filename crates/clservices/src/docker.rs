use async_trait::async_trait;
use clcore::{
    ContainerConfig, Scheduler, SchedulerError, ServiceAllocation, ServiceContext, ServiceId,
    SharedPath,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerSchedulerConfig {
    /// User-defined bridge network every service joins
    pub network_name: String,
    pub subnet: String,
    pub first_service_addr: Ipv4Addr,
    pub last_service_addr: Ipv4Addr,
    /// Host directory holding one shared directory per service
    pub shared_root: PathBuf,
    /// Where the shared directory is mounted inside containers
    pub shared_mount_path: String,
    pub auto_pull: bool,
}

impl Default for DockerSchedulerConfig {
    fn default() -> Self {
        Self {
            network_name: "cl-launch".to_string(),
            subnet: "172.28.0.0/16".to_string(),
            first_service_addr: Ipv4Addr::new(172, 28, 0, 10),
            last_service_addr: Ipv4Addr::new(172, 28, 255, 254),
            shared_root: std::env::temp_dir().join("cl-launch"),
            shared_mount_path: "/shared".to_string(),
            auto_pull: true,
        }
    }
}

#[derive(Debug, Default)]
struct AllocationState {
    next_addr_offset: u32,
    service_ids: HashSet<ServiceId>,
}

/// Scheduler backed by the local `docker` CLI.
///
/// Addresses are handed out sequentially from a fixed range so the
/// container config can reference its own IP before the container exists.
pub struct DockerScheduler {
    config: DockerSchedulerConfig,
    state: Mutex<AllocationState>,
    network_ready: Mutex<bool>,
}

impl DockerScheduler {
    pub fn new(config: DockerSchedulerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(AllocationState::default()),
            network_ready: Mutex::new(false),
        }
    }

    async fn ensure_network(&self) -> Result<(), SchedulerError> {
        let mut ready = self.network_ready.lock().await;
        if *ready {
            return Ok(());
        }

        let inspect = Command::new("docker")
            .args(["network", "inspect", self.config.network_name.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !inspect.success() {
            tracing::info!(
                "Creating docker network '{}' ({})",
                self.config.network_name,
                self.config.subnet
            );
            let output = run_docker(&[
                "network".to_string(),
                "create".to_string(),
                "--subnet".to_string(),
                self.config.subnet.clone(),
                self.config.network_name.clone(),
            ])
            .await?;
            if !output.status.success() {
                return Err(SchedulerError::Rejected(format!(
                    "failed to create network '{}': {}",
                    self.config.network_name,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
        }

        *ready = true;
        Ok(())
    }

    async fn pull_image_if_needed(&self, image: &str) -> Result<(), SchedulerError> {
        tracing::debug!("Checking for image: {}", image);

        let check_result = Command::new("docker")
            .args(["image", "inspect", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !check_result.success() {
            tracing::info!("Pulling image: {}", image);

            let pull_result = Command::new("docker")
                .args(["pull", image])
                .stdout(Stdio::null())
                .status()
                .await?;

            if !pull_result.success() {
                return Err(SchedulerError::ImagePull(image.to_string()));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Scheduler for DockerScheduler {
    async fn allocate(&self, service_id: &ServiceId) -> Result<ServiceAllocation, SchedulerError> {
        // Held across the directory creation so nothing is recorded unless it succeeds
        let mut state = self.state.lock().await;
        if state.service_ids.contains(service_id) {
            return Err(SchedulerError::AlreadyExists(service_id.clone()));
        }

        let first = u32::from(self.config.first_service_addr);
        let last = u32::from(self.config.last_service_addr);
        let candidate = first
            .checked_add(state.next_addr_offset)
            .filter(|addr| *addr <= last)
            .ok_or_else(|| SchedulerError::AddressExhausted(self.config.subnet.clone()))?;

        let dir_on_host = self.config.shared_root.join(service_id.as_str());
        tokio::fs::create_dir_all(&dir_on_host).await?;

        state.next_addr_offset += 1;
        state.service_ids.insert(service_id.clone());

        Ok(ServiceAllocation {
            service_id: service_id.clone(),
            private_ip_addr: Ipv4Addr::from(candidate).to_string(),
            shared_dir: SharedPath::new(dir_on_host, &self.config.shared_mount_path),
        })
    }

    async fn start(
        &self,
        allocation: ServiceAllocation,
        config: ContainerConfig,
    ) -> Result<ServiceContext, SchedulerError> {
        self.ensure_network().await?;
        if self.config.auto_pull {
            self.pull_image_if_needed(&config.image).await?;
        }

        let args = docker_run_args(&self.config.network_name, &allocation, &config);
        tracing::info!(
            "Starting container '{}' from {} at {}",
            allocation.service_id,
            config.image,
            allocation.private_ip_addr
        );

        let output = run_docker(&args).await?;
        if !output.status.success() {
            return Err(SchedulerError::Rejected(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        tracing::debug!(
            "Container id for '{}': {}",
            allocation.service_id,
            String::from_utf8_lossy(&output.stdout).trim()
        );

        Ok(ServiceContext {
            service_id: allocation.service_id,
            private_ip_addr: allocation.private_ip_addr,
            private_ports: config.used_ports,
        })
    }
}

/// Arguments for `docker` that start `config` detached on `allocation`
pub fn docker_run_args(
    network_name: &str,
    allocation: &ServiceAllocation,
    config: &ContainerConfig,
) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        allocation.service_id.to_string(),
        "--network".to_string(),
        network_name.to_string(),
        "--ip".to_string(),
        allocation.private_ip_addr.clone(),
        "-v".to_string(),
        format!(
            "{}:{}",
            allocation.shared_dir.path_on_launcher().display(),
            allocation.shared_dir.path_on_service().display()
        ),
    ];

    for port in config.used_ports.values() {
        args.push("--expose".to_string());
        args.push(format!("{}/{}", port.number, port.protocol));
    }

    // docker only takes the program as --entrypoint; its arguments go after the image
    let mut entrypoint = config.entrypoint_override.iter();
    if let Some(program) = entrypoint.next() {
        args.push("--entrypoint".to_string());
        args.push(program.clone());
    }

    args.push(config.image.clone());
    args.extend(entrypoint.cloned());
    args.extend(config.cmd_override.iter().cloned());
    args
}

async fn run_docker(args: &[String]) -> Result<Output, SchedulerError> {
    let output = Command::new("docker")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;
    Ok(output)
}
