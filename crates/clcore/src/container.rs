use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier the scheduler knows a service by (e.g. "cl-client-0")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    Tcp,
    Udp,
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortProtocol::Tcp => f.write_str("tcp"),
            PortProtocol::Udp => f.write_str("udp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub number: u16,
    pub protocol: PortProtocol,
}

impl PortSpec {
    pub fn new(number: u16, protocol: PortProtocol) -> Self {
        Self { number, protocol }
    }
}

/// A location inside the directory shared between the launcher and a
/// service container, addressable from both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPath {
    path_on_launcher: PathBuf,
    path_on_service: PathBuf,
}

impl SharedPath {
    pub fn new(path_on_launcher: impl Into<PathBuf>, path_on_service: impl Into<PathBuf>) -> Self {
        Self {
            path_on_launcher: path_on_launcher.into(),
            path_on_service: path_on_service.into(),
        }
    }

    /// Derive a child path; both views get the same relative suffix
    pub fn child(&self, rel_path: impl AsRef<Path>) -> SharedPath {
        let rel_path = rel_path.as_ref();
        SharedPath {
            path_on_launcher: self.path_on_launcher.join(rel_path),
            path_on_service: self.path_on_service.join(rel_path),
        }
    }

    pub fn path_on_launcher(&self) -> &Path {
        &self.path_on_launcher
    }

    pub fn path_on_service(&self) -> &Path {
        &self.path_on_service
    }
}

/// Address and shared directory handed out by the scheduler before the
/// container config can be finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAllocation {
    pub service_id: ServiceId,
    pub private_ip_addr: String,
    pub shared_dir: SharedPath,
}

/// A started service as reported by the scheduler
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub service_id: ServiceId,
    pub private_ip_addr: String,
    pub private_ports: BTreeMap<String, PortSpec>,
}

impl ServiceContext {
    pub fn private_port(&self, port_id: &str) -> Option<&PortSpec> {
        self.private_ports.get(port_id)
    }
}

/// A shell line made of preparatory steps followed by the process that
/// should end up running. Steps are chained with `&&` so the exec step
/// never starts if a preparatory step fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupCommand {
    pub prelaunch_steps: Vec<Vec<String>>,
    pub exec: Vec<String>,
}

impl StartupCommand {
    pub fn new(exec: Vec<String>) -> Self {
        Self {
            prelaunch_steps: Vec::new(),
            exec,
        }
    }

    pub fn with_prelaunch_step(mut self, step: Vec<String>) -> Self {
        self.prelaunch_steps.push(step);
        self
    }

    pub fn to_shell_line(&self) -> String {
        self.prelaunch_steps
            .iter()
            .chain(std::iter::once(&self.exec))
            .map(|argv| argv.join(" "))
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

/// Everything the scheduler needs to start a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub image: String,
    pub used_ports: BTreeMap<String, PortSpec>,
    pub entrypoint_override: Vec<String>,
    pub cmd_override: Vec<String>,
}

pub struct ContainerConfigBuilder {
    image: String,
    used_ports: BTreeMap<String, PortSpec>,
    entrypoint_override: Vec<String>,
    cmd_override: Vec<String>,
}

impl ContainerConfigBuilder {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            used_ports: BTreeMap::new(),
            entrypoint_override: Vec::new(),
            cmd_override: Vec::new(),
        }
    }

    pub fn with_used_ports(mut self, ports: BTreeMap<String, PortSpec>) -> Self {
        self.used_ports = ports;
        self
    }

    pub fn with_entrypoint_override(mut self, entrypoint: Vec<String>) -> Self {
        self.entrypoint_override = entrypoint;
        self
    }

    pub fn with_cmd_override(mut self, cmd: Vec<String>) -> Self {
        self.cmd_override = cmd;
        self
    }

    /// Run the startup command through `sh -c` as a single line
    pub fn with_startup_command(self, startup: &StartupCommand) -> Self {
        self.with_entrypoint_override(vec!["sh".to_string(), "-c".to_string()])
            .with_cmd_override(vec![startup.to_shell_line()])
    }

    pub fn build(self) -> ContainerConfig {
        ContainerConfig {
            image: self.image,
            used_ports: self.used_ports,
            entrypoint_override: self.entrypoint_override,
            cmd_override: self.cmd_override,
        }
    }
}
