use crate::{
    ApiError, ContainerConfig, NodeIdentity, SchedulerError, ServiceAllocation, ServiceContext,
    ServiceId, SharedPath, StagingError,
};
use async_trait::async_trait;
use std::path::Path;

/// Container scheduler. Address and shared directory are known only once
/// the scheduler allocates them, so starting a service is split in two.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Reserve an address and a fresh shared directory for a service
    async fn allocate(&self, service_id: &ServiceId) -> Result<ServiceAllocation, SchedulerError>;

    /// Start the container described by `config` on a previous allocation
    async fn start(
        &self,
        allocation: ServiceAllocation,
        config: ContainerConfig,
    ) -> Result<ServiceContext, SchedulerError>;
}

/// Control-plane (beacon REST) API of a single node
#[async_trait]
pub trait BeaconApi: Send + Sync {
    /// Lightweight liveness probe
    async fn health(&self) -> Result<(), ApiError>;

    async fn node_identity(&self) -> Result<NodeIdentity, ApiError>;
}

/// Builds an API client for a node once its address is known
pub trait BeaconApiFactory: Send + Sync {
    fn connect(&self, ip_addr: &str, port_num: u16) -> Box<dyn BeaconApi>;
}

/// Copies launcher-side artifacts into a shared directory
#[async_trait]
pub trait FileStager: Send + Sync {
    async fn copy_file(&self, src: &Path, dest: &SharedPath) -> Result<(), StagingError>;

    /// Copy a whole tree, keeping structure and permission bits
    async fn copy_dir_recursive(&self, src: &Path, dest: &SharedPath) -> Result<(), StagingError>;
}
