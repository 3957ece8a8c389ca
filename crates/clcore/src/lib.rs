//! Core abstractions for the consensus-layer launcher
//!
//! This crate provides the types, errors and collaborator traits that the
//! launch pipeline and the concrete adapters share. It has no runtime
//! dependencies beyond the event channel.

mod container;
mod context;
mod error;
pub mod events;
mod service;

pub use container::{
    ContainerConfig, ContainerConfigBuilder, PortProtocol, PortSpec, ServiceAllocation,
    ServiceContext, ServiceId, SharedPath, StartupCommand,
};
pub use context::{ClClientContext, ElClientContext, GenesisArtifacts, KeystoreDirpaths, NodeIdentity};
pub use error::{ApiError, LaunchError, SchedulerError, StagingError};
pub use events::*;
pub use service::{BeaconApi, BeaconApiFactory, FileStager, Scheduler};

/// Result type for launch operations
pub type Result<T> = std::result::Result<T, LaunchError>;
