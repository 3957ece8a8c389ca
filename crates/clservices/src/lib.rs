//! Concrete collaborators for the launcher
//!
//! A scheduler driving the local Docker daemon and a client for the
//! beacon node REST API.

mod beacon_rest;
mod docker;

pub use beacon_rest::{parse_identity_response, BeaconRestClient, BeaconRestClientFactory};
pub use docker::{docker_run_args, DockerScheduler, DockerSchedulerConfig};
