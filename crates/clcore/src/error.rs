use crate::ServiceId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Scheduler failed to launch service '{service_id}': {source}")]
    Scheduling {
        service_id: ServiceId,
        #[source]
        source: SchedulerError,
    },

    #[error("Service '{service_id}' did not become available after {attempts} attempts; last error: {last_error}")]
    AvailabilityTimeout {
        service_id: ServiceId,
        attempts: u32,
        #[source]
        last_error: ApiError,
    },

    #[error("Failed to resolve the identity of service '{service_id}': {source}")]
    IdentityQuery {
        service_id: ServiceId,
        #[source]
        source: ApiError,
    },
}

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Failed to copy '{}' to '{}': {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source path '{}' is not a {expected}", path.display())]
    UnexpectedSourceKind { path: PathBuf, expected: String },

    #[error("Staging task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Failed to pull image: {0}")]
    ImagePull(String),

    #[error("Service '{0}' already exists")]
    AlreadyExists(ServiceId),

    #[error("No free address left in {0}")]
    AddressExhausted(String),

    #[error("Container runtime rejected the request: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}
