//! Consensus-layer node launch pipeline
//!
//! Stages genesis and keystore files, builds the Teku container config,
//! hands it to a scheduler, waits for the REST API and resolves the
//! node's ENR.

mod availability;
mod config;
mod identity;
mod launcher;
mod network;
mod request;
mod stager;

pub use availability::wait_for_availability;
pub use config::{
    ConfigFileError, LauncherConfig, HTTP_PORT_ID, TCP_DISCOVERY_PORT_ID, UDP_DISCOVERY_PORT_ID,
};
pub use identity::resolve_identity;
pub use launcher::ClClientLauncher;
pub use network::{launch_participants, ParticipantSpec};
pub use request::LaunchRequest;
pub use stager::{
    stage_artifacts, LocalFileStager, StagedArtifacts, GENESIS_CONFIG_YML_REL_FILEPATH,
    GENESIS_SSZ_REL_FILEPATH, VALIDATOR_KEYS_REL_DIRPATH, VALIDATOR_SECRETS_REL_DIRPATH,
};
