use crate::ServiceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type LaunchId = Uuid;

/// Stages a single node launch moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchState {
    Staging,
    Configuring,
    Scheduling,
    WaitingForAvailability,
    ResolvingIdentity,
    Ready,
    Failed,
}

impl LaunchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LaunchState::Ready | LaunchState::Failed)
    }
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchState::Staging => "staging",
            LaunchState::Configuring => "configuring",
            LaunchState::Scheduling => "scheduling",
            LaunchState::WaitingForAvailability => "waiting-for-availability",
            LaunchState::ResolvingIdentity => "resolving-identity",
            LaunchState::Ready => "ready",
            LaunchState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Events emitted while launching nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LaunchEvent {
    StateChanged {
        launch_id: LaunchId,
        service_id: ServiceId,
        state: LaunchState,
        timestamp: DateTime<Utc>,
    },
    HealthCheckFailed {
        launch_id: LaunchId,
        service_id: ServiceId,
        attempt: u32,
        max_attempts: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },
    LaunchFailed {
        launch_id: LaunchId,
        service_id: ServiceId,
        stage: LaunchState,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeReady {
        launch_id: LaunchId,
        service_id: ServiceId,
        enr: String,
        ip_addr: String,
        timestamp: DateTime<Utc>,
    },
}

/// Event emitter scoped to one launch
#[derive(Clone)]
pub struct EventEmitter {
    launch_id: LaunchId,
    service_id: ServiceId,
    sender: broadcast::Sender<LaunchEvent>,
}

impl EventEmitter {
    pub fn new(
        launch_id: LaunchId,
        service_id: ServiceId,
        sender: broadcast::Sender<LaunchEvent>,
    ) -> Self {
        Self {
            launch_id,
            service_id,
            sender,
        }
    }

    pub fn launch_id(&self) -> LaunchId {
        self.launch_id
    }

    pub fn state(&self, state: LaunchState) {
        let _ = self.sender.send(LaunchEvent::StateChanged {
            launch_id: self.launch_id,
            service_id: self.service_id.clone(),
            state,
            timestamp: Utc::now(),
        });
    }

    pub fn health_check_failed(&self, attempt: u32, max_attempts: u32, error: impl Into<String>) {
        let _ = self.sender.send(LaunchEvent::HealthCheckFailed {
            launch_id: self.launch_id,
            service_id: self.service_id.clone(),
            attempt,
            max_attempts,
            error: error.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn failed(&self, stage: LaunchState, error: impl Into<String>) {
        let _ = self.sender.send(LaunchEvent::LaunchFailed {
            launch_id: self.launch_id,
            service_id: self.service_id.clone(),
            stage,
            error: error.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn ready(&self, enr: impl Into<String>, ip_addr: impl Into<String>) {
        let _ = self.sender.send(LaunchEvent::NodeReady {
            launch_id: self.launch_id,
            service_id: self.service_id.clone(),
            enr: enr.into(),
            ip_addr: ip_addr.into(),
            timestamp: Utc::now(),
        });
    }
}

/// Global event bus
pub struct EventBus {
    sender: broadcast::Sender<LaunchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.sender.subscribe()
    }

    pub fn create_emitter(&self, launch_id: LaunchId, service_id: ServiceId) -> EventEmitter {
        EventEmitter::new(launch_id, service_id, self.sender.clone())
    }
}
