use crate::availability::wait_for_availability;
use crate::config::{LauncherConfig, HTTP_PORT_ID};
use crate::identity::resolve_identity;
use crate::request::LaunchRequest;
use crate::stager::stage_artifacts;
use clcore::{
    BeaconApiFactory, ClClientContext, ElClientContext, EventBus, EventEmitter, FileStager,
    GenesisArtifacts, KeystoreDirpaths, LaunchError, LaunchEvent, LaunchId, LaunchState, Result,
    Scheduler, ServiceId,
};
use std::sync::Arc;

/// Launches Teku consensus-layer nodes through a scheduler
pub struct ClClientLauncher {
    config: LauncherConfig,
    genesis: GenesisArtifacts,
    scheduler: Arc<dyn Scheduler>,
    stager: Arc<dyn FileStager>,
    api_factory: Arc<dyn BeaconApiFactory>,
    event_bus: Arc<EventBus>,
}

impl ClClientLauncher {
    pub fn new(
        config: LauncherConfig,
        genesis: GenesisArtifacts,
        scheduler: Arc<dyn Scheduler>,
        stager: Arc<dyn FileStager>,
        api_factory: Arc<dyn BeaconApiFactory>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        Self {
            config,
            genesis,
            scheduler,
            stager,
            api_factory,
            event_bus,
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Subscribe to launch events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<LaunchEvent> {
        self.event_bus.subscribe()
    }

    /// Get the event bus for direct access
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Launch one node and wait until peers can use it.
    ///
    /// Without a `bootnode` the node starts its own network. Any failure
    /// aborts the launch; services already created are left for the caller
    /// to tear down.
    pub async fn launch(
        &self,
        service_id: &ServiceId,
        bootnode: Option<&ClClientContext>,
        el_context: &ElClientContext,
        keystores: &KeystoreDirpaths,
    ) -> Result<ClClientContext> {
        let launch_id = LaunchId::new_v4();
        let events = self.event_bus.create_emitter(launch_id, service_id.clone());
        let request = LaunchRequest::new(el_context.clone(), bootnode.cloned());

        tracing::info!(
            "Launching Teku node '{}' (launch {}, bootnode: {})",
            service_id,
            launch_id,
            request.bootnode().map(|b| b.ip_addr()).unwrap_or("none")
        );
        tracing::debug!(
            "Node '{}' follows EL client {}:{}",
            service_id,
            el_context.ip_addr(),
            el_context.rpc_port_num()
        );

        let mut stage = LaunchState::Staging;
        let result = self
            .run(service_id, &request, keystores, &events, &mut stage)
            .await;

        match &result {
            Ok(ctx) => {
                events.state(LaunchState::Ready);
                events.ready(ctx.enr(), ctx.ip_addr());
                tracing::info!("Teku node '{}' is ready at {}", service_id, ctx.ip_addr());
            }
            Err(e) => {
                events.state(LaunchState::Failed);
                events.failed(stage, e.to_string());
                tracing::error!("Launching Teku node '{}' failed while {}: {}", service_id, stage, e);
            }
        }

        result
    }

    async fn run(
        &self,
        service_id: &ServiceId,
        request: &LaunchRequest,
        keystores: &KeystoreDirpaths,
        events: &EventEmitter,
        stage: &mut LaunchState,
    ) -> Result<ClClientContext> {
        enter(stage, events, LaunchState::Staging);
        let allocation = self
            .scheduler
            .allocate(service_id)
            .await
            .map_err(|source| LaunchError::Scheduling {
                service_id: service_id.clone(),
                source,
            })?;
        stage_artifacts(
            self.stager.as_ref(),
            &allocation.shared_dir,
            &self.genesis,
            keystores,
        )
        .await?;

        enter(stage, events, LaunchState::Configuring);
        let container_config =
            request.finalize(&self.config, &allocation.private_ip_addr, &allocation.shared_dir);
        tracing::debug!("Container command for '{}': {:?}", service_id, container_config.cmd_override);

        enter(stage, events, LaunchState::Scheduling);
        let service_ctx = self
            .scheduler
            .start(allocation, container_config)
            .await
            .map_err(|source| LaunchError::Scheduling {
                service_id: service_id.clone(),
                source,
            })?;
        let http_port = service_ctx.private_port(HTTP_PORT_ID).ok_or_else(|| {
            LaunchError::Configuration(format!(
                "Expected service '{}' to have a port with ID '{}', but none was found",
                service_id, HTTP_PORT_ID
            ))
        })?;
        if http_port.number != self.config.http_port_num {
            return Err(LaunchError::Configuration(format!(
                "Service '{}' exposes port '{}' as {} but the node listens on {}",
                service_id, HTTP_PORT_ID, http_port.number, self.config.http_port_num
            )));
        }

        enter(stage, events, LaunchState::WaitingForAvailability);
        let api = self
            .api_factory
            .connect(&service_ctx.private_ip_addr, http_port.number);
        wait_for_availability(
            service_id,
            api.as_ref(),
            self.config.max_health_check_attempts,
            self.config.health_check_interval(),
            events,
        )
        .await?;

        enter(stage, events, LaunchState::ResolvingIdentity);
        resolve_identity(
            service_id,
            api.as_ref(),
            &service_ctx.private_ip_addr,
            self.config.http_port_num,
        )
        .await
    }
}

fn enter(stage: &mut LaunchState, events: &EventEmitter, next: LaunchState) {
    *stage = next;
    tracing::debug!("Launch {} entering {}", events.launch_id(), next);
    events.state(next);
}
