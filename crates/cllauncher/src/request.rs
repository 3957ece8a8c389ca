use crate::config::LauncherConfig;
use crate::stager::StagedArtifacts;
use clcore::{
    ClClientContext, ContainerConfig, ContainerConfigBuilder, ElClientContext, SharedPath,
    StartupCommand,
};

/// Inputs for one node launch that are known before the scheduler has
/// handed out an address and a shared directory.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    el_context: ElClientContext,
    /// None means the node starts a new network
    bootnode: Option<ClClientContext>,
}

impl LaunchRequest {
    pub fn new(el_context: ElClientContext, bootnode: Option<ClClientContext>) -> Self {
        Self {
            el_context,
            bootnode,
        }
    }

    pub fn bootnode(&self) -> Option<&ClClientContext> {
        self.bootnode.as_ref()
    }

    /// Build the container config. Artifacts must already be staged under
    /// `shared_dir`; only in-container paths end up in the command.
    pub fn finalize(
        &self,
        config: &LauncherConfig,
        private_ip_addr: &str,
        shared_dir: &SharedPath,
    ) -> ContainerConfig {
        let staged = StagedArtifacts::under(shared_dir);
        let startup = self.startup_command(config, private_ip_addr, &staged);

        ContainerConfigBuilder::new(config.image.clone())
            .with_used_ports(config.used_ports())
            .with_startup_command(&startup)
            .build()
    }

    /// The node runs as an unprivileged user but the shared directory was
    /// written by root, and Teku needs to write a lockfile next to the
    /// secrets. So the keystores get copied again into the user's home
    /// before the binary starts.
    pub fn startup_command(
        &self,
        config: &LauncherConfig,
        private_ip_addr: &str,
        staged: &StagedArtifacts,
    ) -> StartupCommand {
        let el_rpc_url = self.el_context.rpc_url();

        let mut exec = vec![
            config.binary_filepath.clone(),
            format!("--network={}", service_path(&staged.genesis_config_yml)),
            format!("--initial-state={}", service_path(&staged.genesis_ssz)),
            format!("--data-path={}", config.data_dirpath),
            "--data-storage-mode=PRUNE".to_string(),
            "--p2p-enabled=true".to_string(),
            format!("--eth1-endpoints={}", el_rpc_url),
            format!("--ee-endpoint={}", el_rpc_url),
            format!("--p2p-advertised-ip={}", private_ip_addr),
            "--rest-api-enabled=true".to_string(),
        ];
        if config.rest_api_docs_enabled {
            exec.push("--rest-api-docs-enabled=true".to_string());
        }
        exec.extend([
            "--rest-api-interface=0.0.0.0".to_string(),
            format!("--rest-api-port={}", config.http_port_num),
            "--rest-api-host-allowlist=*".to_string(),
            "--data-storage-non-canonical-blocks-enabled=true".to_string(),
            "--log-destination=CONSOLE".to_string(),
            format!(
                "--validator-keys={}:{}",
                config.dest_validator_keys_dirpath, config.dest_validator_secrets_dirpath
            ),
            format!("--fee-recipient={}", config.fee_recipient),
        ]);
        if let Some(bootnode) = self.bootnode() {
            exec.push(format!("--p2p-discovery-bootnodes={}", bootnode.enr()));
        }

        StartupCommand::new(exec)
            .with_prelaunch_step(copy_step(
                &staged.validator_keys,
                &config.dest_validator_keys_dirpath,
            ))
            .with_prelaunch_step(copy_step(
                &staged.validator_secrets,
                &config.dest_validator_secrets_dirpath,
            ))
    }
}

fn copy_step(src: &SharedPath, dest: &str) -> Vec<String> {
    vec![
        "cp".to_string(),
        "-R".to_string(),
        service_path(src),
        dest.to_string(),
    ]
}

fn service_path(path: &SharedPath) -> String {
    path.path_on_service().display().to_string()
}
