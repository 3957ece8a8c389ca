// crates/clcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clcore::{
    ClClientContext, ElClientContext, GenesisArtifacts, KeystoreDirpaths, LaunchEvent,
    LaunchState, ServiceId, SharedPath,
};
use cllauncher::{
    launch_participants, ClClientLauncher, LaunchRequest, LauncherConfig, LocalFileStager,
    ParticipantSpec,
};
use clservices::{BeaconRestClientFactory, DockerScheduler, DockerSchedulerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cl-launch")]
#[command(about = "Launch Teku consensus-layer nodes in Docker", long_about = None)]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a single node
    Launch {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long)]
        service_id: String,

        #[arg(long)]
        keys_dir: PathBuf,

        #[arg(long)]
        secrets_dir: PathBuf,

        /// JSON context printed by an earlier launch; omit to start a new network
        #[arg(long)]
        bootnode: Option<PathBuf>,

        /// Also write the resulting context to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Launch several nodes; the first one is the bootnode of the rest
    Network {
        #[command(flatten)]
        common: CommonArgs,

        /// Validator keystore dirs as KEYS_DIR:SECRETS_DIR, one per node
        #[arg(long = "keystore", required = true)]
        keystores: Vec<String>,

        #[arg(long, default_value = "cl-client")]
        service_prefix: String,
    },

    /// Print the container config a node would get, without launching it
    Render {
        /// Launcher config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        el_ip: String,

        #[arg(long)]
        el_rpc_port: u16,

        /// Address the node would be assigned
        #[arg(long)]
        ip: String,

        /// Shared directory as seen from inside the container
        #[arg(long, default_value = "/shared")]
        shared_dir: PathBuf,

        #[arg(long)]
        bootnode_enr: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Launcher config JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Docker scheduler config JSON file
    #[arg(long)]
    docker_config: Option<PathBuf>,

    #[arg(long)]
    el_ip: String,

    #[arg(long)]
    el_rpc_port: u16,

    #[arg(long)]
    genesis_config: PathBuf,

    #[arg(long)]
    genesis_ssz: PathBuf,

    /// Overrides the fee recipient from the config file
    #[arg(long)]
    fee_recipient: Option<String>,

    /// Give up on the whole command after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl CommonArgs {
    fn launcher_config(&self) -> Result<LauncherConfig> {
        let mut config = load_launcher_config(self.config.as_ref())?;
        if let Some(fee_recipient) = &self.fee_recipient {
            config.fee_recipient = fee_recipient.clone();
            config.validate()?;
        }
        Ok(config)
    }

    fn el_context(&self) -> ElClientContext {
        ElClientContext::new(self.el_ip.clone(), self.el_rpc_port)
    }

    fn build_launcher(&self) -> Result<ClClientLauncher> {
        let config = self.launcher_config()?;

        let docker_config = match &self.docker_config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)?
            }
            None => DockerSchedulerConfig::default(),
        };

        tracing::debug!("Launcher config: {:?}", config);
        tracing::debug!("Docker config: {:?}", docker_config);

        let api_factory = BeaconRestClientFactory::new(Duration::from_secs(5))?;
        let genesis = GenesisArtifacts {
            config_yml_filepath: self.genesis_config.clone(),
            genesis_ssz_filepath: self.genesis_ssz.clone(),
        };

        Ok(ClClientLauncher::new(
            config,
            genesis,
            Arc::new(DockerScheduler::new(docker_config)),
            Arc::new(LocalFileStager),
            Arc::new(api_factory),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Launch {
            common,
            service_id,
            keys_dir,
            secrets_dir,
            bootnode,
            output,
        } => {
            let keystores = KeystoreDirpaths {
                keys_dirpath: keys_dir,
                secrets_dirpath: secrets_dir,
            };
            launch_node(common, service_id, keystores, bootnode, output).await?;
        }

        Commands::Network {
            common,
            keystores,
            service_prefix,
        } => {
            launch_network(common, keystores, service_prefix).await?;
        }

        Commands::Render {
            config,
            el_ip,
            el_rpc_port,
            ip,
            shared_dir,
            bootnode_enr,
        } => {
            let config = load_launcher_config(config.as_ref())?;
            let bootnode = bootnode_enr.map(|enr| ClClientContext::new(enr, "", config.http_port_num));
            let request = LaunchRequest::new(ElClientContext::new(el_ip, el_rpc_port), bootnode);
            // Only the in-container view of the shared dir matters for rendering
            let shared_dir = SharedPath::new(&shared_dir, &shared_dir);
            let container_config = request.finalize(&config, &ip, &shared_dir);
            println!("{}", serde_json::to_string_pretty(&container_config)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_launcher_config(path: Option<&PathBuf>) -> Result<LauncherConfig> {
    match path {
        Some(path) => LauncherConfig::from_file(path)
            .with_context(|| format!("loading launcher config from {}", path.display())),
        None => Ok(LauncherConfig::default()),
    }
}

async fn launch_node(
    common: CommonArgs,
    service_id: String,
    keystores: KeystoreDirpaths,
    bootnode: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let launcher = common.build_launcher()?;
    let bootnode: Option<ClClientContext> = match bootnode {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading bootnode context {}", path.display()))?;
            Some(serde_json::from_str(&raw)?)
        }
        None => None,
    };

    let event_task = spawn_event_printer(&launcher);
    let service_id = ServiceId::new(service_id);
    let el_context = common.el_context();
    let launch = launcher.launch(&service_id, bootnode.as_ref(), &el_context, &keystores);
    let result = with_timeout(common.timeout_secs, launch).await;
    finish_event_printer(launcher, event_task).await;

    let ctx = result??;
    let json = serde_json::to_string_pretty(&ctx)?;
    if let Some(output) = output {
        std::fs::write(&output, &json)?;
    }
    println!("{}", json);

    Ok(())
}

async fn launch_network(
    common: CommonArgs,
    keystores: Vec<String>,
    service_prefix: String,
) -> Result<()> {
    let launcher = common.build_launcher()?;
    let el_context = common.el_context();

    let participants = keystores
        .iter()
        .enumerate()
        .map(|(index, pair)| -> Result<ParticipantSpec> {
            let (keys, secrets) = pair
                .split_once(':')
                .with_context(|| format!("keystore '{}' must be KEYS_DIR:SECRETS_DIR", pair))?;
            Ok(ParticipantSpec {
                service_id: ServiceId::new(format!("{}-{}", service_prefix, index)),
                el_context: el_context.clone(),
                keystores: KeystoreDirpaths {
                    keys_dirpath: PathBuf::from(keys),
                    secrets_dirpath: PathBuf::from(secrets),
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let event_task = spawn_event_printer(&launcher);
    let result = with_timeout(
        common.timeout_secs,
        launch_participants(&launcher, &participants),
    )
    .await;
    finish_event_printer(launcher, event_task).await;

    let contexts = result??;
    println!("{}", serde_json::to_string_pretty(&contexts)?);

    Ok(())
}

async fn with_timeout<F: std::future::Future>(
    timeout_secs: Option<u64>,
    future: F,
) -> Result<F::Output> {
    match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), future)
            .await
            .with_context(|| format!("timed out after {}s", secs)),
        None => Ok(future.await),
    }
}

/// Dropping the launcher closes the event bus, so the printer drains what
/// is still queued and then exits.
async fn finish_event_printer(launcher: ClClientLauncher, event_task: JoinHandle<()>) {
    drop(launcher);
    let _ = event_task.await;
}

fn spawn_event_printer(launcher: &ClClientLauncher) -> JoinHandle<()> {
    let mut events = launcher.subscribe_events();

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                LaunchEvent::StateChanged { service_id, state, .. } => match state {
                    LaunchState::Ready | LaunchState::Failed => {}
                    _ => eprintln!("  ⚡ [{}] {}", service_id, state),
                },
                LaunchEvent::HealthCheckFailed {
                    service_id,
                    attempt,
                    max_attempts,
                    ..
                } => {
                    eprintln!("     ⏳ [{}] not up yet ({}/{})", service_id, attempt, max_attempts);
                }
                LaunchEvent::LaunchFailed {
                    service_id,
                    stage,
                    error,
                    ..
                } => {
                    eprintln!("  ❌ [{}] failed while {}: {}", service_id, stage, error);
                }
                LaunchEvent::NodeReady {
                    service_id,
                    enr,
                    ip_addr,
                    ..
                } => {
                    eprintln!("  ✅ [{}] ready at {} ({})", service_id, ip_addr, enr);
                }
            }
        }
    })
}
