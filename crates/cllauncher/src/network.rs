use crate::launcher::ClClientLauncher;
use clcore::{ClClientContext, ElClientContext, KeystoreDirpaths, Result, ServiceId};

/// One node of a participant network
#[derive(Debug, Clone)]
pub struct ParticipantSpec {
    pub service_id: ServiceId,
    pub el_context: ElClientContext,
    pub keystores: KeystoreDirpaths,
}

/// Launch participants in order. The first one starts the network and
/// every later one uses it as bootnode. Stops at the first failure.
pub async fn launch_participants(
    launcher: &ClClientLauncher,
    participants: &[ParticipantSpec],
) -> Result<Vec<ClClientContext>> {
    let mut contexts: Vec<ClClientContext> = Vec::with_capacity(participants.len());

    for participant in participants {
        let bootnode = contexts.first();
        let ctx = launcher
            .launch(
                &participant.service_id,
                bootnode,
                &participant.el_context,
                &participant.keystores,
            )
            .await?;
        contexts.push(ctx);
    }

    tracing::info!("Launched {} participant node(s)", contexts.len());
    Ok(contexts)
}
