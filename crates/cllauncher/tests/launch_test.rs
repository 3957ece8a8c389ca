// crates/cllauncher/tests/launch_test.rs

mod common;

use clcore::{
    ApiError, ClClientContext, ElClientContext, LaunchError, LaunchEvent, LaunchState,
    SchedulerError, ServiceId, StagingError,
};
use cllauncher::{launch_participants, ParticipantSpec, HTTP_PORT_ID};
use common::*;
use std::sync::atomic::Ordering;

fn el_context() -> ElClientContext {
    ElClientContext::new("10.0.0.5", 8551)
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_first_node_starts_its_own_network() {
    let h = harness(FakeScheduler::default(), FakeStager::default(), FakeApiState::default());

    let ctx = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await
        .expect("launch should succeed");

    assert_eq!(ctx.http_port_num(), 4000);
    assert_eq!(ctx.ip_addr(), "10.0.0.10");
    assert_eq!(ctx.enr(), "enr:10.0.0.10");

    let configs = h.scheduler.started_configs();
    assert_eq!(configs.len(), 1);
    let line = shell_line(&configs[0]);
    assert!(line.contains("--eth1-endpoints=http://10.0.0.5:8551"));
    assert!(!line.contains("--p2p-discovery-bootnodes"));
}

#[tokio::test]
async fn test_bootnode_enr_is_passed_to_new_node() {
    let h = harness(FakeScheduler::default(), FakeStager::default(), FakeApiState::default());
    let bootnode = ClClientContext::new("enr:ABC", "10.0.0.9", 4000);

    h.launcher
        .launch(
            &ServiceId::from("cl-client-1"),
            Some(&bootnode),
            &el_context(),
            &keystores(1),
        )
        .await
        .expect("launch should succeed");

    let configs = h.scheduler.started_configs();
    let line = shell_line(&configs[0]);
    assert!(line.contains("--p2p-discovery-bootnodes=enr:ABC"));
}

#[tokio::test]
async fn test_missing_http_port_fails_before_polling() {
    let scheduler = FakeScheduler {
        missing_port: Some(HTTP_PORT_ID.to_string()),
        ..FakeScheduler::default()
    };
    let h = harness(scheduler, FakeStager::default(), FakeApiState::default());

    let result = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    assert!(
        matches!(result, Err(LaunchError::Configuration(_))),
        "expected configuration error, got {:?}",
        result
    );
    assert_eq!(h.api.state.health_calls.load(Ordering::SeqCst), 0);
    assert!(h.api.state.connections.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_http_port_mismatch_fails_before_polling() {
    let scheduler = FakeScheduler {
        remapped_port: Some((HTTP_PORT_ID.to_string(), 5052)),
        ..FakeScheduler::default()
    };
    let h = harness(scheduler, FakeStager::default(), FakeApiState::default());

    let result = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    match result {
        Err(LaunchError::Configuration(message)) => {
            assert!(message.contains("5052"), "unexpected message: {}", message);
        }
        other => panic!("expected configuration error, got {:?}", other),
    }
    assert_eq!(h.scheduler.start_count(), 1);
    assert_eq!(h.api.state.health_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.api.state.identity_calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Stage failures
// ============================================================================

#[tokio::test]
async fn test_staging_failure_aborts_before_scheduling() {
    let stager = FakeStager {
        fail_on: Some("secrets".to_string()),
        ..FakeStager::default()
    };
    let h = harness(FakeScheduler::default(), stager, FakeApiState::default());

    let result = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    assert!(matches!(
        result,
        Err(LaunchError::Staging(StagingError::Copy { .. }))
    ));
    assert_eq!(h.scheduler.start_count(), 0);
    // Genesis files and keys went through before the secrets copy failed
    assert_eq!(h.stager.copies.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_scheduler_rejection_is_wrapped() {
    let scheduler = FakeScheduler {
        reject_start: true,
        ..FakeScheduler::default()
    };
    let h = harness(scheduler, FakeStager::default(), FakeApiState::default());

    let result = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    match result {
        Err(LaunchError::Scheduling { service_id, source }) => {
            assert_eq!(service_id.as_str(), "cl-client-0");
            assert!(matches!(source, SchedulerError::ImagePull(_)));
        }
        other => panic!("expected scheduling error, got {:?}", other),
    }
    assert_eq!(h.api.state.health_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_allocation_failure_stops_before_staging() {
    let scheduler = FakeScheduler {
        reject_allocate: true,
        ..FakeScheduler::default()
    };
    let h = harness(scheduler, FakeStager::default(), FakeApiState::default());
    let mut events = h.launcher.subscribe_events();

    let result = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    match result {
        Err(LaunchError::Scheduling { service_id, source }) => {
            assert_eq!(service_id.as_str(), "cl-client-0");
            assert!(matches!(source, SchedulerError::AddressExhausted(_)));
        }
        other => panic!("expected scheduling error, got {:?}", other),
    }
    assert!(h.stager.copies.lock().unwrap().is_empty());
    assert_eq!(h.scheduler.start_count(), 0);

    let mut failed_stage = None;
    while let Ok(event) = events.try_recv() {
        if let LaunchEvent::LaunchFailed { stage, .. } = event {
            failed_stage = Some(stage);
        }
    }
    assert_eq!(failed_stage, Some(LaunchState::Staging));
}

#[tokio::test]
async fn test_node_that_never_comes_up_times_out() {
    let api = FakeApiState {
        health_failures: u32::MAX,
        ..FakeApiState::default()
    };
    let h = harness(FakeScheduler::default(), FakeStager::default(), api);

    let result = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    match result {
        Err(LaunchError::AvailabilityTimeout {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 5);
            assert!(last_error.to_string().contains("(5)"));
        }
        other => panic!("expected availability timeout, got {:?}", other),
    }
    assert_eq!(h.api.state.health_calls.load(Ordering::SeqCst), 5);
    assert_eq!(h.api.state.identity_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_node_is_waited_for() {
    let api = FakeApiState {
        health_failures: 3,
        ..FakeApiState::default()
    };
    let h = harness(FakeScheduler::default(), FakeStager::default(), api);

    let ctx = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await
        .expect("node answers on the fourth attempt");

    assert_eq!(ctx.enr(), "enr:10.0.0.10");
    assert_eq!(h.api.state.health_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_malformed_identity_fails_launch() {
    let api = FakeApiState {
        identity_override: Some(Err(ApiError::Malformed("missing field `enr`".to_string()))),
        ..FakeApiState::default()
    };
    let h = harness(FakeScheduler::default(), FakeStager::default(), api);

    let result = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    assert!(matches!(
        result,
        Err(LaunchError::IdentityQuery {
            source: ApiError::Malformed(_),
            ..
        })
    ));
    assert_eq!(h.api.state.identity_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_api_client_targets_exposed_http_port() {
    let h = harness(FakeScheduler::default(), FakeStager::default(), FakeApiState::default());

    h.launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await
        .unwrap();

    let connections = h.api.state.connections.lock().unwrap().clone();
    assert_eq!(connections, vec![("10.0.0.10".to_string(), 4000)]);
}

#[tokio::test]
async fn test_staging_copies_into_shared_dir() {
    let h = harness(FakeScheduler::default(), FakeStager::default(), FakeApiState::default());

    h.launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await
        .unwrap();

    let copies = h.stager.copies.lock().unwrap().clone();
    let dests: Vec<String> = copies
        .iter()
        .map(|(_, dest)| dest.path_on_launcher().display().to_string())
        .collect();
    assert_eq!(
        dests,
        vec![
            "/launcher/shared/cl-client-0/genesis-config.yml",
            "/launcher/shared/cl-client-0/genesis.ssz",
            "/launcher/shared/cl-client-0/validator-keys",
            "/launcher/shared/cl-client-0/validator-secrets",
        ]
    );
    assert_eq!(copies[2].0, keystores(0).keys_dirpath);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_events_follow_launch_states() {
    let h = harness(FakeScheduler::default(), FakeStager::default(), FakeApiState::default());
    let mut events = h.launcher.subscribe_events();

    h.launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await
        .unwrap();

    let mut states = Vec::new();
    let mut ready = false;
    while let Ok(event) = events.try_recv() {
        match event {
            LaunchEvent::StateChanged { state, .. } => states.push(state),
            LaunchEvent::NodeReady { enr, .. } => {
                assert_eq!(enr, "enr:10.0.0.10");
                ready = true;
            }
            _ => {}
        }
    }

    assert_eq!(
        states,
        vec![
            LaunchState::Staging,
            LaunchState::Configuring,
            LaunchState::Scheduling,
            LaunchState::WaitingForAvailability,
            LaunchState::ResolvingIdentity,
            LaunchState::Ready,
        ]
    );
    assert!(ready);
}

#[tokio::test]
async fn test_failure_event_names_failing_stage() {
    let scheduler = FakeScheduler {
        reject_start: true,
        ..FakeScheduler::default()
    };
    let h = harness(scheduler, FakeStager::default(), FakeApiState::default());
    let mut events = h.launcher.subscribe_events();

    let _ = h
        .launcher
        .launch(&ServiceId::from("cl-client-0"), None, &el_context(), &keystores(0))
        .await;

    let mut failed_stage = None;
    let mut last_state = None;
    while let Ok(event) = events.try_recv() {
        match event {
            LaunchEvent::LaunchFailed { stage, .. } => failed_stage = Some(stage),
            LaunchEvent::StateChanged { state, .. } => last_state = Some(state),
            _ => {}
        }
    }

    assert_eq!(failed_stage, Some(LaunchState::Scheduling));
    assert_eq!(last_state, Some(LaunchState::Failed));
}

// ============================================================================
// Participant networks
// ============================================================================

#[tokio::test]
async fn test_participants_bootstrap_from_first_node() {
    let h = harness(FakeScheduler::default(), FakeStager::default(), FakeApiState::default());
    let participants: Vec<ParticipantSpec> = (0..3)
        .map(|i| ParticipantSpec {
            service_id: ServiceId::new(format!("cl-client-{}", i)),
            el_context: el_context(),
            keystores: keystores(i),
        })
        .collect();

    let contexts = launch_participants(&h.launcher, &participants)
        .await
        .expect("network should launch");

    assert_eq!(contexts.len(), 3);
    assert_eq!(contexts[0].enr(), "enr:10.0.0.10");

    let configs = h.scheduler.started_configs();
    assert!(!shell_line(&configs[0]).contains("--p2p-discovery-bootnodes"));
    assert!(shell_line(&configs[1]).contains("--p2p-discovery-bootnodes=enr:10.0.0.10"));
    assert!(shell_line(&configs[2]).contains("--p2p-discovery-bootnodes=enr:10.0.0.10"));
}

#[tokio::test]
async fn test_participant_failure_stops_network_launch() {
    let stager = FakeStager {
        fail_on: Some("node-1".to_string()),
        ..FakeStager::default()
    };
    let h = harness(FakeScheduler::default(), stager, FakeApiState::default());
    let participants: Vec<ParticipantSpec> = (0..3)
        .map(|i| ParticipantSpec {
            service_id: ServiceId::new(format!("cl-client-{}", i)),
            el_context: el_context(),
            keystores: keystores(i),
        })
        .collect();

    let result = launch_participants(&h.launcher, &participants).await;

    assert!(matches!(result, Err(LaunchError::Staging(_))));
    assert_eq!(h.scheduler.start_count(), 1);
}
