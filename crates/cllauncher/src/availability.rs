use clcore::{ApiError, BeaconApi, EventEmitter, LaunchError, ServiceId};
use std::time::Duration;
use tokio::time::sleep;

/// Poll the node's health endpoint until it answers or the budget runs out.
///
/// Makes at most `max_attempts` calls, sleeping `interval` between them.
pub async fn wait_for_availability(
    service_id: &ServiceId,
    api: &dyn BeaconApi,
    max_attempts: u32,
    interval: Duration,
    events: &EventEmitter,
) -> Result<(), LaunchError> {
    let mut last_error = ApiError::Request("no health check was attempted".to_string());

    for attempt in 1..=max_attempts {
        match api.health().await {
            Ok(()) => {
                tracing::debug!(
                    "Service '{}' became available after {} attempt(s)",
                    service_id,
                    attempt
                );
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(
                    "Health check {}/{} for '{}' failed: {}",
                    attempt,
                    max_attempts,
                    service_id,
                    e
                );
                events.health_check_failed(attempt, max_attempts, e.to_string());
                last_error = e;
            }
        }

        if attempt < max_attempts {
            sleep(interval).await;
        }
    }

    Err(LaunchError::AvailabilityTimeout {
        service_id: service_id.clone(),
        attempts: max_attempts,
        last_error,
    })
}
