use clcore::{ApiError, BeaconApi, ClClientContext, LaunchError, ServiceId};

const ENR_PREFIX: &str = "enr:";

/// Ask a live node for its ENR and package it with the address peers
/// should use. Not retried.
pub async fn resolve_identity(
    service_id: &ServiceId,
    api: &dyn BeaconApi,
    ip_addr: &str,
    http_port_num: u16,
) -> Result<ClClientContext, LaunchError> {
    let identity_err = |source: ApiError| LaunchError::IdentityQuery {
        service_id: service_id.clone(),
        source,
    };

    let identity = api.node_identity().await.map_err(identity_err)?;

    let enr = identity.enr.trim();
    if !enr.starts_with(ENR_PREFIX) || enr.len() == ENR_PREFIX.len() {
        return Err(identity_err(ApiError::Malformed(format!(
            "expected an ENR record but got '{}'",
            identity.enr
        ))));
    }

    tracing::debug!("Service '{}' has peer id '{}'", service_id, identity.peer_id);
    Ok(ClClientContext::new(enr, ip_addr, http_port_num))
}
