use async_trait::async_trait;
use clcore::{ApiError, BeaconApi, BeaconApiFactory, NodeIdentity};
use serde::Deserialize;
use std::time::Duration;

const HEALTH_PATH: &str = "/eth/v1/node/health";
const IDENTITY_PATH: &str = "/eth/v1/node/identity";

/// Client for the standard beacon node REST API
pub struct BeaconRestClient {
    client: reqwest::Client,
    base_url: String,
}

impl BeaconRestClient {
    pub fn new(client: reqwest::Client, ip_addr: &str, port_num: u16) -> Self {
        Self {
            client,
            base_url: format!("http://{}:{}", ip_addr, port_num),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!("GET {}", url);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Request(format!("GET {} failed: {}", url, e)))
    }
}

#[async_trait]
impl BeaconApi for BeaconRestClient {
    async fn health(&self) -> Result<(), ApiError> {
        let response = self.get(HEALTH_PATH).await?;
        let status = response.status().as_u16();
        // 206 means the node is up but still syncing
        match status {
            200 | 206 => Ok(()),
            _ => Err(ApiError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn node_identity(&self) -> Result<NodeIdentity, ApiError> {
        let response = self.get(IDENTITY_PATH).await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Request(format!("Failed to read response: {}", e)))?;

        if status != 200 {
            return Err(ApiError::Status { status, body });
        }
        parse_identity_response(&body)
    }
}

#[derive(Deserialize)]
struct IdentityResponse {
    data: NodeIdentity,
}

/// Parse the body of `GET /eth/v1/node/identity`
pub fn parse_identity_response(body: &str) -> Result<NodeIdentity, ApiError> {
    serde_json::from_str::<IdentityResponse>(body)
        .map(|response| response.data)
        .map_err(|e| ApiError::Malformed(format!("Invalid node identity response: {}", e)))
}

/// Hands out REST clients sharing one connection pool
#[derive(Clone)]
pub struct BeaconRestClientFactory {
    client: reqwest::Client,
}

impl BeaconRestClientFactory {
    pub fn new(request_timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl BeaconApiFactory for BeaconRestClientFactory {
    fn connect(&self, ip_addr: &str, port_num: u16) -> Box<dyn BeaconApi> {
        Box::new(BeaconRestClient::new(self.client.clone(), ip_addr, port_num))
    }
}
