use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ServiceEndpoint;
use crate::errors::UpstreamError;

/// The verified caller. `id` is the only trusted owner id in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Verifies bearer tokens against the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the provider rejected the token.
    async fn verify(&self, token: &str) -> Result<Option<Principal>, UpstreamError>;
}

/// Identity provider reached over HTTP (`GET {url}/auth/v1/user`).
pub struct HttpIdentityProvider {
    endpoint: ServiceEndpoint,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(endpoint: ServiceEndpoint, client: reqwest::Client) -> Self {
        Self { endpoint, client }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Option<Principal>, UpstreamError> {
        let url = format!("{}/auth/v1/user", self.endpoint.url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("apikey", &self.endpoint.key)
            .send()
            .await
            .map_err(|e| UpstreamError::new("identity", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpstreamError::new("identity", format!("status {status}")));
        }

        let principal = resp
            .json::<Principal>()
            .await
            .map_err(|e| UpstreamError::new("identity", e))?;
        Ok(Some(principal))
    }
}
