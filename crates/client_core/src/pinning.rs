//! IPFS pinning for batch certificate metadata.
//!
//! Without credentials, or when the service is unreachable and mock fallback
//! is enabled, content gets a deterministic mock CID instead so local
//! environments keep working.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_PINNING_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";
const MOCK_CID_PREFIX: &str = "mock-";

#[derive(Debug, Error)]
pub enum PinningError {
    #[error("invalid pinning endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        source: url::ParseError,
    },
    #[error("pinning request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("pinning service rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("pinning service response missing IpfsHash")]
    MissingHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinnedContent {
    pub cid: String,
    pub mocked: bool,
}

impl PinnedContent {
    pub fn uri(&self) -> String {
        format!("ipfs://{}", self.cid)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinRequest<'a> {
    pinata_content: &'a Value,
    pinata_metadata: PinMetadata<'a>,
}

#[derive(Serialize)]
struct PinMetadata<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

pub struct PinningClient {
    http: Client,
    endpoint: Url,
    jwt: Option<String>,
    mock_fallback: bool,
}

impl PinningClient {
    pub fn new(endpoint: &str, jwt: Option<String>) -> Result<Self, PinningError> {
        let endpoint = Url::parse(endpoint).map_err(|source| PinningError::InvalidEndpoint {
            url: endpoint.to_string(),
            source,
        })?;
        Ok(Self {
            http: Client::builder().build()?,
            endpoint,
            jwt: jwt.filter(|jwt| !jwt.trim().is_empty()),
            mock_fallback: true,
        })
    }

    pub fn with_mock_fallback(mut self, enabled: bool) -> Self {
        self.mock_fallback = enabled;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.jwt.is_some()
    }

    pub async fn pin_json(&self, name: &str, content: &Value) -> Result<PinnedContent, PinningError> {
        let Some(jwt) = self.jwt.as_deref() else {
            warn!(name, "pinning: no credentials configured, using mock CID");
            return Ok(mock_pin(content));
        };

        match self.upload(jwt, name, content).await {
            Ok(cid) => {
                info!(name, cid = %cid, "pinning: content pinned");
                Ok(PinnedContent { cid, mocked: false })
            }
            Err(err) if self.mock_fallback => {
                warn!(name, error = %err, "pinning: upload failed, using mock CID");
                Ok(mock_pin(content))
            }
            Err(err) => Err(err),
        }
    }

    async fn upload(&self, jwt: &str, name: &str, content: &Value) -> Result<String, PinningError> {
        let request = PinRequest {
            pinata_content: content,
            pinata_metadata: PinMetadata { name },
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(jwt)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinningError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PinResponse = response.json().await?;
        parsed
            .ipfs_hash
            .filter(|hash| !hash.is_empty())
            .ok_or(PinningError::MissingHash)
    }
}

/// Deterministic stand-in CID derived from the content.
pub fn mock_pin(content: &Value) -> PinnedContent {
    let digest = Sha256::digest(content.to_string().as_bytes());
    let hex: String = digest[..16].iter().map(|byte| format!("{byte:02x}")).collect();
    PinnedContent {
        cid: format!("{MOCK_CID_PREFIX}{hex}"),
        mocked: true,
    }
}

#[cfg(test)]
#[path = "tests/pinning_tests.rs"]
mod tests;
