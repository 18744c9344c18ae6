use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ProviderReply, VerificationGateway};
use crate::config::ProviderConfig;
use crate::error::{Result, VerifyError};

/// Upstream error bodies are kept for diagnostics but never returned verbatim.
const MAX_ERROR_BODY: usize = 2048;

/// reqwest-backed provider client.
pub struct HttpGateway {
    client: Client,
    config: ProviderConfig,
}

impl HttpGateway {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VerifyError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait]
impl VerificationGateway for HttpGateway {
    async fn call(&self, path: &str, payload: &Value) -> Result<ProviderReply> {
        let url = self.url(path);
        let (header, credential) = self.config.credential_header();
        debug!(%url, "calling verification provider");

        let response = self
            .client
            .post(&url)
            .header(header.as_str(), credential)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                warn!(%url, error = %e, "provider {reason}");
                VerifyError::Transport(format!("{reason}: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VerifyError::Transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "provider returned error status");
            return Err(VerifyError::Upstream {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let body: Value = serde_json::from_str(&body).map_err(|e| {
            warn!(%url, error = %e, "provider returned non-JSON body");
            VerifyError::Upstream {
                status: status.as_u16(),
                body: truncate(&body),
            }
        })?;
        Ok(ProviderReply {
            status: status.as_u16(),
            body,
        })
    }
}
