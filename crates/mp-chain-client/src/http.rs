use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::{Eip1193, ProviderError};

/// Upper bound for a single HTTP round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON-RPC 2.0 over HTTP(S).
///
/// Serves both as the read-only fallback endpoint and as the transport of
/// wallets that expose EIP-1193 over a local HTTP port.
pub struct JsonRpcHttp {
    label: String,
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcHttp {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let label = endpoint.clone();
        Self::with_label(label, endpoint)
    }

    pub fn with_label(label: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("failed to build HTTP client for JSON-RPC endpoint")?;
        Ok(Self {
            label: label.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Eip1193 for JsonRpcHttp {
    fn label(&self) -> &str {
        &self.label
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(endpoint = %self.endpoint, method, id, "json-rpc request");

        let response = self
            .http
            .post(&self.endpoint)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(format!("{method} request failed: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::Transport(format!("{method} body read failed: {err}")))?;

        parse_response(method, status, &text)
    }
}

fn parse_response(
    method: &str,
    status: reqwest::StatusCode,
    text: &str,
) -> Result<Value, ProviderError> {
    let payload: Value = match serde_json::from_str(text) {
        Ok(payload) => payload,
        Err(_) if !status.is_success() => {
            return Err(ProviderError::Transport(format!("{method} HTTP {status}: {text}")));
        }
        Err(err) => {
            return Err(ProviderError::InvalidResponse(format!(
                "{method} returned invalid JSON: {err}"
            )));
        }
    };

    if let Some(error) = payload.get("error") {
        return Err(ProviderError::from_rpc_object(error));
    }

    if !status.is_success() {
        return Err(ProviderError::Transport(format!("{method} HTTP {status}: {text}")));
    }

    payload
        .get("result")
        .cloned()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("{method} response missing `result`")))
}
