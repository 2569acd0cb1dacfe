//! Minimal Ethereum JSON-RPC client

use crate::{Result, X402Error};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client over HTTP
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    url: String,
    client: Client,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Some(Duration::from_secs(30)))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let url = url.into();
        url::Url::parse(&url)?;

        let mut client_builder = Client::builder();
        if let Some(timeout) = timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder
            .build()
            .map_err(|e| X402Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` and deserialize its result
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("JSON-RPC call {} (id={}) to {}", method, id, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(X402Error::Rpc {
                code: i64::from(status.as_u16()),
                message: format!("{} failed with HTTP status {}: {}", method, status, body),
            });
        }

        let response: RpcResponse = response.json().await.map_err(|e| {
            X402Error::malformed_result(format!("Invalid JSON-RPC response to {}: {}", method, e))
        })?;

        if let Some(error) = response.error {
            tracing::debug!("JSON-RPC {} failed: {} {}", method, error.code, error.message);
            return Err(X402Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| X402Error::malformed_result(format!("{} returned no result", method)))?;
        serde_json::from_value(result).map_err(|e| {
            X402Error::malformed_result(format!("Unexpected result of {}: {}", method, e))
        })
    }
}
