//! Facilitator client for x402 payment verification and settlement
//!
//! The facilitator is the remote service that checks an x402 payment
//! authorization (`/verify`) and executes it on-chain (`/settle`). The
//! [`X402Verifier`](crate::x402::X402Verifier) uses this client for the
//! crypto branch of the payment gate.
//!
//! # Examples
//!
//! ```no_run
//! use x402_unified::facilitator::FacilitatorClient;
//! use x402_unified::types::FacilitatorConfig;
//!
//! # async fn example() -> x402_unified::Result<()> {
//! let client = FacilitatorClient::new(FacilitatorConfig::new("https://x402.org/facilitator"))?;
//! let supported = client.supported().await?;
//! println!("Supported schemes: {:?}", supported.kinds);
//! # Ok(())
//! # }
//! ```

use crate::types::{
    AuthHeadersFnArc, FacilitatorConfig, FacilitatorEndpoint, PaymentPayload,
    PaymentRequirements, SettleResponse, SupportedKinds, VerifyResponse, X402_VERSION,
};
use crate::{Result, X402Error};
use reqwest::{Client, RequestBuilder};
use serde_json::json;


/// Facilitator client for verifying and settling payments
#[derive(Clone)]
pub struct FacilitatorClient {
    /// Base URL of the facilitator service
    url: String,
    /// HTTP client
    client: Client,
    /// Configuration for authentication headers
    auth_config: Option<AuthHeadersFnArc>,
}

impl std::fmt::Debug for FacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorClient")
            .field("url", &self.url)
            .field("auth_config", &"<function>")
            .finish()
    }
}

impl FacilitatorClient {
    /// Create a new facilitator client
    pub fn new(config: FacilitatorConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder();
        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder
            .build()
            .map_err(|e| X402Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url,
            client,
            auth_config: config.create_auth_headers,
        })
    }

    /// Get the base URL of this facilitator
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Verify a payment without executing the transaction
    pub async fn verify(
        &self,
        payment_payload: &PaymentPayload,
        payment_requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse> {
        let request_body = json!({
            "x402Version": X402_VERSION,
            "paymentPayload": payment_payload,
            "paymentRequirements": payment_requirements,
        });

        tracing::debug!(
            "Facilitator verify request to {}/verify: {}",
            self.url,
            serde_json::to_string(&request_body).unwrap_or_default()
        );

        let request = self
            .request(FacilitatorEndpoint::Verify)?
            .json(&request_body);
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let response_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            tracing::error!(
                "Facilitator verify failed with status: {}. Response body: {}",
                status,
                response_body
            );
            return Err(X402Error::facilitator_error(format!(
                "Verification failed with status: {}. Response: {}",
                status, response_body
            )));
        }

        let verify_response: VerifyResponse = response.json().await?;
        Ok(verify_response)
    }

    /// Settle a verified payment by executing the transaction
    pub async fn settle(
        &self,
        payment_payload: &PaymentPayload,
        payment_requirements: &PaymentRequirements,
    ) -> Result<SettleResponse> {
        let request_body = json!({
            "x402Version": X402_VERSION,
            "paymentPayload": payment_payload,
            "paymentRequirements": payment_requirements,
        });

        let response = self
            .request(FacilitatorEndpoint::Settle)?
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(X402Error::facilitator_error(format!(
                "Settlement failed with status: {}",
                response.status()
            )));
        }

        let settle_response: SettleResponse = response.json().await?;
        Ok(settle_response)
    }

    /// Get supported payment schemes and networks
    pub async fn supported(&self) -> Result<SupportedKinds> {
        let response = self
            .request(FacilitatorEndpoint::Supported)?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(X402Error::facilitator_error(format!(
                "Failed to get supported kinds with status: {}",
                response.status()
            )));
        }

        let supported: SupportedKinds = response.json().await?;
        Ok(supported)
    }

    /// Build a request for an endpoint, attaching its authentication headers
    fn request(&self, endpoint: FacilitatorEndpoint) -> Result<RequestBuilder> {
        let url = format!("{}/{}", self.url, endpoint.path());
        let mut request = match endpoint {
            FacilitatorEndpoint::Supported => self.client.get(url),
            FacilitatorEndpoint::Verify | FacilitatorEndpoint::Settle => self.client.post(url),
        };

        if let Some(auth_config) = &self.auth_config {
            let headers = auth_config()?;
            if let Some(endpoint_headers) = headers.get(&endpoint) {
                for (key, value) in endpoint_headers {
                    request = request.header(key, value);
                }
            }
        }

        Ok(request)
    }
}
