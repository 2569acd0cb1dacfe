//! Facilitator-backed x402 `exact` scheme verifier

use super::{CryptoPaymentVerifier, CryptoReceipt, CryptoVerdict};
use crate::facilitator::FacilitatorClient;
use crate::gate::{usdc_atomic_amount, CryptoPaymentConfig, InboundRequest, RouteRule};
use crate::types::{
    schemes, PaymentPayload, PaymentRequirements, PaymentRequirementsResponse,
    SettleResponse,
};
use crate::{Result, X402Error};
use async_trait::async_trait;
use std::sync::Arc;

/// Verifies x402 payments against route rules through a facilitator
#[derive(Debug, Clone)]
pub struct X402Verifier {
    config: Arc<CryptoPaymentConfig>,
    facilitator: FacilitatorClient,
}

impl X402Verifier {
    /// Create a verifier using the facilitator configured for the resource server
    pub fn new(config: CryptoPaymentConfig) -> Result<Self> {
        let facilitator = FacilitatorClient::new(config.resource_server.facilitator.clone())?;
        Ok(Self::with_facilitator(config, facilitator))
    }

    /// Create a verifier with an explicit facilitator client
    pub fn with_facilitator(config: CryptoPaymentConfig, facilitator: FacilitatorClient) -> Self {
        Self {
            config: Arc::new(config),
            facilitator,
        }
    }

    /// Get the verifier configuration
    pub fn config(&self) -> &CryptoPaymentConfig {
        &self.config
    }

    /// Payment requirements a request must satisfy, if its route is priced
    pub fn requirements_for(&self, request: &InboundRequest) -> Result<Option<PaymentRequirements>> {
        self.config
            .routes
            .find(&request.method, &request.path)
            .map(|rule| self.create_payment_requirements(rule, request))
            .transpose()
    }

    /// Create payment requirements from a route rule
    pub fn create_payment_requirements(
        &self,
        rule: &RouteRule,
        request: &InboundRequest,
    ) -> Result<PaymentRequirements> {
        let server = &self.config.resource_server;
        let network = server.network.as_str();

        let resource = match &server.resource_root_url {
            Some(root) => format!("{}{}", root, request.path),
            None => format!("{}{}", request.base_url(), request.path),
        };

        let max_amount_required = usdc_atomic_amount(rule.price)?.to_string();

        let mut requirements = PaymentRequirements::new(
            schemes::EXACT,
            network,
            max_amount_required,
            server.network.usdc_address(),
            &server.pay_to,
            resource,
            rule.description.as_deref().unwrap_or("Payment required"),
        )
        .with_usdc_info(server.network);
        requirements.mime_type = rule.mime_type.clone();
        requirements.max_timeout_seconds = rule.max_timeout_seconds;

        Ok(requirements)
    }

    fn rejected(reason: impl Into<String>, requirements: &PaymentRequirements) -> CryptoVerdict {
        CryptoVerdict::Rejected(PaymentRequirementsResponse::new(
            reason,
            vec![requirements.clone()],
        ))
    }
}

#[async_trait]
impl CryptoPaymentVerifier for X402Verifier {
    async fn verify(&self, payment_header: &str, request: &InboundRequest) -> Result<CryptoVerdict> {
        let requirements = match self.requirements_for(request)? {
            Some(requirements) => requirements,
            None => {
                tracing::debug!("No x402 route rule for {} {}", request.method, request.path);
                return Ok(CryptoVerdict::Unpriced);
            }
        };

        let payload = match PaymentPayload::from_base64(payment_header) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Failed to decode x402 payment header: {}", e);
                return Ok(Self::rejected(
                    "Invalid or malformed payment header",
                    &requirements,
                ));
            }
        };

        if !payload.matches(&requirements) {
            tracing::debug!(
                "Payment for {}/{} does not match requirements {}/{}",
                payload.scheme,
                payload.network,
                requirements.scheme,
                requirements.network
            );
            return Ok(Self::rejected(
                "Unable to find matching payment requirements",
                &requirements,
            ));
        }

        let verify_response = self.facilitator.verify(&payload, &requirements).await?;
        if !verify_response.is_valid {
            let reason = verify_response
                .invalid_reason
                .unwrap_or_else(|| "Payment verification failed".to_string());
            return Ok(Self::rejected(reason, &requirements));
        }

        let payer = verify_response
            .payer
            .unwrap_or_else(|| payload.payer().to_string());
        tracing::debug!("x402 payment verified: payer='{}'", payer);

        Ok(CryptoVerdict::Accepted(CryptoReceipt {
            payload,
            requirements,
            payer,
        }))
    }

    async fn settle(&self, receipt: &CryptoReceipt) -> Result<SettleResponse> {
        let settlement = self
            .facilitator
            .settle(&receipt.payload, &receipt.requirements)
            .await?;

        if !settlement.success {
            return Err(X402Error::settlement_failed(
                settlement
                    .error_reason
                    .unwrap_or_else(|| "unknown settlement error".to_string()),
            ));
        }

        tracing::debug!(
            "x402 payment settled: payer='{}', transaction='{}', network='{}'",
            receipt.payer,
            settlement.transaction,
            settlement.network
        );

        Ok(settlement)
    }
}
