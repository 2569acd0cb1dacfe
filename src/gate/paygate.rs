//! Payment gate: decide whether a request may proceed

use super::config::PaymentConfig;
use super::options::{build_options, NegotiationPayload, NO_VALID_PAYMENT};
use super::request::{InboundRequest, PaymentEvidence};
use crate::card::CardPaymentValidator;
use crate::types::PaymentRequirementsResponse;
use crate::x402::{CryptoPaymentVerifier, CryptoReceipt, CryptoVerdict};
use crate::{Result, X402Error};
use std::sync::Arc;

/// Decision of the gate for one request
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Let the request through
    Proceed(Admission),
    /// Answer with 402 Payment Required
    Reject(Rejection),
}

/// Why a request was let through
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The crypto verifier does not price this request
    Unpriced,
    /// Verified crypto payment, to be settled after the handler
    Crypto(CryptoReceipt),
    /// Validated and consumed card payment intent
    Card { intent_id: String },
}

/// 402 body of a rejected request
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The crypto verifier's own body, returned verbatim
    Verifier(PaymentRequirementsResponse),
    /// Negotiation payload listing accepted payment methods
    Negotiation(NegotiationPayload),
}

impl Rejection {
    /// HTTP status of every rejection
    pub fn status(&self) -> http::StatusCode {
        http::StatusCode::PAYMENT_REQUIRED
    }

    /// JSON body of the rejection
    pub fn body_json(&self) -> Result<serde_json::Value> {
        let body = match self {
            Rejection::Verifier(body) => serde_json::to_value(body)?,
            Rejection::Negotiation(body) => serde_json::to_value(body)?,
        };
        Ok(body)
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Rejection {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match self {
            Rejection::Verifier(body) => (status, axum::Json(body)).into_response(),
            Rejection::Negotiation(body) => (status, axum::Json(body)).into_response(),
        }
    }
}

/// Unified x402 + card payment gate
#[derive(Clone)]
pub struct PaymentGate {
    config: Arc<PaymentConfig>,
    verifier: Arc<dyn CryptoPaymentVerifier>,
    card_validator: Option<Arc<dyn CardPaymentValidator>>,
}

impl std::fmt::Debug for PaymentGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGate")
            .field("config", &self.config)
            .field("card_validator", &self.card_validator.is_some())
            .finish()
    }
}

impl PaymentGate {
    /// Create a gate
    ///
    /// Fails when card payment is enabled without a card validator.
    pub fn new(
        config: PaymentConfig,
        verifier: Arc<dyn CryptoPaymentVerifier>,
        card_validator: Option<Arc<dyn CardPaymentValidator>>,
    ) -> Result<Self> {
        if config.card_payment.enabled && card_validator.is_none() {
            return Err(X402Error::config(
                "Card payment is enabled but no card validator was supplied",
            ));
        }

        Ok(Self {
            config: Arc::new(config),
            verifier,
            card_validator,
        })
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Crypto verifier used by the gate
    pub fn verifier(&self) -> &Arc<dyn CryptoPaymentVerifier> {
        &self.verifier
    }

    /// Evaluate the payment evidence of a request
    ///
    /// An x402 header always wins over a card intent. Missing or rejected
    /// evidence yields [`GateDecision::Reject`]; only failing collaborators
    /// produce an error.
    pub async fn evaluate(&self, request: &InboundRequest) -> Result<GateDecision> {
        let evidence = PaymentEvidence::from_request(request);
        tracing::debug!(
            "Evaluating {} {} with {} payment evidence",
            request.method,
            request.path,
            evidence.label()
        );

        match evidence {
            PaymentEvidence::CryptoHeaderPresent(header) => {
                match self.verifier.verify(&header, request).await? {
                    CryptoVerdict::Unpriced => {
                        tracing::debug!("{} {} is not priced", request.method, request.path);
                        Ok(GateDecision::Proceed(Admission::Unpriced))
                    }
                    CryptoVerdict::Accepted(receipt) => {
                        tracing::info!("x402 payment accepted from {}", receipt.payer);
                        Ok(GateDecision::Proceed(Admission::Crypto(receipt)))
                    }
                    CryptoVerdict::Rejected(body) => {
                        tracing::warn!("x402 payment rejected: {}", body.error);
                        Ok(GateDecision::Reject(Rejection::Verifier(body)))
                    }
                }
            }
            PaymentEvidence::CardIntentPresent(intent_id) if self.config.card_payment.enabled => {
                self.evaluate_card(&intent_id, request).await
            }
            _ => {
                tracing::warn!(
                    "{} {} rejected: {}",
                    request.method,
                    request.path,
                    NO_VALID_PAYMENT
                );
                Ok(self.negotiate(NO_VALID_PAYMENT, request))
            }
        }
    }

    async fn evaluate_card(&self, intent_id: &str, request: &InboundRequest) -> Result<GateDecision> {
        let validator = self
            .card_validator
            .as_ref()
            .ok_or_else(|| X402Error::config("Card payment is enabled but no card validator was supplied"))?;

        let outcome = validator
            .validate_and_consume(intent_id, self.config.card_payment.price_minor_units)
            .await?;

        if outcome.valid {
            tracing::info!("Card payment accepted: intent={}", intent_id);
            return Ok(GateDecision::Proceed(Admission::Card {
                intent_id: intent_id.to_string(),
            }));
        }

        let reason = outcome
            .reason
            .unwrap_or_else(|| "Payment intent validation failed".to_string());
        tracing::warn!("Card payment rejected: intent={}, reason={}", intent_id, reason);
        Ok(self.negotiate(reason, request))
    }

    fn negotiate(&self, message: impl Into<String>, request: &InboundRequest) -> GateDecision {
        let options = build_options(request, &self.config);
        GateDecision::Reject(Rejection::Negotiation(NegotiationPayload::new(
            message, options,
        )))
    }
}
