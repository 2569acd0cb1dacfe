//! Crypto payment verification (x402)
//!
//! The payment gate hands any request carrying an x402 payment header to a
//! [`CryptoPaymentVerifier`] and returns its verdict unchanged. The verifier
//! owns the wire format of its own 402 body ([`PaymentRequirementsResponse`]).
//!
//! [`X402Verifier`] is the facilitator-backed implementation of the `exact`
//! scheme:
//!
//! 1. Request has no matching route rule → [`CryptoVerdict::Unpriced`]
//! 2. Header cannot be decoded, or targets another scheme/network → rejected
//! 3. Facilitator says the authorization is invalid → rejected
//! 4. Otherwise → accepted; settlement happens after the handler ran

use crate::gate::InboundRequest;
use crate::types::{PaymentPayload, PaymentRequirements, PaymentRequirementsResponse, SettleResponse};
use crate::Result;
use async_trait::async_trait;

pub mod verifier;


pub use verifier::X402Verifier;

/// Verifier of x402 payment headers
#[async_trait]
pub trait CryptoPaymentVerifier: Send + Sync {
    /// Verify the raw payment header presented with a request
    async fn verify(&self, payment_header: &str, request: &InboundRequest) -> Result<CryptoVerdict>;

    /// Settle a previously accepted payment
    async fn settle(&self, receipt: &CryptoReceipt) -> Result<SettleResponse>;
}

/// Outcome of verifying an x402 payment header
#[derive(Debug, Clone, PartialEq)]
pub enum CryptoVerdict {
    /// No route rule prices this request
    Unpriced,
    /// Payment authorization verified
    Accepted(CryptoReceipt),
    /// Payment refused; the body is returned to the client as-is
    Rejected(PaymentRequirementsResponse),
}

/// A verified but not yet settled payment
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoReceipt {
    pub payload: PaymentPayload,
    pub requirements: PaymentRequirements,
    /// Payer reported by the facilitator, falling back to the authorization's sender
    pub payer: String,
}
