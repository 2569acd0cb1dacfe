//! Negotiation payload returned when no payment method is satisfied

use super::config::PaymentConfig;
use super::request::InboundRequest;
use crate::types::{headers, routes};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error label of every negotiation payload
pub const PAYMENT_REQUIRED: &str = "Payment Required";

/// Message used when the request carries no usable payment evidence
pub const NO_VALID_PAYMENT: &str = "No valid payment method provided";

/// 402 body produced by the gate itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationPayload {
    pub error: String,
    pub message: String,
    pub options: NegotiationOptions,
}

impl NegotiationPayload {
    pub fn new(message: impl Into<String>, options: NegotiationOptions) -> Self {
        Self {
            error: PAYMENT_REQUIRED.to_string(),
            message: message.into(),
            options,
        }
    }
}

/// Accepted payment methods, keyed by method name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationOptions {
    pub x402: CryptoOption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe: Option<CardOption>,
}

/// How to pay with x402
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoOption {
    pub description: String,
    /// Headers accepted as payment proof
    pub headers: Vec<String>,
}

/// How to pay by card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOption {
    pub description: String,
    /// Where to create a payment intent
    pub create_payment_intent_endpoint: String,
    /// Header carrying the payment intent id
    pub header: String,
    /// Display price, e.g. `$2.50`
    pub price: String,
}

/// Build the payment options offered to a request
pub fn build_options(request: &InboundRequest, config: &PaymentConfig) -> NegotiationOptions {
    let network = config.crypto_payment.resource_server.network;
    let x402 = CryptoOption {
        description: format!(
            "Pay with cryptocurrency (USDC on {})",
            network.display_name()
        ),
        headers: headers::CRYPTO_PAYMENT_HEADERS
            .iter()
            .map(|h| h.to_string())
            .collect(),
    };

    let stripe = config.card_payment.enabled.then(|| CardOption {
        description: "Pay with credit card via Stripe".to_string(),
        create_payment_intent_endpoint: format!(
            "{}{}",
            request.base_url(),
            routes::CREATE_PAYMENT_INTENT
        ),
        header: headers::X_STRIPE_PAYMENT_INTENT_ID.to_string(),
        price: format_price(config.card_payment.price_minor_units),
    });

    NegotiationOptions { x402, stripe }
}

/// Format minor currency units as a dollar string: `250` → `$2.50`
pub fn format_price(minor_units: u64) -> String {
    let amount = Decimal::from_i128_with_scale(i128::from(minor_units), 2);
    format!("${}", amount)
}
