//! Unified payment gate
//!
//! The gate sits in front of paid routes and accepts either an x402 crypto
//! payment or a completed Stripe PaymentIntent. Evidence is examined in a
//! fixed order:
//!
//! 1. `X-Payment` / `X-402-Payment` → delegated to the crypto verifier
//! 2. `X-Stripe-Payment-Intent-Id` (card payment enabled) → card validator
//! 3. nothing usable → 402 listing the accepted methods
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use x402_unified::gate::{PaymentConfig, PaymentGate};
//! use x402_unified::x402::X402Verifier;
//!
//! # fn main() -> x402_unified::Result<()> {
//! let config = PaymentConfig::from_env()?;
//! let verifier = X402Verifier::new(config.crypto_payment.clone())?;
//! let gate = PaymentGate::new(config, Arc::new(verifier), None)?;
//! # let _ = gate;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod options;
pub mod paygate;
pub mod request;

#[cfg(feature = "axum")]
pub mod middleware;


pub use config::{
    parse_price, usdc_atomic_amount, CardPaymentConfig, CryptoPaymentConfig, PaymentConfig,
    ResourceServerConfig, RoutePattern, RouteRule, RouteRules,
};
pub use options::{
    build_options, format_price, CardOption, CryptoOption, NegotiationOptions, NegotiationPayload,
};
pub use paygate::{Admission, GateDecision, PaymentGate, Rejection};
pub use request::{InboundRequest, PaymentEvidence};

#[cfg(feature = "axum")]
pub use middleware::{payment_gate_middleware, run_gated, PaymentGateLayer, PaymentGateService};
