//! # x402-unified
//!
//! Payment gate for HTTP APIs accepting **either** an x402 crypto payment
//! (USDC on Base, verified and settled through a facilitator) **or** a
//! completed Stripe PaymentIntent, plus transaction signing through a
//! delegated wallet or the user's browser wallet.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{middleware, routing::post, Router};
//! use std::sync::Arc;
//! use x402_unified::{
//!     gate::{payment_gate_middleware, PaymentConfig, PaymentGate},
//!     x402::X402Verifier,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // X402_PAY_TO=0x... X402_ROUTES='{"POST /mcp": {"price": "$0.01"}}'
//!     let config = PaymentConfig::from_env()?;
//!     let verifier = X402Verifier::new(config.crypto_payment.clone())?;
//!     let gate = PaymentGate::new(config, Arc::new(verifier), None)?;
//!
//!     let app = Router::new()
//!         .route("/mcp", post(|| async { "paid content" }))
//!         .layer(middleware::from_fn_with_state(gate, payment_gate_middleware));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`gate`**: payment gate, configuration, negotiation payload and middleware
//! - **`x402`**: crypto payment verifier backed by a facilitator
//! - **`card`**: Stripe PaymentIntent validation with single-use enforcement
//! - **`facilitator`**: x402 facilitator client (`/verify`, `/settle`, `/supported`)
//! - **`wallet`**: transaction signing via browser or delegated wallets
//! - **`types`**: x402 wire types and network constants
//! - **`error`**: error type and classification
//!
//! ## Optional Features
//!
//! - **`axum`** (default): middleware, tower layer, card endpoint, browser callback bridge
//! - **`redis`**: Redis-backed consumed payment intent store

pub mod card;
pub mod error;
pub mod facilitator;
pub mod gate;
pub mod types;
pub mod wallet;
pub mod x402;

#[cfg(feature = "axum")]
pub mod server;

pub use error::{ErrorKind, Result, X402Error};
pub use types::*;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert_eq!(X402_VERSION, 1);
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_networks() {
        assert_eq!(Network::from_name("base").unwrap().as_str(), "base");
        assert_eq!(
            Network::Testnet.usdc_address(),
            "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
        );
        assert_eq!(schemes::EXACT, "exact");
    }
}
