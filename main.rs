//! Unified payment gate server
//!
//! Serves a paid MCP endpoint accepting x402 crypto payments and, when enabled,
//! Stripe card payments.
//!
//! ## Environment
//!
//! - `BIND_ADDRESS`: bind address (default `0.0.0.0:3000`)
//! - `X402_PAY_TO`, `X402_NETWORK`, `X402_FACILITATOR_URL`,
//!   `X402_RESOURCE_ROOT_URL`, `X402_ROUTES`: crypto payment settings
//! - `STRIPE_ENABLED`, `STRIPE_PRICE_CENTS`, `STRIPE_SECRET_KEY`,
//!   `STRIPE_API_BASE`, `STRIPE_CURRENCY`: card payment settings
//! - `REDIS_URL`: consumed payment intents are kept in Redis (`redis` feature)

use rust_decimal::Decimal;
use std::sync::Arc;
use x402_unified::{
    card::{CardPaymentState, CardPaymentValidator, StripeClient, StripeConfig, StripeValidator},
    gate::{PaymentConfig, PaymentGate, RouteRule, RouteRules},
    server::{self, ServerConfig},
    x402::X402Verifier,
    Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = PaymentConfig::from_env()?;
    if config.crypto_payment.routes.is_empty() {
        tracing::info!("X402_ROUTES not set, charging $0.01 for POST /mcp");
        config.crypto_payment.routes =
            RouteRules::new().with_rule(RouteRule::new("POST /mcp", Decimal::new(1, 2))?);
    }

    let verifier = X402Verifier::new(config.crypto_payment.clone())?;

    let (card_validator, card_state) = if config.card_payment.enabled {
        let client = StripeClient::new(StripeConfig::from_env()?)?;
        let validator = create_card_validator(client.clone())?;
        let state = CardPaymentState {
            client,
            price_minor_units: config.card_payment.price_minor_units,
        };
        (Some(validator), Some(state))
    } else {
        (None, None)
    };

    tracing::info!(
        "Accepting x402 payments on {} to {}{}",
        config.crypto_payment.resource_server.network.display_name(),
        config.crypto_payment.resource_server.pay_to,
        if config.card_payment.enabled {
            " and card payments via Stripe"
        } else {
            ""
        }
    );

    let gate = PaymentGate::new(config, Arc::new(verifier), card_validator)?;
    let app = server::create_app(gate, card_state);

    server::serve(app, ServerConfig::from_env()).await
}

#[cfg(not(feature = "redis"))]
fn create_card_validator(client: StripeClient) -> Result<Arc<dyn CardPaymentValidator>> {
    Ok(Arc::new(StripeValidator::new(client)))
}

#[cfg(feature = "redis")]
fn create_card_validator(client: StripeClient) -> Result<Arc<dyn CardPaymentValidator>> {
    use x402_unified::card::RedisIntentStore;

    match std::env::var("REDIS_URL") {
        Ok(redis_url) => {
            tracing::info!("Tracking consumed payment intents in Redis at {}", redis_url);
            let store = RedisIntentStore::new(&redis_url, None)?;
            Ok(Arc::new(StripeValidator::with_store(client, Arc::new(store))))
        }
        Err(_) => Ok(Arc::new(StripeValidator::new(client))),
    }
}
