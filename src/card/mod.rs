//! Card payment validation (Stripe PaymentIntents)
//!
//! A card payment is proven by the id of a PaymentIntent the client completed
//! out of band. The validator checks it against the card provider and marks it
//! consumed so the same intent can never pay for two requests.

use crate::Result;
use async_trait::async_trait;

pub mod store;
pub mod stripe;

#[cfg(feature = "axum")]
pub mod handlers;


pub use store::{ConsumedIntentStore, InMemoryIntentStore};
pub use stripe::{PaymentIntent, StripeClient, StripeConfig, StripeValidator};

#[cfg(feature = "axum")]
pub use handlers::{create_payment_intent, router, CardPaymentState, CreatePaymentIntentResponse};

#[cfg(feature = "redis")]
pub use store::redis_store::RedisIntentStore;

/// Validator of card payment intents
#[async_trait]
pub trait CardPaymentValidator: Send + Sync {
    /// Validate an intent against the expected amount (minor units) and consume it
    ///
    /// A valid outcome is returned at most once per intent id.
    async fn validate_and_consume(
        &self,
        intent_id: &str,
        expected_minor_units: u64,
    ) -> Result<ValidationOutcome>;
}

/// Outcome of validating a card payment intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// Why the intent was refused
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}
