//! Stripe PaymentIntent client and validator

use super::store::{ConsumedIntentStore, InMemoryIntentStore};
use super::{CardPaymentValidator, ValidationOutcome};
use crate::{Result, X402Error};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default Stripe API base URL
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Default currency for card payments
pub const DEFAULT_CURRENCY: &str = "usd";

/// Characters escaped in a URL path segment; unreserved characters pass through
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'~');

/// Stripe API configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: String,
    /// API base URL, overridable for tests and proxies
    pub api_base: String,
    /// Currency accepted for card payments (lower-case ISO code)
    pub currency: String,
    /// Request timeout
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the accepted currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_lowercase();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load from `STRIPE_SECRET_KEY`, `STRIPE_API_BASE` and `STRIPE_CURRENCY`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("STRIPE_SECRET_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| X402Error::config("STRIPE_SECRET_KEY is required when Stripe is enabled"))?;

        let mut config = Self::new(secret_key.trim());
        if let Some(api_base) = lookup("STRIPE_API_BASE") {
            config = config.with_api_base(api_base);
        }
        if let Some(currency) = lookup("STRIPE_CURRENCY") {
            config = config.with_currency(currency);
        }
        Ok(config)
    }
}

/// The subset of a Stripe PaymentIntent this crate reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// `requires_payment_method`, `processing`, `succeeded`, ...
    pub status: String,
    /// Amount requested, in minor units
    pub amount: u64,
    /// Amount actually collected, in minor units
    #[serde(default)]
    pub amount_received: u64,
    pub currency: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Minimal Stripe REST client
#[derive(Debug, Clone)]
pub struct StripeClient {
    config: Arc<StripeConfig>,
    client: Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self> {
        if !config.api_base.starts_with("http://") && !config.api_base.starts_with("https://") {
            return Err(X402Error::config(format!(
                "Stripe API base must be an HTTP(S) URL, got '{}'",
                config.api_base
            )));
        }

        let mut client_builder = Client::builder();
        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder
            .build()
            .map_err(|e| X402Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Fetch a payment intent; `None` if Stripe does not know it
    pub async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<Option<PaymentIntent>> {
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.config.api_base,
            utf8_percent_encode(intent_id, PATH_SEGMENT)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| X402Error::card_provider(format!("Stripe request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check_status(response, "retrieve payment intent").await?;
        let intent = response.json::<PaymentIntent>().await.map_err(|e| {
            X402Error::malformed_result(format!("Unexpected payment intent body: {}", e))
        })?;
        Ok(Some(intent))
    }

    /// Create a payment intent for `amount` minor units
    pub async fn create_payment_intent(&self, amount: u64, currency: &str) -> Result<PaymentIntent> {
        let url = format!("{}/v1/payment_intents", self.config.api_base);
        let amount = amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .form(&form)
            .send()
            .await
            .map_err(|e| X402Error::card_provider(format!("Stripe request failed: {}", e)))?;

        let response = Self::check_status(response, "create payment intent").await?;
        let intent = response.json::<PaymentIntent>().await.map_err(|e| {
            X402Error::malformed_result(format!("Unexpected payment intent body: {}", e))
        })?;

        tracing::debug!("Created payment intent {} for {} {}", intent.id, intent.amount, intent.currency);
        Ok(intent)
    }

    async fn check_status(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);
        tracing::error!("Stripe failed to {}: status={}, message={}", action, status, message);

        Err(X402Error::card_provider(format!(
            "Failed to {} with status: {}. {}",
            action, status, message
        )))
    }
}

/// Validates PaymentIntents with Stripe and enforces single use
#[derive(Clone)]
pub struct StripeValidator {
    client: StripeClient,
    store: Arc<dyn ConsumedIntentStore>,
}

impl std::fmt::Debug for StripeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeValidator")
            .field("client", &self.client)
            .field("store", &"<store>")
            .finish()
    }
}

impl StripeValidator {
    /// Create a validator with an in-memory consumed-intent store
    pub fn new(client: StripeClient) -> Self {
        Self::with_store(client, Arc::new(InMemoryIntentStore::new()))
    }

    /// Create a validator with a custom consumed-intent store
    pub fn with_store(client: StripeClient, store: Arc<dyn ConsumedIntentStore>) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &StripeClient {
        &self.client
    }
}

#[async_trait]
impl CardPaymentValidator for StripeValidator {
    async fn validate_and_consume(
        &self,
        intent_id: &str,
        expected_minor_units: u64,
    ) -> Result<ValidationOutcome> {
        if !intent_id.starts_with("pi_") {
            return Ok(ValidationOutcome::invalid("Invalid payment intent ID"));
        }

        if self.store.is_consumed(intent_id).await? {
            return Ok(ValidationOutcome::invalid(
                "Payment intent has already been used",
            ));
        }

        let intent = match self.client.retrieve_payment_intent(intent_id).await? {
            Some(intent) => intent,
            None => return Ok(ValidationOutcome::invalid("Payment intent not found")),
        };

        if !intent.is_succeeded() {
            return Ok(ValidationOutcome::invalid(format!(
                "Payment not completed (status: {})",
                intent.status
            )));
        }

        let currency = &self.client.config().currency;
        if !intent.currency.eq_ignore_ascii_case(currency) {
            return Ok(ValidationOutcome::invalid(format!(
                "Unexpected payment currency: {}",
                intent.currency
            )));
        }

        if intent.amount_received < expected_minor_units {
            tracing::debug!(
                "Payment intent {} received {} < expected {}",
                intent_id,
                intent.amount_received,
                expected_minor_units
            );
            return Ok(ValidationOutcome::invalid("Insufficient payment amount"));
        }

        // Two concurrent requests may both get here; only one consumes
        if !self.store.consume(intent_id).await? {
            return Ok(ValidationOutcome::invalid(
                "Payment intent has already been used",
            ));
        }

        tracing::debug!("Payment intent {} consumed", intent_id);
        Ok(ValidationOutcome::valid())
    }
}
