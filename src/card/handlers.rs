//! HTTP endpoint for creating card payment intents

use super::stripe::StripeClient;
use crate::types::routes;
use crate::X402Error;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

/// State of the payment intent endpoint
#[derive(Debug, Clone)]
pub struct CardPaymentState {
    pub client: StripeClient,
    /// Price charged per request, in minor units
    pub price_minor_units: u64,
}

/// Response of `POST /stripe/create-payment-intent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    pub amount: u64,
    pub currency: String,
}

/// Create a payment intent for the configured request price
pub async fn create_payment_intent(
    State(state): State<CardPaymentState>,
) -> Result<Json<CreatePaymentIntentResponse>, X402Error> {
    let currency = state.client.config().currency.clone();
    let intent = state
        .client
        .create_payment_intent(state.price_minor_units, &currency)
        .await?;

    tracing::info!("Payment intent {} created", intent.id);

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
    }))
}

/// Router serving the payment intent endpoint
pub fn router(state: CardPaymentState) -> Router {
    Router::new()
        .route(routes::CREATE_PAYMENT_INTENT, post(create_payment_intent))
        .with_state(state)
}
