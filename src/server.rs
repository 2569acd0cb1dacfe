//! HTTP server for the payment gate
//!
//! Assembles the demo application: a gated `POST /mcp`, the card payment
//! intent endpoint (when card payment is enabled) and `GET /health`.

use crate::card::CardPaymentState;
use crate::gate::{payment_gate_middleware, PaymentGate};
use crate::types::X402_VERSION;
use crate::{Result, X402Error};
use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Server binding configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000")
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0:3000")
    }
}

impl ServerConfig {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
        }
    }

    /// Read `BIND_ADDRESS`, falling back to the default
    pub fn from_env() -> Self {
        std::env::var("BIND_ADDRESS")
            .map(Self::new)
            .unwrap_or_default()
    }
}

/// Build the application router
pub fn create_app(gate: PaymentGate, card: Option<CardPaymentState>) -> Router {
    let paid = Router::new()
        .route("/mcp", post(mcp_handler))
        .route_layer(middleware::from_fn_with_state(gate, payment_gate_middleware));

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .merge(paid);
    if let Some(card) = card {
        app = app.merge(crate::card::router(card));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Bind `config.bind_addr` and serve `router` until the process stops
pub async fn serve(router: Router, config: ServerConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| X402Error::config(format!("Failed to bind to {}: {}", config.bind_addr, e)))?;

    tracing::info!("Payment gate listening on http://{}", config.bind_addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| X402Error::config(format!("Server error: {}", e)))?;

    Ok(())
}

/// Paid MCP endpoint; echoes the JSON-RPC request id
async fn mcp_handler(Json(request): Json<serde_json::Value>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "jsonrpc": "2.0",
        "id": request.get("id").cloned().unwrap_or(serde_json::Value::Null),
        "result": { "status": "paid" },
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": crate::VERSION,
        "x402_version": X402_VERSION,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{CryptoPaymentConfig, PaymentConfig, ResourceServerConfig, RouteRule, RouteRules};
    use crate::x402::X402Verifier;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let routes = RouteRules::new()
            .with_rule(RouteRule::new("POST /mcp", Decimal::new(1, 2)).unwrap());
        let crypto = CryptoPaymentConfig::new(
            routes,
            ResourceServerConfig::new("0x209693Bc6afc0C5328bA36FaF03C514EF312287C"),
        );
        let verifier = X402Verifier::new(crypto.clone()).unwrap();
        let gate = PaymentGate::new(PaymentConfig::new(crypto), Arc::new(verifier), None).unwrap();
        create_app(gate, None)
    }

    #[test]
    fn test_server_config_default() {
        assert_eq!(ServerConfig::default().bind_addr, "0.0.0.0:3000");
        assert_eq!(ServerConfig::new("127.0.0.1:0").bind_addr, "127.0.0.1:0");
    }

    #[tokio::test]
    async fn test_health_is_free() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["x402_version"], 1);
    }

    #[tokio::test]
    async fn test_mcp_requires_payment() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "No valid payment method provided");
        assert!(body["options"].get("stripe").is_none());
    }

    #[tokio::test]
    async fn test_card_route_absent_when_disabled() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stripe/create-payment-intent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_gated() {
        let response = test_app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
