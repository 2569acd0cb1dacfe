//! Axum middleware and tower layer running the payment gate

use super::paygate::{Admission, GateDecision, PaymentGate};
use super::request::InboundRequest;
use crate::types::headers;
use crate::{Result, X402Error};
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Axum middleware gating the wrapped routes behind payment
///
/// Use with [`axum::middleware::from_fn_with_state`].
pub async fn payment_gate_middleware(
    State(gate): State<PaymentGate>,
    request: Request,
    next: Next,
) -> Result<Response> {
    run_gated(&gate, request, |request| next.run(request)).await
}

/// Evaluate a request and, if admitted, run the handler
///
/// Accepted crypto payments are settled only once the handler succeeded; the
/// settlement is attached as the `X-PAYMENT-RESPONSE` header.
pub async fn run_gated<F, Fut>(gate: &PaymentGate, request: Request, handler: F) -> Result<Response>
where
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = Response>,
{
    let (parts, body) = request.into_parts();
    let inbound = InboundRequest::from_parts(&parts, gate.config().trust_forwarded_proto);
    let request = Request::from_parts(parts, body);

    let receipt = match gate.evaluate(&inbound).await? {
        GateDecision::Reject(rejection) => return Ok(rejection.into_response()),
        GateDecision::Proceed(Admission::Crypto(receipt)) => receipt,
        GateDecision::Proceed(_) => return Ok(handler(request).await),
    };

    let mut response = handler(request).await;
    if !response.status().is_success() {
        tracing::debug!(
            "Handler returned {}, not settling payment from {}",
            response.status(),
            receipt.payer
        );
        return Ok(response);
    }

    let settlement = gate.verifier().settle(&receipt).await?;
    let header_name = HeaderName::from_bytes(headers::X_PAYMENT_RESPONSE.as_bytes())
        .map_err(|e| X402Error::config(format!("Invalid header name: {}", e)))?;
    let header_value = HeaderValue::from_str(&settlement.to_base64()?)
        .map_err(|e| X402Error::config(format!("Failed to encode settlement header: {}", e)))?;
    response.headers_mut().insert(header_name, header_value);

    Ok(response)
}

/// Tower layer running the payment gate in front of a service
#[derive(Debug, Clone)]
pub struct PaymentGateLayer {
    gate: PaymentGate,
}

impl PaymentGateLayer {
    pub fn new(gate: PaymentGate) -> Self {
        Self { gate }
    }
}

impl<S> tower::Layer<S> for PaymentGateLayer {
    type Service = PaymentGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PaymentGateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Tower service produced by [`PaymentGateLayer`]
#[derive(Debug, Clone)]
pub struct PaymentGateService<S> {
    inner: S,
    gate: PaymentGate,
}

impl<S> tower::Service<Request> for PaymentGateService<S>
where
    S: tower::Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let gate = self.gate.clone();
        // The ready service goes into the future; a fresh clone stays behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let result = run_gated(&gate, request, |request| async move {
                match inner.call(request).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                }
            })
            .await;

            Ok(result.into_response())
        })
    }
}
