//! Common constants for schemes, payment headers and routes

/// Common payment schemes
pub mod schemes {
    /// Exact payment scheme (EIP-3009)
    pub const EXACT: &str = "exact";
}

/// Request and response header names understood by the payment gate
pub mod headers {
    /// Primary x402 payment header
    pub const X_PAYMENT: &str = "X-Payment";
    /// Alternate x402 payment header
    pub const X_402_PAYMENT: &str = "X-402-Payment";
    /// Stripe PaymentIntent identifier header
    pub const X_STRIPE_PAYMENT_INTENT_ID: &str = "X-Stripe-Payment-Intent-Id";
    /// Settlement receipt attached to successful crypto-paid responses
    pub const X_PAYMENT_RESPONSE: &str = "X-PAYMENT-RESPONSE";

    /// Headers accepted as crypto payment evidence, in lookup order
    pub const CRYPTO_PAYMENT_HEADERS: [&str; 2] = [X_PAYMENT, X_402_PAYMENT];
}

/// Well-known routes
pub mod routes {
    /// Endpoint advertised for creating a card payment intent
    pub const CREATE_PAYMENT_INTENT: &str = "/stripe/create-payment-intent";
}
