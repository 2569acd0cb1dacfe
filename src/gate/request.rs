//! Request view and payment evidence extraction

use crate::types::headers;
use std::collections::HashMap;

/// Read-only view of an inbound request, as seen by the payment gate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    /// Header map with lower-cased names
    headers: HashMap<String, String>,
    /// Protocol scheme (`http` / `https`)
    pub scheme: String,
    /// Host (with port, if any)
    pub host: String,
    /// HTTP method
    pub method: String,
    /// Request path, without query
    pub path: String,
}

impl InboundRequest {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            headers: HashMap::new(),
            scheme: scheme.into(),
            host: host.into(),
            method: method.into(),
            path: path.into(),
        }
    }

    /// Add a header; names are case-insensitive
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Build from HTTP request parts
    ///
    /// The scheme comes from the URI, then `X-Forwarded-Proto` when
    /// `trust_forwarded_proto` is set, then defaults to `http`. The host comes
    /// from the `Host` header, then the URI authority. Header values that are
    /// not valid UTF-8 are skipped.
    pub fn from_parts(parts: &http::request::Parts, trust_forwarded_proto: bool) -> Self {
        let mut headers = HashMap::new();
        for (name, value) in parts.headers.iter() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let scheme = parts
            .uri
            .scheme_str()
            .map(str::to_string)
            .or_else(|| {
                if !trust_forwarded_proto {
                    return None;
                }
                headers
                    .get("x-forwarded-proto")
                    .and_then(|v| v.split(',').next())
                    .map(|v| v.trim().to_string())
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "http".to_string());

        let host = headers
            .get("host")
            .cloned()
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Self {
            headers,
            scheme,
            host,
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
        }
    }

    /// Look up a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Header value, treating empty or whitespace-only values as absent
    fn non_empty_header(&self, name: &str) -> Option<&str> {
        self.header(name).filter(|v| !v.trim().is_empty())
    }

    /// `{scheme}://{host}`
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Payment evidence carried by a request, by fixed precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvidence {
    /// An x402 payment header (raw value)
    CryptoHeaderPresent(String),
    /// A card payment intent identifier
    CardIntentPresent(String),
    NoneProvided,
}

impl PaymentEvidence {
    /// Select the evidence of a request: crypto before card before none
    pub fn from_request(request: &InboundRequest) -> Self {
        let crypto = headers::CRYPTO_PAYMENT_HEADERS
            .iter()
            .find_map(|name| request.non_empty_header(name));
        if let Some(raw) = crypto {
            return PaymentEvidence::CryptoHeaderPresent(raw.to_string());
        }

        if let Some(intent_id) = request.non_empty_header(headers::X_STRIPE_PAYMENT_INTENT_ID) {
            return PaymentEvidence::CardIntentPresent(intent_id.trim().to_string());
        }

        PaymentEvidence::NoneProvided
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            PaymentEvidence::CryptoHeaderPresent(_) => "x402",
            PaymentEvidence::CardIntentPresent(_) => "card",
            PaymentEvidence::NoneProvided => "none",
        }
    }
}
