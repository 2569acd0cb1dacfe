//! Error types for the unified payment gate and transaction signing
//!
//! Rejected or missing payment evidence is *not* an error: it is reported as a
//! [`GateDecision::Reject`](crate::gate::GateDecision::Reject). Errors are reserved
//! for misconfiguration, failing external collaborators and malformed results.

use thiserror::Error;

/// Result type alias for x402 operations
pub type Result<T> = std::result::Result<T, X402Error>;

/// Coarse classification of an [`X402Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration, raised before any external call
    Configuration,
    /// An external collaborator returned something that is not well-formed
    MalformedResult,
    /// A verifier, validator, signer, RPC node or HTTP transport failed
    ExternalCallFailure,
    /// The wallet client cannot sign (e.g. no account configured)
    Wallet,
    /// Local serialization or IO failure
    Internal,
}

/// Errors raised by this crate
#[derive(Error, Debug)]
pub enum X402Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Malformed result: {message}")]
    MalformedResult { message: String },

    #[error("Facilitator error: {message}")]
    FacilitatorError { message: String },

    #[error("Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    #[error("Card provider error: {message}")]
    CardProvider { message: String },

    #[error("Browser wallet error: {message}")]
    BrowserWallet { message: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Wallet error: {message}")]
    Wallet { message: String },

    #[error("Invalid signature: {message}")]
    InvalidSignature { message: String },

    #[error("Network not supported: {network}")]
    NetworkNotSupported { network: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl X402Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn malformed_result(message: impl Into<String>) -> Self {
        Self::MalformedResult {
            message: message.into(),
        }
    }

    pub fn facilitator_error(message: impl Into<String>) -> Self {
        Self::FacilitatorError {
            message: message.into(),
        }
    }

    pub fn settlement_failed(reason: impl Into<String>) -> Self {
        Self::SettlementFailed {
            reason: reason.into(),
        }
    }

    pub fn card_provider(message: impl Into<String>) -> Self {
        Self::CardProvider {
            message: message.into(),
        }
    }

    pub fn browser_wallet(message: impl Into<String>) -> Self {
        Self::BrowserWallet {
            message: message.into(),
        }
    }

    pub fn wallet(message: impl Into<String>) -> Self {
        Self::Wallet {
            message: message.into(),
        }
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            X402Error::Config { .. }
            | X402Error::NetworkNotSupported { .. }
            | X402Error::InvalidSignature { .. }
            | X402Error::Url(_) => ErrorKind::Configuration,
            X402Error::MalformedResult { .. } => ErrorKind::MalformedResult,
            X402Error::FacilitatorError { .. }
            | X402Error::SettlementFailed { .. }
            | X402Error::CardProvider { .. }
            | X402Error::BrowserWallet { .. }
            | X402Error::Rpc { .. }
            | X402Error::Storage { .. }
            | X402Error::Http(_) => ErrorKind::ExternalCallFailure,
            X402Error::Wallet { .. } => ErrorKind::Wallet,
            X402Error::Json(_) | X402Error::Base64(_) | X402Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error was raised by an external collaborator
    pub fn is_external(&self) -> bool {
        self.kind() == ErrorKind::ExternalCallFailure
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for X402Error {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self.kind() {
            ErrorKind::ExternalCallFailure | ErrorKind::MalformedResult => StatusCode::BAD_GATEWAY,
            ErrorKind::Configuration | ErrorKind::Wallet | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        tracing::error!("Request failed: {}", self);

        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(X402Error::config("x").kind(), ErrorKind::Configuration);
        assert_eq!(
            X402Error::malformed_result("x").kind(),
            ErrorKind::MalformedResult
        );
        assert_eq!(X402Error::wallet("x").kind(), ErrorKind::Wallet);
        assert!(X402Error::card_provider("down").is_external());
        assert!(X402Error::Rpc {
            code: -32000,
            message: "nonce too low".to_string()
        }
        .is_external());
        assert!(!X402Error::config("x").is_external());
    }

    #[test]
    fn test_error_display() {
        let err = X402Error::malformed_result("bad hash");
        assert_eq!(err.to_string(), "Malformed result: bad hash");

        let err = X402Error::Rpc {
            code: -32601,
            message: "method not found".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error -32601: method not found");
    }
}
