//! x402 wire types for the crypto payment path

use super::network::Network;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// x402 protocol version
pub const X402_VERSION: u32 = 1;

/// Payment requirements for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme identifier (e.g., "exact")
    pub scheme: String,
    /// Blockchain network identifier (e.g., "base-sepolia")
    pub network: String,
    /// Required payment amount in atomic token units
    pub max_amount_required: String,
    /// Token contract address
    pub asset: String,
    /// Recipient wallet address for the payment
    pub pay_to: String,
    /// URL of the protected resource
    pub resource: String,
    /// Human-readable description of the resource
    pub description: String,
    /// MIME type of the expected response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// JSON schema describing the response format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Maximum time allowed for payment completion in seconds
    pub max_timeout_seconds: u32,
    /// Scheme-specific additional information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirements {
    /// Create a new payment requirements instance
    pub fn new(
        scheme: impl Into<String>,
        network: impl Into<String>,
        max_amount_required: impl Into<String>,
        asset: impl Into<String>,
        pay_to: impl Into<String>,
        resource: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            network: network.into(),
            max_amount_required: max_amount_required.into(),
            asset: asset.into(),
            pay_to: pay_to.into(),
            resource: resource.into(),
            description: description.into(),
            mime_type: None,
            output_schema: None,
            max_timeout_seconds: 60,
            extra: None,
        }
    }

    /// Attach the USDC EIP-712 domain (name, version) in the extra field
    pub fn with_usdc_info(mut self, network: Network) -> Self {
        self.extra = Some(serde_json::json!({
            "name": network.usdc_name(),
            "version": "2",
        }));
        self
    }
}

/// Payment payload carried (base64 JSON) in the crypto payment header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version identifier
    pub x402_version: u32,
    /// Payment scheme identifier
    pub scheme: String,
    /// Blockchain network identifier
    pub network: String,
    /// Payment data object
    pub payload: ExactEvmPayload,
}

impl PaymentPayload {
    /// Create a new payment payload
    pub fn new(
        scheme: impl Into<String>,
        network: impl Into<String>,
        payload: ExactEvmPayload,
    ) -> Self {
        Self {
            x402_version: X402_VERSION,
            scheme: scheme.into(),
            network: network.into(),
            payload,
        }
    }

    /// Decode a base64-encoded payment payload
    pub fn from_base64(encoded: &str) -> crate::Result<Self> {
        let decoded = general_purpose::STANDARD.decode(encoded.trim())?;
        let payload: PaymentPayload = serde_json::from_slice(&decoded)?;
        Ok(payload)
    }

    /// Encode the payment payload to base64
    pub fn to_base64(&self) -> crate::Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(general_purpose::STANDARD.encode(json))
    }

    /// Whether this payload targets the given requirements' scheme and network
    pub fn matches(&self, requirements: &PaymentRequirements) -> bool {
        self.scheme == requirements.scheme && self.network == requirements.network
    }

    /// Address of the paying wallet
    pub fn payer(&self) -> &str {
        &self.payload.authorization.from
    }
}

/// Exact EVM payment payload (EIP-3009)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    /// EIP-712 signature for authorization
    pub signature: String,
    /// EIP-3009 authorization parameters
    pub authorization: ExactEvmPayloadAuthorization,
}

/// EIP-3009 authorization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayloadAuthorization {
    /// Payer's wallet address
    pub from: String,
    /// Recipient's wallet address
    pub to: String,
    /// Payment amount in atomic units
    pub value: String,
    /// Unix timestamp when authorization becomes valid
    pub valid_after: String,
    /// Unix timestamp when authorization expires
    pub valid_before: String,
    /// 32-byte random nonce to prevent replay attacks
    pub nonce: String,
}

impl ExactEvmPayloadAuthorization {
    /// Create a new authorization
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        value: impl Into<String>,
        valid_after: impl Into<String>,
        valid_before: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            value: value.into(),
            valid_after: valid_after.into(),
            valid_before: valid_before.into(),
            nonce: nonce.into(),
        }
    }
}

/// Payment requirements response: the x402 verifier's own 402 body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirementsResponse {
    /// Protocol version
    pub x402_version: u32,
    /// Human-readable error message
    pub error: String,
    /// Array of acceptable payment methods
    pub accepts: Vec<PaymentRequirements>,
}

impl PaymentRequirementsResponse {
    /// Create a new payment requirements response
    pub fn new(error: impl Into<String>, accepts: Vec<PaymentRequirements>) -> Self {
        Self {
            x402_version: X402_VERSION,
            error: error.into(),
            accepts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> PaymentPayload {
        let authorization = ExactEvmPayloadAuthorization::new(
            "0x857b06519E91e3A54538791bDbb0E22373e36b66",
            "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
            "10000",
            "1745323800",
            "1745323985",
            "0xf3746613c2d920b5fdabc0856f2aeb2d4f88ee6037b8cc5d04a71a4462f13480",
        );
        PaymentPayload::new(
            "exact",
            "base-sepolia",
            ExactEvmPayload {
                signature: "0x2d6a".to_string(),
                authorization,
            },
        )
    }

    #[test]
    fn test_payment_payload_wire_names() {
        let value = serde_json::to_value(sample_payload()).unwrap();
        assert_eq!(value["x402Version"], 1);
        assert_eq!(value["payload"]["authorization"]["validAfter"], "1745323800");
        assert!(value["payload"]["authorization"]["valid_after"].is_null());
    }

    #[test]
    fn test_payment_payload_base64_header() {
        let payload = sample_payload();
        let header = payload.to_base64().unwrap();
        let decoded = PaymentPayload::from_base64(&format!(" {header} ")).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.payer(), "0x857b06519E91e3A54538791bDbb0E22373e36b66");

        assert!(PaymentPayload::from_base64("not base64!").is_err());
        let not_json = general_purpose::STANDARD.encode("{\"scheme\":");
        assert!(PaymentPayload::from_base64(&not_json).is_err());
    }

    #[test]
    fn test_requirements_response_shape() {
        let requirements = PaymentRequirements::new(
            "exact",
            "base-sepolia",
            "10000",
            Network::Testnet.usdc_address(),
            "0x209693bc6afc0c5328ba36faf03c514ef312287c",
            "https://api.example.com/mcp",
            "MCP access",
        )
        .with_usdc_info(Network::Testnet);

        let body = serde_json::to_value(PaymentRequirementsResponse::new(
            "X-PAYMENT header is required",
            vec![requirements.clone()],
        ))
        .unwrap();

        assert_eq!(body["accepts"][0]["scheme"], "exact");
        assert_eq!(body["accepts"][0]["maxAmountRequired"], "10000");
        assert_eq!(body["accepts"][0]["extra"]["name"], "USDC");
        assert!(sample_payload().matches(&requirements));
    }
}
