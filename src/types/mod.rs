//! Core types shared by the payment gate and its collaborators
//!
//! # Architecture
//!
//! - [`network`] - Network configuration and chain-specific details
//! - [`payment`] - x402 payment requirements and payload structures
//! - [`facilitator`] - Facilitator configuration and response types
//! - [`constants`] - Protocol constants (schemes, header names, routes)
//!
//! # Examples
//!
//! ```
//! use x402_unified::types::{Network, PaymentRequirements};
//!
//! let requirements = PaymentRequirements::new(
//!     "exact",
//!     "base-sepolia",
//!     "10000",                                          // 0.01 USDC
//!     "0x036CbD53842c5426634e7929541eC2318f3dCF7e",   // USDC contract
//!     "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",   // recipient
//!     "https://api.example.com/mcp",
//!     "MCP access",
//! )
//! .with_usdc_info(Network::Testnet);
//!
//! assert_eq!(requirements.max_timeout_seconds, 60);
//! ```

pub mod constants;
pub mod facilitator;
pub mod network;
pub mod payment;

pub use constants::{headers, routes, schemes};
pub use facilitator::{
    AuthHeadersFn, AuthHeadersFnArc, FacilitatorConfig, FacilitatorEndpoint, SettleResponse,
    SupportedKind, SupportedKinds, VerifyResponse, DEFAULT_FACILITATOR_URL,
};
pub use network::{Network, NetworkConfig};
pub use payment::{
    ExactEvmPayload, ExactEvmPayloadAuthorization, PaymentPayload, PaymentRequirements,
    PaymentRequirementsResponse, X402_VERSION,
};
