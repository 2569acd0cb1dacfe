//! Network configuration types

use crate::{Result, X402Error};

/// Network configuration for x402 payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

/// Network configuration with chain-specific details
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Chain ID for the network
    pub chain_id: u64,
    /// Network name
    pub name: String,
    /// Public JSON-RPC endpoint
    pub rpc_url: String,
}

impl NetworkConfig {
    /// Base mainnet configuration
    pub fn base_mainnet() -> Self {
        Self {
            chain_id: 8453,
            name: "base".to_string(),
            rpc_url: "https://mainnet.base.org".to_string(),
        }
    }

    /// Base Sepolia testnet configuration
    pub fn base_sepolia() -> Self {
        Self {
            chain_id: 84532,
            name: "base-sepolia".to_string(),
            rpc_url: "https://sepolia.base.org".to_string(),
        }
    }
}

impl Network {
    /// Parse a network identifier (`base` or `base-sepolia`)
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "base" | "base-mainnet" | "mainnet" => Ok(Network::Mainnet),
            "base-sepolia" | "sepolia" | "testnet" => Ok(Network::Testnet),
            other => Err(X402Error::NetworkNotSupported {
                network: other.to_string(),
            }),
        }
    }

    /// Get the network identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "base",
            Network::Testnet => "base-sepolia",
        }
    }

    /// Human-readable chain name
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Mainnet => "Base",
            Network::Testnet => "Base Sepolia",
        }
    }

    /// Get the USDC contract address for this network
    pub fn usdc_address(&self) -> &'static str {
        match self {
            Network::Mainnet => "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            Network::Testnet => "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
        }
    }

    /// Get the USDC token name for this network
    pub fn usdc_name(&self) -> &'static str {
        match self {
            Network::Mainnet => "USD Coin",
            Network::Testnet => "USDC",
        }
    }

    /// Chain-specific configuration
    pub fn config(&self) -> NetworkConfig {
        match self {
            Network::Mainnet => NetworkConfig::base_mainnet(),
            Network::Testnet => NetworkConfig::base_sepolia(),
        }
    }
}
