//! Transaction signing
//!
//! [`TransactionSigner::sign`] routes a transaction to one of two paths,
//! depending on the [`WalletMethod`]:
//!
//! - **browser**: the user's browser wallet signs *and broadcasts*; the result
//!   is [`SignTransactionResult::Sent`] with the transaction hash
//! - **delegated** (private key or remote signer): the transaction is prepared
//!   over JSON-RPC and signed without broadcasting; the result is
//!   [`SignTransactionResult::Signed`] with the raw bytes
//!
//! Callers must branch on the result, since only the browser path has
//! submitted anything on-chain.

use crate::types::NetworkConfig;
use crate::{Result, X402Error};
use ethereum_types::{Address, H256, U256};
use std::sync::Arc;

pub mod browser;
pub mod client;
pub mod rpc;
pub mod transaction;

#[cfg(test)]
mod tests;

pub use browser::{BrowserSignRequest, BrowserSignResponse, BrowserWalletBridge};
pub use client::{create_wallet_client, LocalWalletClient, RemoteWalletClient, WalletClient};
pub use rpc::JsonRpcClient;
pub use transaction::LegacyTransaction;

#[cfg(feature = "axum")]
pub use browser::CallbackBridge;

/// How a transaction gets signed
#[derive(Clone, PartialEq, Eq)]
pub enum WalletMethod {
    /// Browser wallet reached through a [`BrowserWalletBridge`]
    Browser,
    /// Hex private key held in process
    PrivateKey { key: String },
    /// JSON-RPC signer exposing `eth_accounts` and `eth_signTransaction`
    RemoteSigner { url: String },
}

impl std::fmt::Debug for WalletMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletMethod::Browser => write!(f, "Browser"),
            WalletMethod::PrivateKey { .. } => write!(f, "PrivateKey {{ key: <redacted> }}"),
            WalletMethod::RemoteSigner { url } => {
                f.debug_struct("RemoteSigner").field("url", url).finish()
            }
        }
    }
}

/// Chain a delegated transaction is prepared for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: u64,
    pub name: String,
    /// Default JSON-RPC node
    pub rpc_url: String,
}

impl Chain {
    pub fn new(id: u64, name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            rpc_url: rpc_url.into(),
        }
    }
}

impl From<NetworkConfig> for Chain {
    fn from(config: NetworkConfig) -> Self {
        Self::new(config.chain_id, config.name, config.rpc_url)
    }
}

/// Transaction to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Vec<u8>,
    /// Gas limit; estimated when absent
    pub gas: Option<U256>,
}

/// Chain parameters required by the browser path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub chain_id: u64,
    pub chain_name: String,
    /// Wallet connection page
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOptions {
    pub browser: Option<BrowserOptions>,
}

/// Input of [`TransactionSigner::sign`]
#[derive(Debug, Clone)]
pub struct SignTransactionParams {
    pub wallet_method: WalletMethod,
    pub tx: TxRequest,
    pub chain: Chain,
    /// Overrides the chain's default RPC node
    pub rpc_url: Option<String>,
    pub options: SignOptions,
}

/// Outcome of signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignTransactionResult {
    /// Signed but not broadcast; raw RLP bytes
    Signed(Vec<u8>),
    /// Broadcast by the browser wallet
    Sent(H256),
}

/// Routes transactions to the browser or a delegated wallet
#[derive(Clone)]
pub struct TransactionSigner {
    browser: Arc<dyn BrowserWalletBridge>,
}

impl TransactionSigner {
    pub fn new(browser: Arc<dyn BrowserWalletBridge>) -> Self {
        Self { browser }
    }

    pub async fn sign(&self, params: SignTransactionParams) -> Result<SignTransactionResult> {
        match &params.wallet_method {
            WalletMethod::Browser => {
                let options = params.options.browser.as_ref().ok_or_else(|| {
                    X402Error::config("Browser wallet requires chainId and chainName parameters")
                })?;
                self.sign_with_browser(&params.tx, options).await
            }
            method @ (WalletMethod::PrivateKey { .. } | WalletMethod::RemoteSigner { .. }) => {
                let raw = sign_with_wallet_client(
                    method,
                    &params.tx,
                    &params.chain,
                    params.rpc_url.as_deref(),
                )
                .await?;
                Ok(SignTransactionResult::Signed(raw))
            }
        }
    }

    async fn sign_with_browser(
        &self,
        tx: &TxRequest,
        options: &BrowserOptions,
    ) -> Result<SignTransactionResult> {
        let response = self
            .browser
            .sign_with_browser(BrowserSignRequest {
                to: tx.to,
                calldata: format!("0x{}", hex::encode(&tx.data)),
                chain_id: options.chain_id,
                chain_name: options.chain_name.clone(),
                uri: options.uri.clone(),
                gas: tx.gas,
            })
            .await?;

        let tx_hash = parse_tx_hash(&response.tx_hash)?;
        tracing::info!("Browser wallet sent transaction {:?}", tx_hash);
        Ok(SignTransactionResult::Sent(tx_hash))
    }
}

async fn sign_with_wallet_client(
    method: &WalletMethod,
    tx: &TxRequest,
    chain: &Chain,
    rpc_url: Option<&str>,
) -> Result<Vec<u8>> {
    let client = create_wallet_client(method, chain, rpc_url).await?;
    let account = client
        .account()
        .ok_or_else(|| X402Error::wallet("Wallet client does not have an account configured"))?;

    let request = client.prepare_transaction_request(account, tx).await?;
    tracing::debug!(
        "Prepared transaction from {:?}: nonce={}, gas={}, gas_price={}",
        account,
        request.nonce,
        request.gas,
        request.gas_price
    );
    client.sign_transaction(&request).await
}

fn parse_tx_hash(tx_hash: &str) -> Result<H256> {
    let invalid = || {
        X402Error::malformed_result(format!(
            "Invalid transaction hash received from browser wallet: {}",
            tx_hash
        ))
    };

    let digits = tx_hash.strip_prefix("0x").ok_or_else(invalid)?;
    let bytes = hex::decode(digits).map_err(|_| invalid())?;
    if bytes.len() != 32 {
        return Err(invalid());
    }
    Ok(H256::from_slice(&bytes))
}
