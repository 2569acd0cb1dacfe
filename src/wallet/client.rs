//! Delegated wallet clients: a local private key or a remote JSON-RPC signer

use super::rpc::JsonRpcClient;
use super::transaction::{public_key_address, LegacyTransaction};
use super::{Chain, TxRequest, WalletMethod};
use crate::{Result, X402Error};
use async_trait::async_trait;
use ethereum_types::Address;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use serde_json::{json, Value};

/// Wallet able to sign transactions without broadcasting them
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Signing account, if the wallet has one
    fn account(&self) -> Option<Address>;

    /// Fill nonce and gas for a transaction sent from `from`
    async fn prepare_transaction_request(
        &self,
        from: Address,
        tx: &TxRequest,
    ) -> Result<LegacyTransaction>;

    /// Sign a prepared transaction; returns the raw RLP bytes
    async fn sign_transaction(&self, tx: &LegacyTransaction) -> Result<Vec<u8>>;
}

/// Wallet backed by a private key held in process
#[derive(Clone)]
pub struct LocalWalletClient {
    key: SecretKey,
    address: Address,
    chain: Chain,
    rpc: JsonRpcClient,
}

impl std::fmt::Debug for LocalWalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWalletClient")
            .field("address", &self.address)
            .field("chain", &self.chain)
            .field("rpc", &self.rpc.url())
            .finish()
    }
}

impl LocalWalletClient {
    /// Create from a hex private key (`0x` prefix optional)
    pub fn from_private_key(private_key: &str, chain: Chain, rpc: JsonRpcClient) -> Result<Self> {
        let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
            .map_err(|_| X402Error::config("Invalid hex private key"))?;
        let key = SecretKey::from_slice(&bytes)
            .map_err(|_| X402Error::config("Invalid private key"))?;
        let address = public_key_address(&PublicKey::from_secret_key(SECP256K1, &key));

        Ok(Self {
            key,
            address,
            chain,
            rpc,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl WalletClient for LocalWalletClient {
    fn account(&self) -> Option<Address> {
        Some(self.address)
    }

    async fn prepare_transaction_request(
        &self,
        from: Address,
        tx: &TxRequest,
    ) -> Result<LegacyTransaction> {
        LegacyTransaction::prepare(&self.rpc, self.chain.id, from, tx).await
    }

    async fn sign_transaction(&self, tx: &LegacyTransaction) -> Result<Vec<u8>> {
        if tx.chain_id != self.chain.id {
            return Err(X402Error::wallet(format!(
                "Transaction targets chain {} but the wallet is on {}",
                tx.chain_id, self.chain.id
            )));
        }
        tx.sign(&self.key)
    }
}

/// Wallet whose keys live behind a JSON-RPC signer (`eth_signTransaction`)
#[derive(Debug, Clone)]
pub struct RemoteWalletClient {
    account: Option<Address>,
    chain: Chain,
    signer: JsonRpcClient,
    rpc: JsonRpcClient,
}

impl RemoteWalletClient {
    /// Connect to `signer`, taking its first account (if any)
    pub async fn connect(signer: JsonRpcClient, chain: Chain, rpc: JsonRpcClient) -> Result<Self> {
        let accounts: Vec<Address> = signer.call("eth_accounts", json!([])).await?;
        let account = accounts.first().copied();
        tracing::debug!("Remote signer {} account: {:?}", signer.url(), account);

        Ok(Self {
            account,
            chain,
            signer,
            rpc,
        })
    }
}

#[async_trait]
impl WalletClient for RemoteWalletClient {
    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn prepare_transaction_request(
        &self,
        from: Address,
        tx: &TxRequest,
    ) -> Result<LegacyTransaction> {
        LegacyTransaction::prepare(&self.rpc, self.chain.id, from, tx).await
    }

    async fn sign_transaction(&self, tx: &LegacyTransaction) -> Result<Vec<u8>> {
        let from = self
            .account
            .ok_or_else(|| X402Error::wallet("Wallet client does not have an account configured"))?;

        let signed: Value = self
            .signer
            .call(
                "eth_signTransaction",
                json!([{
                    "from": from,
                    "to": tx.to,
                    "nonce": tx.nonce,
                    "gasPrice": tx.gas_price,
                    "gas": tx.gas,
                    "value": tx.value,
                    "data": format!("0x{}", hex::encode(&tx.data)),
                    "chainId": format!("{:#x}", tx.chain_id),
                }]),
            )
            .await?;

        // Signers answer either the raw hex or `{ raw, tx }`
        let raw = match &signed {
            Value::String(raw) => raw.as_str(),
            Value::Object(object) => object
                .get("raw")
                .and_then(Value::as_str)
                .ok_or_else(|| X402Error::malformed_result("Signed transaction lacks 'raw'"))?,
            _ => {
                return Err(X402Error::malformed_result(
                    "Unexpected eth_signTransaction result",
                ))
            }
        };

        hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| X402Error::malformed_result(format!("Invalid raw transaction hex: {}", e)))
    }
}

/// Build the wallet client for a delegated wallet method
///
/// `rpc_url` overrides the chain's default node URL.
pub async fn create_wallet_client(
    method: &WalletMethod,
    chain: &Chain,
    rpc_url: Option<&str>,
) -> Result<Box<dyn WalletClient>> {
    let rpc = JsonRpcClient::new(rpc_url.unwrap_or(&chain.rpc_url))?;

    match method {
        WalletMethod::PrivateKey { key } => Ok(Box::new(LocalWalletClient::from_private_key(
            key,
            chain.clone(),
            rpc,
        )?)),
        WalletMethod::RemoteSigner { url } => {
            let signer = JsonRpcClient::new(url.as_str())?;
            Ok(Box::new(
                RemoteWalletClient::connect(signer, chain.clone(), rpc).await?,
            ))
        }
        WalletMethod::Browser => Err(X402Error::config(
            "Browser wallets sign through a browser bridge, not a wallet client",
        )),
    }
}
