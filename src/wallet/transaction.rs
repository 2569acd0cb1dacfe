//! Legacy (EIP-155) Ethereum transactions

use super::rpc::JsonRpcClient;
use super::TxRequest;
use crate::{Result, X402Error};
use ethereum_types::{Address, H256, U256};
use rlp::{Rlp, RlpStream};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use serde_json::json;

/// Unsigned legacy transaction with EIP-155 replay protection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas: U256,
    /// Recipient; `None` for contract creation
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    /// Fill nonce, gas price and gas limit for `tx` from the node at `rpc`
    ///
    /// The nonce counts pending transactions; the gas limit is estimated unless
    /// `tx.gas` is set.
    pub async fn prepare(
        rpc: &JsonRpcClient,
        chain_id: u64,
        from: Address,
        tx: &TxRequest,
    ) -> Result<Self> {
        let nonce: U256 = rpc
            .call("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price: U256 = rpc.call("eth_gasPrice", json!([])).await?;

        let gas = match tx.gas {
            Some(gas) => gas,
            None => {
                rpc.call(
                    "eth_estimateGas",
                    json!([{
                        "from": from,
                        "to": tx.to,
                        "data": format!("0x{}", hex::encode(&tx.data)),
                    }]),
                )
                .await?
            }
        };

        Ok(Self {
            nonce,
            gas_price,
            gas,
            to: Some(tx.to),
            value: U256::zero(),
            data: tx.data.clone(),
            chain_id,
        })
    }

    fn rlp_base(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas);
        match &self.to {
            Some(to) => stream.append(to),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// Hash signed over: `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`
    pub fn signing_hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(9);
        self.rlp_base(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        H256::from(keccak256(&stream.out()))
    }

    /// Sign with `key` and return the RLP-encoded raw transaction
    pub fn sign(&self, key: &SecretKey) -> Result<Vec<u8>> {
        let message = Message::from_digest_slice(self.signing_hash().as_bytes())
            .map_err(|_| X402Error::invalid_signature("Invalid message hash"))?;
        let (recovery_id, compact) = SECP256K1
            .sign_ecdsa_recoverable(&message, key)
            .serialize_compact();

        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|id| id.checked_add(35 + recovery_id.to_i32() as u64))
            .ok_or_else(|| X402Error::config("chain id too large for EIP-155"))?;
        let r = U256::from_big_endian(&compact[..32]);
        let s = U256::from_big_endian(&compact[32..]);

        let mut stream = RlpStream::new_list(9);
        self.rlp_base(&mut stream);
        stream.append(&v);
        stream.append(&r);
        stream.append(&s);
        Ok(stream.out().to_vec())
    }

    /// Decode a signed raw transaction and recover its sender
    pub fn decode_signed(raw: &[u8]) -> Result<(Self, Address)> {
        let rlp = Rlp::new(raw);
        let malformed = |e: rlp::DecoderError| {
            X402Error::malformed_result(format!("Invalid raw transaction: {}", e))
        };

        if rlp.item_count().map_err(malformed)? != 9 {
            return Err(X402Error::malformed_result(
                "Raw legacy transaction must have 9 fields",
            ));
        }

        let to_item = rlp.at(3).map_err(malformed)?;
        let to = if to_item.is_empty() {
            None
        } else {
            Some(to_item.as_val::<Address>().map_err(malformed)?)
        };

        let v: u64 = rlp.val_at(6).map_err(malformed)?;
        if v < 35 {
            return Err(X402Error::invalid_signature(
                "Transaction is not EIP-155 protected",
            ));
        }
        let chain_id = (v - 35) / 2;
        let recovery_id = ((v - 35) % 2) as i32;

        let tx = Self {
            nonce: rlp.val_at(0).map_err(malformed)?,
            gas_price: rlp.val_at(1).map_err(malformed)?,
            gas: rlp.val_at(2).map_err(malformed)?,
            to,
            value: rlp.val_at(4).map_err(malformed)?,
            data: rlp.val_at(5).map_err(malformed)?,
            chain_id,
        };

        let r: U256 = rlp.val_at(7).map_err(malformed)?;
        let s: U256 = rlp.val_at(8).map_err(malformed)?;
        let mut compact = [0u8; 64];
        r.to_big_endian(&mut compact[..32]);
        s.to_big_endian(&mut compact[32..]);

        let recovery_id = RecoveryId::from_i32(recovery_id)
            .map_err(|_| X402Error::invalid_signature("Invalid recovery ID"))?;
        let signature = RecoverableSignature::from_compact(&compact, recovery_id)
            .map_err(|_| X402Error::invalid_signature("Invalid signature format"))?;
        let message = Message::from_digest_slice(tx.signing_hash().as_bytes())
            .map_err(|_| X402Error::invalid_signature("Invalid message hash"))?;
        let public_key = SECP256K1
            .recover_ecdsa(&message, &signature)
            .map_err(|_| X402Error::invalid_signature("Failed to recover public key"))?;

        Ok((tx, public_key_address(&public_key)))
    }
}

/// Ethereum address of a public key: last 20 bytes of keccak256 of its uncompressed form
pub fn public_key_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

/// Keccak-256 hash function
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    Keccak256::digest(data).into()
}
