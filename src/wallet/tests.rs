//! Tests for transaction signing

use super::*;
use async_trait::async_trait;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const TEST_PRIVATE_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const TEST_ADDRESS: &str = "2c7536E3605D9C16a7a3D7b1898e529396a65c23";
const REGISTRY: &str = "3535353535353535353535353535353535353535";
const TX_HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

struct MockBridge {
    tx_hash: String,
    calls: AtomicUsize,
    last_request: Mutex<Option<BrowserSignRequest>>,
}

impl MockBridge {
    fn new(tx_hash: &str) -> Arc<Self> {
        Arc::new(Self {
            tx_hash: tx_hash.to_string(),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }
}

#[async_trait]
impl BrowserWalletBridge for MockBridge {
    async fn sign_with_browser(&self, request: BrowserSignRequest) -> crate::Result<BrowserSignResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        Ok(BrowserSignResponse {
            tx_hash: self.tx_hash.clone(),
        })
    }
}

fn address(hex: &str) -> Address {
    Address::from_str(hex).unwrap()
}

fn tx_request(gas: Option<u64>) -> TxRequest {
    TxRequest {
        to: address(REGISTRY),
        data: vec![0xa9, 0x05, 0x9c, 0xbb],
        gas: gas.map(U256::from),
    }
}

fn params(method: WalletMethod, chain: Chain, options: SignOptions) -> SignTransactionParams {
    SignTransactionParams {
        wallet_method: method,
        tx: tx_request(None),
        chain,
        rpc_url: None,
        options,
    }
}

fn browser_options() -> SignOptions {
    SignOptions {
        browser: Some(BrowserOptions {
            chain_id: 84532,
            chain_name: "Base Sepolia".to_string(),
            uri: Some("https://wallet.example.com".to_string()),
        }),
    }
}

async fn mock_rpc(server: &mut ServerGuard, method: &str, result: serde_json::Value) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": method })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
        .create_async()
        .await
}

#[test]
fn test_eip155_signing_vector() {
    let tx = LegacyTransaction {
        nonce: U256::from(9),
        gas_price: U256::from(20_000_000_000u64),
        gas: U256::from(21000),
        to: Some(address(REGISTRY)),
        value: U256::from(1_000_000_000_000_000_000u64),
        data: vec![],
        chain_id: 1,
    };

    assert_eq!(
        format!("{:?}", tx.signing_hash()),
        "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
    );

    let key = secp256k1::SecretKey::from_slice(&[0x46; 32]).unwrap();
    let raw = tx.sign(&key).unwrap();
    assert_eq!(
        hex::encode(&raw),
        "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
    );

    let (decoded, sender) = LegacyTransaction::decode_signed(&raw).unwrap();
    assert_eq!(decoded, tx);
    assert_eq!(
        sender,
        transaction::public_key_address(&secp256k1::PublicKey::from_secret_key(
            secp256k1::SECP256K1,
            &key
        ))
    );
}

#[test]
fn test_oversized_chain_id_is_a_config_error() {
    let tx = LegacyTransaction {
        nonce: U256::zero(),
        gas_price: U256::from(1),
        gas: U256::from(21000),
        to: Some(address(REGISTRY)),
        value: U256::zero(),
        data: vec![],
        chain_id: u64::MAX / 2,
    };

    let key = secp256k1::SecretKey::from_slice(&[0x46; 32]).unwrap();
    let err = tx.sign(&key).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    assert!(err.to_string().contains("chain id too large"));
}

#[test]
fn test_local_wallet_address() {
    let rpc = JsonRpcClient::new("http://localhost:8545").unwrap();
    let chain = Chain::new(84532, "Base Sepolia", "http://localhost:8545");
    let wallet = LocalWalletClient::from_private_key(TEST_PRIVATE_KEY, chain, rpc).unwrap();
    assert_eq!(wallet.address(), address(TEST_ADDRESS));
    assert_eq!(wallet.account(), Some(address(TEST_ADDRESS)));
    assert!(!format!("{:?}", wallet).contains("4c0883a6"));
}

#[test]
fn test_invalid_private_key() {
    let rpc = JsonRpcClient::new("http://localhost:8545").unwrap();
    let chain = Chain::new(1, "Ethereum", "http://localhost:8545");
    let result = LocalWalletClient::from_private_key("0xzz", chain, rpc);
    assert!(matches!(result, Err(X402Error::Config { .. })));
}

#[test]
fn test_chain_from_network_config() {
    let chain = Chain::from(NetworkConfig::base_sepolia());
    assert_eq!(chain.id, 84532);
    assert_eq!(chain.rpc_url, "https://sepolia.base.org");
}

#[tokio::test]
async fn test_browser_path_requires_chain_options() {
    let bridge = MockBridge::new(TX_HASH);
    let signer = TransactionSigner::new(bridge.clone());
    let chain = Chain::from(NetworkConfig::base_sepolia());

    let result = signer
        .sign(params(WalletMethod::Browser, chain, SignOptions::default()))
        .await;

    match result {
        Err(err @ X402Error::Config { .. }) => assert_eq!(
            err.to_string(),
            "Configuration error: Browser wallet requires chainId and chainName parameters"
        ),
        other => panic!("expected configuration error, got {:?}", other),
    }
    assert_eq!(bridge.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_browser_path_returns_sent_hash() {
    let bridge = MockBridge::new(TX_HASH);
    let signer = TransactionSigner::new(bridge.clone());
    let chain = Chain::from(NetworkConfig::base_sepolia());

    let result = signer
        .sign(params(WalletMethod::Browser, chain, browser_options()))
        .await
        .unwrap();

    assert_eq!(
        result,
        SignTransactionResult::Sent(H256::from_str(&TX_HASH[2..]).unwrap())
    );

    let request = bridge.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.calldata, "0xa9059cbb");
    assert_eq!(request.chain_id, 84532);
    assert_eq!(request.chain_name, "Base Sepolia");
    assert_eq!(request.uri.as_deref(), Some("https://wallet.example.com"));
}

#[tokio::test]
async fn test_browser_hash_without_prefix_is_malformed() {
    let signer = TransactionSigner::new(MockBridge::new(&TX_HASH[2..]));
    let chain = Chain::from(NetworkConfig::base_sepolia());

    let result = signer
        .sign(params(WalletMethod::Browser, chain, browser_options()))
        .await;

    match result {
        Err(err) => assert_eq!(err.kind(), crate::ErrorKind::MalformedResult),
        Ok(result) => panic!("expected malformed result, got {:?}", result),
    }
}

#[tokio::test]
async fn test_browser_hash_with_wrong_length_is_malformed() {
    let signer = TransactionSigner::new(MockBridge::new("0x1234"));
    let chain = Chain::from(NetworkConfig::base_sepolia());

    let result = signer
        .sign(params(WalletMethod::Browser, chain, browser_options()))
        .await;
    assert!(matches!(result, Err(X402Error::MalformedResult { .. })));
}

#[tokio::test]
async fn test_private_key_path_signs_without_sending() {
    let mut server = Server::new_async().await;
    let nonce = mock_rpc(&mut server, "eth_getTransactionCount", json!("0x7")).await;
    let gas_price = mock_rpc(&mut server, "eth_gasPrice", json!("0x3b9aca00")).await;
    let estimate = mock_rpc(&mut server, "eth_estimateGas", json!("0xc350")).await;

    let signer = TransactionSigner::new(MockBridge::new(TX_HASH));
    let chain = Chain::new(84532, "Base Sepolia", server.url());
    let method = WalletMethod::PrivateKey {
        key: TEST_PRIVATE_KEY.to_string(),
    };

    let result = signer
        .sign(params(method, chain, SignOptions::default()))
        .await
        .unwrap();

    let raw = match result {
        SignTransactionResult::Signed(raw) => raw,
        other => panic!("expected signed transaction, got {:?}", other),
    };
    let (tx, sender) = LegacyTransaction::decode_signed(&raw).unwrap();
    assert_eq!(sender, address(TEST_ADDRESS));
    assert_eq!(tx.nonce, U256::from(7));
    assert_eq!(tx.gas_price, U256::from(1_000_000_000u64));
    assert_eq!(tx.gas, U256::from(50_000));
    assert_eq!(tx.chain_id, 84532);
    assert_eq!(tx.to, Some(address(REGISTRY)));
    assert_eq!(tx.data, vec![0xa9, 0x05, 0x9c, 0xbb]);

    nonce.assert_async().await;
    gas_price.assert_async().await;
    estimate.assert_async().await;
}

#[tokio::test]
async fn test_given_gas_limit_skips_estimation() {
    let mut server = Server::new_async().await;
    let _nonce = mock_rpc(&mut server, "eth_getTransactionCount", json!("0x0")).await;
    let _gas_price = mock_rpc(&mut server, "eth_gasPrice", json!("0x1")).await;
    let estimate = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": "eth_estimateGas" })))
        .expect(0)
        .create_async()
        .await;

    let rpc = JsonRpcClient::new(server.url()).unwrap();
    let tx = LegacyTransaction::prepare(&rpc, 8453, address(TEST_ADDRESS), &tx_request(Some(90_000)))
        .await
        .unwrap();

    assert_eq!(tx.gas, U256::from(90_000));
    assert_eq!(tx.value, U256::zero());
    estimate.assert_async().await;
}

#[tokio::test]
async fn test_rpc_override_is_used() {
    let mut server = Server::new_async().await;
    let _nonce = mock_rpc(&mut server, "eth_getTransactionCount", json!("0x0")).await;
    let _gas_price = mock_rpc(&mut server, "eth_gasPrice", json!("0x1")).await;
    let _estimate = mock_rpc(&mut server, "eth_estimateGas", json!("0x5208")).await;

    let signer = TransactionSigner::new(MockBridge::new(TX_HASH));
    let mut params = params(
        WalletMethod::PrivateKey {
            key: TEST_PRIVATE_KEY.to_string(),
        },
        Chain::new(84532, "Base Sepolia", "http://127.0.0.1:9"),
        SignOptions::default(),
    );
    params.rpc_url = Some(server.url());

    let result = signer.sign(params).await.unwrap();
    assert!(matches!(result, SignTransactionResult::Signed(_)));
}

#[tokio::test]
async fn test_remote_signer_without_account() {
    let mut server = Server::new_async().await;
    let _accounts = mock_rpc(&mut server, "eth_accounts", json!([])).await;

    let signer = TransactionSigner::new(MockBridge::new(TX_HASH));
    let chain = Chain::new(84532, "Base Sepolia", server.url());
    let method = WalletMethod::RemoteSigner { url: server.url() };

    let result = signer.sign(params(method, chain, SignOptions::default())).await;
    match result {
        Err(err @ X402Error::Wallet { .. }) => assert_eq!(
            err.to_string(),
            "Wallet error: Wallet client does not have an account configured"
        ),
        other => panic!("expected wallet error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_remote_signer_signs() {
    let mut server = Server::new_async().await;
    let _accounts = mock_rpc(&mut server, "eth_accounts", json!([format!("0x{}", TEST_ADDRESS)])).await;
    let _nonce = mock_rpc(&mut server, "eth_getTransactionCount", json!("0x1")).await;
    let _gas_price = mock_rpc(&mut server, "eth_gasPrice", json!("0x1")).await;
    let _estimate = mock_rpc(&mut server, "eth_estimateGas", json!("0x5208")).await;
    let sign = server
        .mock("POST", "/")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "method": "eth_signTransaction" })),
            Matcher::Regex(r#""chainId":"0x14a34""#.to_string()),
            Matcher::Regex(r#""nonce":"0x1""#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 5,
                "result": { "raw": "0xf86b01", "tx": {} }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let signer = TransactionSigner::new(MockBridge::new(TX_HASH));
    let chain = Chain::new(84532, "Base Sepolia", server.url());
    let method = WalletMethod::RemoteSigner { url: server.url() };

    let result = signer
        .sign(params(method, chain, SignOptions::default()))
        .await
        .unwrap();
    assert_eq!(result, SignTransactionResult::Signed(vec![0xf8, 0x6b, 0x01]));
    sign.assert_async().await;
}

#[tokio::test]
async fn test_rpc_error_is_propagated() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "header not found" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let rpc = JsonRpcClient::new(server.url()).unwrap();
    let result: crate::Result<U256> = rpc.call("eth_gasPrice", json!([])).await;
    match result {
        Err(X402Error::Rpc { code, message }) => {
            assert_eq!(code, -32000);
            assert_eq!(message, "header not found");
        }
        other => panic!("expected RPC error, got {:?}", other),
    }
}

#[cfg(feature = "axum")]
mod callback_bridge {
    use super::*;
    use std::time::Duration;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn sign_request() -> BrowserSignRequest {
        BrowserSignRequest {
            to: address(REGISTRY),
            calldata: "0xa9059cbb".to_string(),
            chain_id: 84532,
            chain_name: "Base Sepolia".to_string(),
            uri: None,
            gas: None,
        }
    }

    async fn wait_for_request(client: &reqwest::Client, base: &str) -> serde_json::Value {
        for _ in 0..50 {
            if let Ok(response) = client.get(format!("{}/request", base)).send().await {
                return response.json().await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("callback listener never came up");
    }

    #[tokio::test]
    async fn test_callback_bridge_receives_hash() {
        let port = free_port();
        let bridge = CallbackBridge::new(([127, 0, 0, 1], port).into());
        let pending = tokio::spawn(async move { bridge.sign_with_browser(sign_request()).await });

        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{}", port);
        let request = wait_for_request(&client, &base).await;
        assert_eq!(request["chainId"], 84532);
        assert_eq!(request["calldata"], "0xa9059cbb");

        let status = client
            .post(format!("{}/callback", base))
            .json(&json!({ "txHash": TX_HASH }))
            .send()
            .await
            .unwrap()
            .status();
        assert!(status.is_success());

        let response = pending.await.unwrap().unwrap();
        assert_eq!(response.tx_hash, TX_HASH);
    }

    #[tokio::test]
    async fn test_callback_bridge_reports_wallet_error() {
        let port = free_port();
        let bridge = CallbackBridge::new(([127, 0, 0, 1], port).into());
        let pending = tokio::spawn(async move { bridge.sign_with_browser(sign_request()).await });

        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{}", port);
        wait_for_request(&client, &base).await;
        client
            .post(format!("{}/callback", base))
            .json(&json!({ "error": "User rejected the request" }))
            .send()
            .await
            .unwrap();

        match pending.await.unwrap() {
            Err(X402Error::BrowserWallet { message }) => {
                assert_eq!(message, "User rejected the request")
            }
            other => panic!("expected browser wallet error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_callback_bridge_times_out() {
        let bridge = CallbackBridge::default().with_timeout(Duration::from_millis(50));
        let result = bridge.sign_with_browser(sign_request()).await;
        assert!(matches!(result, Err(X402Error::BrowserWallet { .. })));
    }
}
