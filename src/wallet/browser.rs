//! Browser wallet signing
//!
//! The browser path hands the transaction to a wallet running in the user's
//! browser; the wallet signs *and* broadcasts, so only a transaction hash
//! comes back.

use crate::Result;
use async_trait::async_trait;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Transaction handed to a browser wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSignRequest {
    /// Target contract address
    pub to: Address,
    /// Hex encoded call data (`0x`-prefixed)
    pub calldata: String,
    pub chain_id: u64,
    pub chain_name: String,
    /// Wallet connection page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
}

/// Reply of a browser wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSignResponse {
    /// Hash of the broadcast transaction, as reported by the wallet
    pub tx_hash: String,
}

/// Transport to a wallet running in the user's browser
#[async_trait]
pub trait BrowserWalletBridge: Send + Sync {
    async fn sign_with_browser(&self, request: BrowserSignRequest) -> Result<BrowserSignResponse>;
}

#[cfg(feature = "axum")]
pub use callback::CallbackBridge;

#[cfg(feature = "axum")]
mod callback {
    use super::{BrowserSignRequest, BrowserSignResponse, BrowserWalletBridge};
    use crate::{Result, X402Error};
    use async_trait::async_trait;
    use axum::{
        extract::State,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde::Deserialize;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Body posted by the wallet page to `/callback`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CallbackPayload {
        #[serde(default)]
        tx_hash: Option<String>,
        #[serde(default)]
        error: Option<String>,
    }

    #[derive(Clone)]
    struct CallbackState {
        request: Arc<BrowserSignRequest>,
        sender: Arc<Mutex<Option<oneshot::Sender<CallbackPayload>>>>,
    }

    /// Browser bridge served from a short-lived local HTTP listener
    ///
    /// While a signature is pending the listener serves:
    ///
    /// - `GET /request`: the [`BrowserSignRequest`] as JSON
    /// - `POST /callback`: `{"txHash": "0x..."}` or `{"error": "..."}`
    ///
    /// The user opens the request `uri` with a `callback` query parameter
    /// pointing at the listener (or the listener's `/request` directly when no
    /// `uri` is given).
    #[derive(Debug, Clone)]
    pub struct CallbackBridge {
        bind_address: SocketAddr,
        timeout: Option<Duration>,
    }

    impl Default for CallbackBridge {
        fn default() -> Self {
            Self::new(SocketAddr::from(([127, 0, 0, 1], 0)))
        }
    }

    impl CallbackBridge {
        pub fn new(bind_address: SocketAddr) -> Self {
            Self {
                bind_address,
                timeout: None,
            }
        }

        /// Give up waiting for the wallet after `timeout`
        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }
    }

    async fn pending_request(State(state): State<CallbackState>) -> Json<BrowserSignRequest> {
        Json(state.request.as_ref().clone())
    }

    async fn receive_callback(
        State(state): State<CallbackState>,
        Json(payload): Json<CallbackPayload>,
    ) -> StatusCode {
        let sender = state.sender.lock().ok().and_then(|mut sender| sender.take());
        let Some(sender) = sender else {
            return StatusCode::CONFLICT;
        };
        match sender.send(payload) {
            Ok(()) => StatusCode::OK,
            Err(_) => StatusCode::CONFLICT,
        }
    }

    fn open_url(uri: Option<&str>, local: SocketAddr) -> Result<String> {
        match uri {
            Some(uri) => {
                let mut url = url::Url::parse(uri)?;
                url.query_pairs_mut()
                    .append_pair("callback", &format!("http://{}", local));
                Ok(url.to_string())
            }
            None => Ok(format!("http://{}/request", local)),
        }
    }

    #[async_trait]
    impl BrowserWalletBridge for CallbackBridge {
        async fn sign_with_browser(
            &self,
            request: BrowserSignRequest,
        ) -> Result<BrowserSignResponse> {
            let listener = TcpListener::bind(self.bind_address).await?;
            let local = listener.local_addr()?;
            let url = open_url(request.uri.as_deref(), local)?;

            let (sender, receiver) = oneshot::channel();
            let state = CallbackState {
                request: Arc::new(request),
                sender: Arc::new(Mutex::new(Some(sender))),
            };
            let app = Router::new()
                .route("/request", get(pending_request))
                .route("/callback", post(receive_callback))
                .with_state(state);

            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            let server = tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
            });

            tracing::info!("Open {} to sign the transaction with your browser wallet", url);

            let received = match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, receiver).await.map_err(|_| {
                    X402Error::browser_wallet(format!(
                        "Timed out after {:?} waiting for the browser wallet",
                        timeout
                    ))
                }),
                None => Ok(receiver.await),
            };

            let _ = shutdown_tx.send(());
            if let Ok(Err(e)) = server.await {
                tracing::warn!("Browser callback listener failed: {}", e);
            }

            let payload = received?.map_err(|_| {
                X402Error::browser_wallet("Browser callback closed without a result")
            })?;

            match payload {
                CallbackPayload {
                    tx_hash: Some(tx_hash),
                    ..
                } => Ok(BrowserSignResponse { tx_hash }),
                CallbackPayload {
                    error: Some(error), ..
                } => Err(X402Error::browser_wallet(error)),
                _ => Err(X402Error::malformed_result(
                    "Browser callback carried neither a transaction hash nor an error",
                )),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_open_url_appends_callback() {
            let local = SocketAddr::from(([127, 0, 0, 1], 4455));
            let url = open_url(Some("https://wallet.example.com/sign?ref=cli"), local).unwrap();
            assert_eq!(
                url,
                "https://wallet.example.com/sign?ref=cli&callback=http%3A%2F%2F127.0.0.1%3A4455"
            );
            assert_eq!(open_url(None, local).unwrap(), "http://127.0.0.1:4455/request");
        }
    }
}
