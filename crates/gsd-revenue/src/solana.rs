use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gsd_core::error::GsdError;
use tracing::debug;

use crate::settlement::ChainClient;

pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Minimal Solana JSON-RPC client for submitting and confirming swaps.
pub struct SolanaRpcClient {
    url: String,
    client: reqwest::Client,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl SolanaRpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_confirm_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Call a JSON-RPC method and return the `result` field.
    async fn call(&self, method: &str, params: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("connecting to cluster at {}", self.url))?;

        let json: serde_json::Value = resp.json().await.context("parsing RPC response")?;

        if let Some(err) = json.get("error") {
            bail!("RPC error: {}", err);
        }

        Ok(json["result"].clone())
    }

    /// One status check: `Some(Ok)` when confirmed, `Some(Err)` when the
    /// transaction failed on-chain, `None` while still pending.
    async fn poll_status(&self, signature: &str) -> anyhow::Result<Option<Result<(), String>>> {
        let result = self
            .call(
                "getSignatureStatuses",
                serde_json::json!([[signature], {"searchTransactionHistory": true}]),
            )
            .await?;
        let status = &result["value"][0];
        if status.is_null() {
            return Ok(None);
        }
        if !status["err"].is_null() {
            return Ok(Some(Err(status["err"].to_string())));
        }
        match status["confirmationStatus"].as_str() {
            Some("confirmed") | Some("finalized") => Ok(Some(Ok(()))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ChainClient for SolanaRpcClient {
    async fn send_transaction(&self, signed: &[u8]) -> Result<String, GsdError> {
        let result = self
            .call(
                "sendTransaction",
                serde_json::json!([STANDARD.encode(signed), {"encoding": "base64", "skipPreflight": true}]),
            )
            .await
            .map_err(|e| GsdError::Submit(format!("{e:#}")))?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GsdError::Submit(format!("unexpected sendTransaction result: {result}")))
    }

    async fn confirm(&self, signature: &str) -> Result<(), GsdError> {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;
        loop {
            match self.poll_status(signature).await {
                Ok(Some(Ok(()))) => return Ok(()),
                Ok(Some(Err(err))) => return Err(GsdError::Confirm(format!("transaction failed: {err}"))),
                Ok(None) => {}
                Err(e) => debug!(%signature, error = %format!("{e:#}"), "status poll failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(GsdError::Confirm(format!(
                    "not confirmed within {}s",
                    self.confirm_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fast(client: SolanaRpcClient) -> SolanaRpcClient {
        client.with_confirm_timing(Duration::from_millis(300), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn sends_base64_and_polls_until_confirmed() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let app = Router::new().route(
            "/",
            post(move |Json(body): Json<serde_json::Value>| {
                let counter = counter.clone();
                async move {
                    let result = match body["method"].as_str().unwrap() {
                        "sendTransaction" => {
                            assert_eq!(body["params"][0], STANDARD.encode([9u8, 9]));
                            assert_eq!(body["params"][1]["skipPreflight"], true);
                            serde_json::json!("5igSig")
                        }
                        "getSignatureStatuses" => {
                            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                                serde_json::json!({"value": [null]})
                            } else {
                                serde_json::json!({"value": [{"err": null, "confirmationStatus": "confirmed"}]})
                            }
                        }
                        other => panic!("unexpected method {other}"),
                    };
                    Json(serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": result}))
                }
            }),
        );
        let client = fast(SolanaRpcClient::new(&serve(app).await));
        let sig = client.send_transaction(&[9, 9]).await.unwrap();
        assert_eq!(sig, "5igSig");
        client.confirm(&sig).await.unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rpc_error_and_timeout() {
        let app = Router::new().route(
            "/",
            post(|Json(body): Json<serde_json::Value>| async move {
                if body["method"] == "sendTransaction" {
                    Json(serde_json::json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32002, "message": "blockhash not found"}}))
                } else {
                    Json(serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {"value": [null]}}))
                }
            }),
        );
        let client = fast(SolanaRpcClient::new(&serve(app).await));
        assert!(matches!(client.send_transaction(&[1]).await, Err(GsdError::Submit(_))));
        assert!(matches!(client.confirm("sig").await, Err(GsdError::Confirm(_))));
    }
}
