use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gsd_core::error::GsdError;
use gsd_core::types::Pubkey;
use serde::Deserialize;

use crate::settlement::{QuoteRequest, SwapQuote, SwapVenue};

pub const DEFAULT_JUPITER_URL: &str = "https://api.jup.ag/swap/v1";

/// Priority fee cap attached to burn swaps.
const MAX_PRIORITY_LAMPORTS: u64 = 500_000;

/// Jupiter swap aggregator over HTTP.
pub struct JupiterClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
}

impl JupiterClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn with_key(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

async fn error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("{status}: {body}")
}

#[async_trait]
impl SwapVenue for JupiterClient {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, GsdError> {
        let req = self.client.get(format!("{}/quote", self.base_url)).query(&[
            ("inputMint", request.input_mint.clone()),
            ("outputMint", request.output_mint.clone()),
            ("amount", request.amount.to_string()),
            ("slippageBps", request.slippage_bps.to_string()),
        ]);
        let resp = self
            .with_key(req)
            .send()
            .await
            .map_err(|e| GsdError::Quote(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GsdError::Quote(error_body(resp).await));
        }
        let raw: serde_json::Value = resp.json().await.map_err(|e| GsdError::Quote(e.to_string()))?;
        Ok(SwapQuote::from_response(raw))
    }

    async fn build_swap(&self, quote: &SwapQuote, user: &Pubkey) -> Result<Vec<u8>, GsdError> {
        let body = serde_json::json!({
            "quoteResponse": quote.raw,
            "userPublicKey": user.to_b58(),
            "dynamicComputeUnitLimit": true,
            "dynamicSlippage": true,
            "prioritizationFeeLamports": {
                "priorityLevelWithMaxLamports": {
                    "maxLamports": MAX_PRIORITY_LAMPORTS,
                    "priorityLevel": "high"
                }
            }
        });
        let req = self.client.post(format!("{}/swap", self.base_url)).json(&body);
        let resp = self
            .with_key(req)
            .send()
            .await
            .map_err(|e| GsdError::SwapBuild(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GsdError::SwapBuild(error_body(resp).await));
        }
        let swap: SwapResponse = resp.json().await.map_err(|e| GsdError::SwapBuild(e.to_string()))?;
        STANDARD
            .decode(swap.swap_transaction)
            .map_err(|e| GsdError::SwapBuild(format!("swapTransaction is not base64: {e}")))
    }
}
