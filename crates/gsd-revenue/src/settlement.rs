//! Buy-and-burn settlement: quote, build, sign, submit, confirm.
//!
//! Every external step sits behind a trait so the engine can run against
//! the live aggregator and cluster or against in-process fakes.

use std::sync::Arc;

use async_trait::async_trait;
use gsd_core::constants::{BURN_SLIPPAGE_BPS, SOL_MINT, USDC_MINT};
use gsd_core::error::GsdError;
use gsd_core::types::{Amount, Pubkey, RevenueToken};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: Amount,
    pub slippage_bps: u16,
}

/// A venue quote. `raw` is echoed back verbatim when building the swap.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuote {
    pub out_amount: Amount,
    pub raw: serde_json::Value,
}

impl SwapQuote {
    /// `outAmount` is a decimal string; a missing or malformed value
    /// counts as zero.
    pub fn from_response(raw: serde_json::Value) -> Self {
        let out_amount = match &raw["outAmount"] {
            serde_json::Value::String(s) => s.parse().unwrap_or(0),
            serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
            _ => 0,
        };
        Self { out_amount, raw }
    }
}

#[async_trait]
pub trait SwapVenue: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, GsdError>;

    /// Unsigned serialized transaction executing `quote` for `user`.
    async fn build_swap(&self, quote: &SwapQuote, user: &Pubkey) -> Result<Vec<u8>, GsdError>;
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit a signed transaction and return its signature.
    async fn send_transaction(&self, signed: &[u8]) -> Result<String, GsdError>;

    async fn confirm(&self, signature: &str) -> Result<(), GsdError>;
}

pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign a serialized transaction in place of its fee-payer signature.
    fn sign_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>, GsdError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnResult {
    pub signature: String,
    /// Quoted output; the actual fill may differ within slippage.
    pub gsd_burned: Amount,
    pub confirmed: bool,
}

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub gsd_mint: String,
    pub sol_mint: String,
    pub usdc_mint: String,
    pub slippage_bps: u16,
}

impl SettlementConfig {
    pub fn new(gsd_mint: impl Into<String>) -> Self {
        Self {
            gsd_mint: gsd_mint.into(),
            sol_mint: SOL_MINT.to_string(),
            usdc_mint: USDC_MINT.to_string(),
            slippage_bps: BURN_SLIPPAGE_BPS,
        }
    }

    pub fn input_mint(&self, token: RevenueToken) -> &str {
        match token {
            RevenueToken::Sol => &self.sol_mint,
            RevenueToken::Usdc => &self.usdc_mint,
        }
    }
}

pub struct SettlementEngine {
    venue: Arc<dyn SwapVenue>,
    chain: Arc<dyn ChainClient>,
    signer: Arc<dyn TransactionSigner>,
    config: SettlementConfig,
}

impl SettlementEngine {
    pub fn new(
        venue: Arc<dyn SwapVenue>,
        chain: Arc<dyn ChainClient>,
        signer: Arc<dyn TransactionSigner>,
        config: SettlementConfig,
    ) -> Self {
        Self { venue, chain, signer, config }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Swap `amount` of `token` into GSD for burning.
    ///
    /// Returns `None` when quoting, building, signing or submitting fails.
    /// A submitted swap whose confirmation fails is still returned with
    /// `confirmed = false` so the caller can track the signature.
    pub async fn buy_and_burn(&self, token: RevenueToken, amount: Amount) -> Option<BurnResult> {
        match self.execute(token, amount).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(%token, amount, error = %e, "buy-and-burn failed; retry manually");
                None
            }
        }
    }

    async fn execute(&self, token: RevenueToken, amount: Amount) -> Result<BurnResult, GsdError> {
        let request = QuoteRequest {
            input_mint: self.config.input_mint(token).to_string(),
            output_mint: self.config.gsd_mint.clone(),
            amount,
            slippage_bps: self.config.slippage_bps,
        };
        let quote = self.venue.quote(&request).await?;
        let unsigned = self.venue.build_swap(&quote, &self.signer.pubkey()).await?;
        let signed = self.signer.sign_transaction(&unsigned)?;
        let signature = self.chain.send_transaction(&signed).await?;

        let confirmed = match self.chain.confirm(&signature).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%signature, error = %e, "swap sent but not confirmed");
                false
            }
        };
        info!(%signature, gsd_burned = quote.out_amount, confirmed, "buy-and-burn swap submitted");
        Ok(BurnResult { signature, gsd_burned: quote.out_amount, confirmed })
    }
}
