use gsd_core::constants::USDC_BASE_UNITS;
use gsd_core::entities::PendingRevenue;
use gsd_core::error::GsdError;
use gsd_core::notification::EnhancedTransaction;
use gsd_core::types::{Amount, RevenueToken};
use gsd_state::StateDb;
use tracing::info;

use crate::config::IndexerConfig;
use crate::context::TxContext;

/// A treasury inflow found in a transaction's transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflow {
    pub token: RevenueToken,
    pub amount: Amount,
}

/// Larger of the SOL and USDC amounts sent to `treasury`. Ties go to SOL.
pub fn detect_inflow(tx: &EnhancedTransaction, treasury: &str, usdc_mint: &str) -> Option<Inflow> {
    let sol: u64 = tx
        .native_transfers
        .iter()
        .filter(|t| t.to_user_account.as_deref() == Some(treasury) && t.amount > 0)
        .fold(0, |acc, t| acc.saturating_add(t.amount));

    let usdc: u64 = tx
        .token_transfers
        .iter()
        .filter(|t| {
            t.to_user_account.as_deref() == Some(treasury) && t.mint == usdc_mint && t.token_amount > 0.0
        })
        .fold(0, |acc, t| acc.saturating_add((t.token_amount * USDC_BASE_UNITS).round() as u64));

    match (sol, usdc) {
        (0, 0) => None,
        (s, u) if s >= u => Some(Inflow { token: RevenueToken::Sol, amount: s }),
        (_, u) => Some(Inflow { token: RevenueToken::Usdc, amount: u }),
    }
}

/// Source of the first native transfer.
pub fn sender(tx: &EnhancedTransaction) -> Option<String> {
    tx.native_transfers.first().and_then(|t| t.from_user_account.clone())
}

/// Record an inflow as pending revenue. Returns `true` when an inflow was
/// detected, whether or not it was already stored.
pub(crate) fn record_inflow(db: &StateDb, config: &IndexerConfig, ctx: &TxContext) -> Result<bool, GsdError> {
    let Some(treasury) = config.treasury_address.as_deref() else {
        return Ok(false);
    };
    let Some(inflow) = detect_inflow(ctx.tx, treasury, &config.usdc_mint) else {
        return Ok(false);
    };
    let pending = PendingRevenue {
        transaction_signature: ctx.signature.to_string(),
        token: inflow.token,
        amount: inflow.amount,
        from_wallet: sender(ctx.tx),
        detected_at: ctx.now,
        promoted: false,
    };
    if db.insert_pending_revenue(&pending)? {
        info!(signature = ctx.signature, token = %inflow.token, amount = inflow.amount, "treasury inflow detected");
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsd_core::constants::USDC_MINT;
    use gsd_core::notification::{NativeTransfer, TokenTransfer};

    const TREASURY: &str = "Treasury1111111111111111111111111111111111";

    fn native(from: &str, to: &str, amount: u64) -> NativeTransfer {
        NativeTransfer { from_user_account: Some(from.into()), to_user_account: Some(to.into()), amount }
    }

    fn usdc(to: &str, amount: f64) -> TokenTransfer {
        TokenTransfer {
            from_user_account: Some("payer".into()),
            to_user_account: Some(to.into()),
            mint: USDC_MINT.into(),
            token_amount: amount,
        }
    }

    #[test]
    fn sums_native_transfers_to_treasury() {
        let tx = EnhancedTransaction {
            native_transfers: vec![native("a", TREASURY, 500), native("b", TREASURY, 250), native("a", "else", 9)],
            ..Default::default()
        };
        assert_eq!(
            detect_inflow(&tx, TREASURY, USDC_MINT),
            Some(Inflow { token: RevenueToken::Sol, amount: 750 })
        );
        assert_eq!(sender(&tx).as_deref(), Some("a"));
    }

    #[test]
    fn usdc_scaled_and_compared() {
        let tx = EnhancedTransaction {
            native_transfers: vec![native("a", TREASURY, 5_000)],
            token_transfers: vec![usdc(TREASURY, 1.5), usdc("other", 100.0)],
            ..Default::default()
        };
        assert_eq!(
            detect_inflow(&tx, TREASURY, USDC_MINT),
            Some(Inflow { token: RevenueToken::Usdc, amount: 1_500_000 })
        );
    }

    #[test]
    fn wrong_mint_and_zero_amounts_ignored() {
        let mut wrong = usdc(TREASURY, 10.0);
        wrong.mint = "SomeOtherMint".into();
        let tx = EnhancedTransaction {
            native_transfers: vec![native("a", TREASURY, 0)],
            token_transfers: vec![wrong],
            ..Default::default()
        };
        assert_eq!(detect_inflow(&tx, TREASURY, USDC_MINT), None);
    }
}
