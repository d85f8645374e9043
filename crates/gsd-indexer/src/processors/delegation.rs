use gsd_codec::DelegationIx;
use gsd_core::entities::DelegationRecord;
use gsd_core::error::GsdError;
use gsd_state::StateDb;
use tracing::info;

use crate::context::TxContext;

pub(super) fn apply(db: &StateDb, ctx: &TxContext, ix: &DelegationIx) -> Result<(), GsdError> {
    match ix {
        DelegationIx::DelegateVote { record, delegator, delegate, amount } => {
            // Delegations take effect from the round that is live when they land.
            let effective_from_round = db.latest_active_round_index()?.unwrap_or(0);
            let rec = DelegationRecord {
                on_chain_address: record.clone(),
                delegator_wallet: delegator.clone(),
                delegate_wallet: delegate.clone(),
                delegated_amount: *amount,
                is_active: true,
                effective_from_round,
                delegated_at: ctx.now,
                revoked_at: None,
                transaction_signature: ctx.signature.to_string(),
            };
            let created = db.upsert_delegation(&rec)?;
            info!(
                signature = ctx.signature,
                delegator = %delegator,
                delegate = %delegate,
                amount,
                effective_from_round,
                created,
                "delegation indexed"
            );
            Ok(())
        }
        DelegationIx::RevokeDelegation { delegator } => {
            let rec = db
                .revoke_delegation(delegator, ctx.now)?
                .ok_or_else(|| GsdError::not_found("delegation", delegator.clone()))?;
            info!(signature = ctx.signature, delegator = %delegator, record = %rec.on_chain_address, "delegation revoked");
            Ok(())
        }
    }
}
