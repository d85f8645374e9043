use gsd_codec::RevenueIx;
use gsd_core::entities::RevenueClaim;
use gsd_core::error::GsdError;
use gsd_core::types::RevenueStatus;
use gsd_revenue::recorded_event;
use gsd_state::StateDb;
use tracing::{debug, info};

use crate::context::TxContext;

pub(super) fn apply(db: &StateDb, ctx: &TxContext, ix: &RevenueIx) -> Result<(), GsdError> {
    match ix {
        RevenueIx::InitConfig => {
            info!(signature = ctx.signature, "revenue config instruction observed");
            Ok(())
        }
        RevenueIx::RecordEvent { event, origin_signature, amount, token } => {
            let draft = recorded_event(origin_signature, Some(event.clone()), *token, *amount, ctx.now);
            let (stored, created) = db.upsert_revenue_event(&draft)?;
            info!(
                signature = ctx.signature,
                origin = %origin_signature,
                event_index = stored.event_index,
                %token,
                total = stored.total_amount,
                developer_pool = stored.developer_pool,
                burn_amount = stored.burn_amount,
                created,
                "revenue event indexed"
            );
            Ok(())
        }
        RevenueIx::ClaimShare { event, claim, claimant, vault } => {
            if db.get_revenue_event_by_address(event)?.is_none() {
                return Err(GsdError::not_found("revenue event", event.clone()));
            }
            // The payout is whatever the vault moved to the claimant in this transaction.
            let amount = vault.as_deref().map(|v| ctx.native_paid(v, claimant)).unwrap_or(0);
            let record = RevenueClaim {
                event_address: event.clone(),
                claimant_wallet: claimant.clone(),
                on_chain_address: claim.clone(),
                contribution_score: 0,
                total_score: 0,
                amount,
                transaction_signature: ctx.signature.to_string(),
                claimed_at: ctx.now,
            };
            if db.record_claim(&record)? {
                info!(signature = ctx.signature, event = %event, claimant = %claimant, amount, "revenue claim indexed");
            } else {
                debug!(event = %event, claimant = %claimant, "claim already indexed");
            }
            Ok(())
        }
        RevenueIx::ExecuteBurn { event, gsd_amount } => {
            let existing = db
                .get_revenue_event_by_address(event)?
                .ok_or_else(|| GsdError::not_found("revenue event", event.clone()))?;
            let updated = db.update_revenue_event(&existing.origin_signature, |e| {
                e.burn_signature = Some(ctx.signature.to_string());
                if let Some(burned) = gsd_amount {
                    e.gsd_burned = *burned;
                }
                e.status = RevenueStatus::Completed;
            })?;
            info!(
                signature = ctx.signature,
                event = %event,
                gsd_burned = updated.map(|e| e.gsd_burned).unwrap_or(0),
                "burn indexed"
            );
            Ok(())
        }
    }
}
