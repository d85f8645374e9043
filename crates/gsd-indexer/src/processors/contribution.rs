use gsd_codec::{decode_base58, ContributionIx, ContributionLeaf};
use gsd_core::entities::Contribution;
use gsd_core::error::GsdError;
use gsd_state::StateDb;
use tracing::{debug, info};

use crate::config::IndexerConfig;
use crate::context::TxContext;

pub(super) fn apply(ctx: &TxContext, ix: &ContributionIx) -> Result<(), GsdError> {
    match ix {
        ContributionIx::InitTree => info!(signature = ctx.signature, "contribution tree initialized"),
        // The leaf is picked up from the noop inner instruction by `record_leaf`.
        ContributionIx::Record { tree } => {
            debug!(signature = ctx.signature, tree = tree.as_deref().unwrap_or("unknown"), "record_contribution seen")
        }
    }
    Ok(())
}

/// Record the first contribution leaf logged through the noop program
/// under one of the program's instructions. Returns `true` when a new
/// contribution was stored.
pub(crate) fn record_leaf(db: &StateDb, config: &IndexerConfig, ctx: &TxContext) -> Result<bool, GsdError> {
    for ix in ctx.tx.instructions.iter().filter(|ix| ix.program_id == config.program_id) {
        for inner in ix.inner_instructions.iter().filter(|i| i.program_id == config.noop_program_id) {
            let Ok(bytes) = decode_base58(&inner.data) else {
                continue;
            };
            let Some(leaf) = ContributionLeaf::parse(&bytes) else {
                continue;
            };
            let contribution = Contribution {
                transaction_signature: ctx.signature.to_string(),
                wallet_address: leaf.developer.to_b58(),
                task_ref: hex::encode(leaf.task_ref),
                verification_score: leaf.verification_score,
                content_hash: hex::encode(leaf.content_hash),
                leaf_hash: hex::encode(leaf.leaf_hash),
                tree_address: ix.accounts.get(1).cloned().unwrap_or_else(|| "unknown".to_string()),
                timestamp: leaf.timestamp,
            };
            let created = db.insert_contribution(&contribution)?;
            if created {
                info!(
                    signature = ctx.signature,
                    wallet = %contribution.wallet_address,
                    score = contribution.verification_score,
                    tree = %contribution.tree_address,
                    "contribution indexed"
                );
            }
            return Ok(created);
        }
    }
    Ok(false)
}
