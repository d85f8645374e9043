//! One processor per program domain. Each looks up by natural key and
//! upserts, touching only the fields its instruction is authoritative for.
//! Referential misses surface as `GsdError::NotFound`.

mod contribution;
mod delegation;
mod governance;
mod revenue;
mod verification;

use gsd_codec::Instruction;
use gsd_core::error::GsdError;
use gsd_state::StateDb;

use crate::context::TxContext;

pub(crate) use contribution::record_leaf;

pub(crate) fn apply(db: &StateDb, ctx: &TxContext, index: usize, ix: &Instruction) -> Result<(), GsdError> {
    match ix {
        Instruction::Governance(ix) => governance::apply(db, ctx, index, ix),
        Instruction::Delegation(ix) => delegation::apply(db, ctx, ix),
        Instruction::Revenue(ix) => revenue::apply(db, ctx, ix),
        Instruction::Verification(ix) => verification::apply(db, ctx, ix),
        Instruction::Contribution(ix) => contribution::apply(ctx, ix),
    }
}
