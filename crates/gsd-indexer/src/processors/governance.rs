use gsd_codec::GovernanceIx;
use gsd_core::constants::VOTE_TIMELOCK_SECS;
use gsd_core::entities::{Idea, IdeaRound, Vote, VoteDeposit};
use gsd_core::error::GsdError;
use gsd_core::types::{IdeaStatus, RoundStatus};
use gsd_state::{StateDb, TransitionOutcome};
use tracing::{debug, info};

use crate::context::TxContext;

pub(super) fn apply(db: &StateDb, ctx: &TxContext, index: usize, ix: &GovernanceIx) -> Result<(), GsdError> {
    match ix {
        GovernanceIx::InitConfig | GovernanceIx::UpdateConfig => {
            info!(signature = ctx.signature, "governance config instruction observed");
            Ok(())
        }
        GovernanceIx::CreateRound {
            round,
            submission_start,
            submission_end,
            voting_end,
            quorum_type,
            content_hash,
        } => {
            let record = IdeaRound {
                round_index: 0,
                on_chain_address: round.clone(),
                status: RoundStatus::Open,
                submission_start: *submission_start,
                submission_end: *submission_end,
                voting_end: *voting_end,
                quorum_type: *quorum_type,
                content_hash: hex::encode(content_hash),
                idea_count: 0,
                transaction_signature: ctx.signature.to_string(),
                created_at: ctx.now,
            };
            let created = db.upsert_round(&record)?;
            info!(signature = ctx.signature, round = %round, created, "round indexed");
            Ok(())
        }
        GovernanceIx::SubmitIdea { round, idea, author, content_hash } => {
            let record = Idea {
                idea_index: 0,
                on_chain_address: idea.clone(),
                round_address: round.clone(),
                author_wallet: author.clone(),
                content_hash: hex::encode(content_hash),
                status: IdeaStatus::Submitted,
                yes_weight: 0,
                no_weight: 0,
                abstain_weight: 0,
                voter_count: 0,
                transaction_signature: ctx.signature.to_string(),
                created_at: ctx.now,
            };
            match db.insert_idea(&record)? {
                Some(idea_index) => info!(signature = ctx.signature, idea = %idea, idea_index, "idea indexed"),
                None => debug!(idea = %idea, "idea already indexed"),
            }
            Ok(())
        }
        GovernanceIx::TransitionRound { round } => {
            match db.transition_round_once(&ctx.receipt(index), round)? {
                TransitionOutcome::Advanced { from, to } => {
                    info!(signature = ctx.signature, round = %round, ?from, ?to, "round transitioned")
                }
                TransitionOutcome::Terminal => debug!(round = %round, "round already closed"),
                TransitionOutcome::Replayed => debug!(round = %round, "transition already applied"),
            }
            Ok(())
        }
        GovernanceIx::CastVote { idea, vote_record, voter, vote } => {
            let weight = db.get_deposit(voter)?.map(|d| d.deposited_amount).unwrap_or(0);
            let record = Vote {
                idea_address: idea.clone(),
                voter_wallet: voter.clone(),
                on_chain_address: vote_record.clone(),
                vote: *vote,
                weight,
                transaction_signature: ctx.signature.to_string(),
                created_at: ctx.now,
            };
            let outcome = db.record_vote(&record)?;
            info!(signature = ctx.signature, idea = %idea, voter = %voter, ?vote, weight, ?outcome, "vote indexed");
            Ok(())
        }
        GovernanceIx::DepositTokens { wallet, amount } => {
            let amount = *amount;
            let now = ctx.now;
            let applied = db.apply_deposit_once(&ctx.receipt(index), wallet, |current| {
                Some(match current {
                    Some(mut d) if d.deposited_amount > 0 => {
                        d.deposited_amount = d.deposited_amount.saturating_add(amount);
                        d
                    }
                    // First deposit, or first since a full withdrawal: restart the timelock.
                    other => VoteDeposit {
                        wallet_address: wallet.clone(),
                        deposited_amount: amount,
                        deposit_timestamp: now,
                        eligible_at: now + VOTE_TIMELOCK_SECS,
                        active_votes: other.map(|d| d.active_votes).unwrap_or(0),
                    },
                })
            })?;
            info!(signature = ctx.signature, wallet = %wallet, amount, applied, "deposit indexed");
            Ok(())
        }
        GovernanceIx::WithdrawTokens { wallet, amount } => {
            if db.get_deposit(wallet)?.is_none() {
                return Err(GsdError::not_found("deposit", wallet.clone()));
            }
            let amount = *amount;
            let applied = db.apply_deposit_once(&ctx.receipt(index), wallet, |current| {
                current.map(|mut d| {
                    if amount >= d.deposited_amount {
                        d.deposited_amount = 0;
                        d.deposit_timestamp = 0;
                        d.eligible_at = 0;
                    } else {
                        d.deposited_amount -= amount;
                    }
                    d
                })
            })?;
            info!(signature = ctx.signature, wallet = %wallet, amount, applied, "withdrawal indexed");
            Ok(())
        }
        GovernanceIx::RelinquishVote { voter } => {
            if db.get_deposit(voter)?.is_none() {
                return Err(GsdError::not_found("deposit", voter.clone()));
            }
            let applied = db.apply_deposit_once(&ctx.receipt(index), voter, |current| {
                current.map(|mut d| {
                    d.active_votes = d.active_votes.saturating_sub(1);
                    d
                })
            })?;
            info!(signature = ctx.signature, voter = %voter, applied, "vote relinquished");
            Ok(())
        }
        GovernanceIx::VetoIdea { idea } => {
            db.update_idea(idea, |i| i.status = IdeaStatus::Vetoed)?
                .ok_or_else(|| GsdError::not_found("idea", idea.clone()))?;
            info!(signature = ctx.signature, idea = %idea, "idea vetoed");
            Ok(())
        }
    }
}
