use gsd_core::entities::{DelegationRecord, Idea, IdeaRound, Vote, VoteDeposit};
use gsd_core::error::GsdError;
use gsd_core::types::{RoundStatus, Timestamp, VoteChoice};
use sled::Transactional;

use crate::db::{
    abort, from_tx, get, list, pair_key, storage, tx_get, tx_next_seq, tx_put, update, StateDb,
};

/// Result of applying a `cast_vote` to the vote table and idea tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote by this wallet on this idea; tally and voter count bumped.
    Created,
    /// Existing vote switched choice; weight moved between tallies.
    Changed { from: VoteChoice },
    /// Redelivery of a vote already counted.
    Unchanged,
}

/// Result of applying a `transition_round` delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Advanced { from: RoundStatus, to: RoundStatus },
    /// The round is already closed; nothing changes.
    Terminal,
    /// This delivery was applied before.
    Replayed,
}

impl StateDb {
    // ── Rounds ────────────────────────────────────────────────────────────────

    pub fn get_round(&self, address: &str) -> Result<Option<IdeaRound>, GsdError> {
        get(&self.rounds, address.as_bytes())
    }

    /// Rounds ordered by local round index.
    pub fn list_rounds(&self) -> Result<Vec<IdeaRound>, GsdError> {
        let mut rounds: Vec<IdeaRound> = list(&self.rounds)?;
        rounds.sort_by_key(|r| r.round_index);
        Ok(rounds)
    }

    /// Create the round (assigning the next round index) or refresh the
    /// schedule fields of an existing one. Status, idea count and index of
    /// an existing round are left alone. Returns `true` when created.
    pub fn upsert_round(&self, round: &IdeaRound) -> Result<bool, GsdError> {
        (&self.rounds, &self.meta)
            .transaction(|(rounds, meta)| {
                let key = round.on_chain_address.as_bytes();
                match tx_get::<IdeaRound>(rounds, key)? {
                    Some(mut existing) => {
                        existing.submission_start = round.submission_start;
                        existing.submission_end = round.submission_end;
                        existing.voting_end = round.voting_end;
                        existing.quorum_type = round.quorum_type;
                        existing.content_hash = round.content_hash.clone();
                        tx_put(rounds, key, &existing)?;
                        Ok(false)
                    }
                    None => {
                        let mut fresh = round.clone();
                        fresh.round_index = tx_next_seq(meta, "seq:rounds")?;
                        tx_put(rounds, key, &fresh)?;
                        Ok(true)
                    }
                }
            })
            .map_err(from_tx)
    }

    /// Advance the round one step (`open → voting → closed`) at most once
    /// per `receipt`. The next status is derived from the stored one.
    ///
    /// Fails with `NotFound` when the round is unknown.
    pub fn transition_round_once(&self, receipt: &str, address: &str) -> Result<TransitionOutcome, GsdError> {
        (&self.receipts, &self.rounds)
            .transaction(|(receipts, rounds)| {
                if receipts.get(receipt.as_bytes())?.is_some() {
                    return Ok(TransitionOutcome::Replayed);
                }
                let Some(mut round) = tx_get::<IdeaRound>(rounds, address.as_bytes())? else {
                    return abort(GsdError::not_found("round", address.to_string()));
                };
                let outcome = match round.status.next() {
                    Some(to) => {
                        let from = round.status;
                        round.status = to;
                        tx_put(rounds, address.as_bytes(), &round)?;
                        TransitionOutcome::Advanced { from, to }
                    }
                    None => TransitionOutcome::Terminal,
                };
                receipts.insert(receipt.as_bytes(), Vec::<u8>::new())?;
                Ok(outcome)
            })
            .map_err(from_tx)
    }

    /// Index of the most recent round still open or voting.
    pub fn latest_active_round_index(&self) -> Result<Option<u64>, GsdError> {
        Ok(self
            .list_rounds()?
            .into_iter()
            .filter(|r| r.status != RoundStatus::Closed)
            .map(|r| r.round_index)
            .max())
    }

    pub fn update_round<F: FnMut(&mut IdeaRound)>(
        &self,
        address: &str,
        f: F,
    ) -> Result<Option<IdeaRound>, GsdError> {
        update(&self.rounds, address.as_bytes(), f)
    }

    // ── Ideas ─────────────────────────────────────────────────────────────────

    pub fn get_idea(&self, address: &str) -> Result<Option<Idea>, GsdError> {
        get(&self.ideas, address.as_bytes())
    }

    pub fn list_ideas(&self, round_address: &str) -> Result<Vec<Idea>, GsdError> {
        let mut ideas: Vec<Idea> = list::<Idea>(&self.ideas)?
            .into_iter()
            .filter(|i| i.round_address == round_address)
            .collect();
        ideas.sort_by_key(|i| i.idea_index);
        Ok(ideas)
    }

    /// Insert a new idea, taking its index from the round's idea count and
    /// bumping that count in the same transaction. Returns the assigned
    /// index, or `None` when the idea was already indexed.
    ///
    /// Fails with `NotFound` when the owning round is unknown.
    pub fn insert_idea(&self, idea: &Idea) -> Result<Option<u64>, GsdError> {
        (&self.ideas, &self.rounds)
            .transaction(|(ideas, rounds)| {
                let key = idea.on_chain_address.as_bytes();
                if ideas.get(key)?.is_some() {
                    return Ok(None);
                }
                let round_key = idea.round_address.as_bytes();
                let Some(mut round) = tx_get::<IdeaRound>(rounds, round_key)? else {
                    return abort(GsdError::not_found("round", idea.round_address.clone()));
                };
                let mut fresh = idea.clone();
                fresh.idea_index = round.idea_count;
                round.idea_count += 1;
                tx_put(ideas, key, &fresh)?;
                tx_put(rounds, round_key, &round)?;
                Ok(Some(fresh.idea_index))
            })
            .map_err(from_tx)
    }

    pub fn update_idea<F: FnMut(&mut Idea)>(&self, address: &str, f: F) -> Result<Option<Idea>, GsdError> {
        update(&self.ideas, address.as_bytes(), f)
    }

    // ── Votes ─────────────────────────────────────────────────────────────────

    pub fn get_vote(&self, idea_address: &str, voter: &str) -> Result<Option<Vote>, GsdError> {
        get(&self.votes, &pair_key(idea_address, voter))
    }

    /// Upsert the vote keyed by (idea, voter) and adjust the idea's tallies
    /// in one transaction. Only the tally matching the vote changes. A new
    /// vote also bumps the voter's `active_votes` when they hold a deposit.
    ///
    /// Fails with `NotFound` when the idea is unknown.
    pub fn record_vote(&self, vote: &Vote) -> Result<VoteOutcome, GsdError> {
        (&self.votes, &self.ideas, &self.deposits)
            .transaction(|(votes, ideas, deposits)| {
                let idea_key = vote.idea_address.as_bytes();
                let Some(mut idea) = tx_get::<Idea>(ideas, idea_key)? else {
                    return abort(GsdError::not_found("idea", vote.idea_address.clone()));
                };
                let vote_key = pair_key(&vote.idea_address, &vote.voter_wallet);
                let outcome = match tx_get::<Vote>(votes, &vote_key)? {
                    None => {
                        let tally = idea.tally_mut(vote.vote);
                        *tally = tally.saturating_add(vote.weight);
                        idea.voter_count += 1;
                        tx_put(votes, &vote_key, vote)?;
                        let wallet = vote.voter_wallet.as_bytes();
                        if let Some(mut deposit) = tx_get::<VoteDeposit>(deposits, wallet)? {
                            deposit.active_votes += 1;
                            tx_put(deposits, wallet, &deposit)?;
                        }
                        VoteOutcome::Created
                    }
                    Some(existing) if existing.vote == vote.vote => return Ok(VoteOutcome::Unchanged),
                    Some(existing) => {
                        let old = idea.tally_mut(existing.vote);
                        *old = old.saturating_sub(existing.weight);
                        let new = idea.tally_mut(vote.vote);
                        *new = new.saturating_add(vote.weight);
                        tx_put(votes, &vote_key, vote)?;
                        VoteOutcome::Changed { from: existing.vote }
                    }
                };
                tx_put(ideas, idea_key, &idea)?;
                Ok(outcome)
            })
            .map_err(from_tx)
    }

    // ── Deposits ──────────────────────────────────────────────────────────────

    pub fn get_deposit(&self, wallet: &str) -> Result<Option<VoteDeposit>, GsdError> {
        get(&self.deposits, wallet.as_bytes())
    }

    /// Apply `f` to the wallet's deposit exactly once per `receipt`.
    ///
    /// `f` sees the current row (or `None`) and returns the row to store;
    /// returning `None` leaves the table untouched. Returns `false` when
    /// the receipt was already recorded.
    pub fn apply_deposit_once<F>(&self, receipt: &str, wallet: &str, f: F) -> Result<bool, GsdError>
    where
        F: Fn(Option<VoteDeposit>) -> Option<VoteDeposit>,
    {
        (&self.receipts, &self.deposits)
            .transaction(|(receipts, deposits)| {
                if receipts.get(receipt.as_bytes())?.is_some() {
                    return Ok(false);
                }
                let current = tx_get::<VoteDeposit>(deposits, wallet.as_bytes())?;
                if let Some(next) = f(current) {
                    tx_put(deposits, wallet.as_bytes(), &next)?;
                }
                receipts.insert(receipt.as_bytes(), Vec::<u8>::new())?;
                Ok(true)
            })
            .map_err(from_tx)
    }

    // ── Delegations ───────────────────────────────────────────────────────────

    pub fn get_delegation(&self, address: &str) -> Result<Option<DelegationRecord>, GsdError> {
        get(&self.delegations, address.as_bytes())
    }

    pub fn get_delegation_for_delegator(&self, delegator: &str) -> Result<Option<DelegationRecord>, GsdError> {
        match self.delegators.get(delegator.as_bytes()).map_err(storage)? {
            Some(address) => get(&self.delegations, &address),
            None => Ok(None),
        }
    }

    /// Upsert by record address and point the delegator index at it. A
    /// different record previously active for the same delegator is
    /// deactivated so each delegator has at most one active delegation.
    /// Returns `true` when the record was created.
    pub fn upsert_delegation(&self, record: &DelegationRecord) -> Result<bool, GsdError> {
        (&self.delegations, &self.delegators)
            .transaction(|(delegations, delegators)| {
                let key = record.on_chain_address.as_bytes();
                let created = match tx_get::<DelegationRecord>(delegations, key)? {
                    Some(mut existing) => {
                        existing.delegate_wallet = record.delegate_wallet.clone();
                        existing.delegated_amount = record.delegated_amount;
                        existing.effective_from_round = record.effective_from_round;
                        existing.is_active = true;
                        existing.revoked_at = None;
                        existing.transaction_signature = record.transaction_signature.clone();
                        tx_put(delegations, key, &existing)?;
                        false
                    }
                    None => {
                        tx_put(delegations, key, record)?;
                        true
                    }
                };

                let delegator_key = record.delegator_wallet.as_bytes();
                if let Some(prior) = delegators.get(delegator_key)? {
                    if prior.as_ref() != key {
                        if let Some(mut old) = tx_get::<DelegationRecord>(delegations, &prior)? {
                            if old.is_active {
                                old.is_active = false;
                                old.revoked_at = Some(record.delegated_at);
                                tx_put(delegations, &prior, &old)?;
                            }
                        }
                    }
                }
                delegators.insert(delegator_key, key)?;
                Ok(created)
            })
            .map_err(from_tx)
    }

    /// Deactivate the delegator's active record. The first revocation time
    /// is kept on replay. Returns `None` when no record is indexed.
    pub fn revoke_delegation(&self, delegator: &str, now: Timestamp) -> Result<Option<DelegationRecord>, GsdError> {
        let Some(address) = self.delegators.get(delegator.as_bytes()).map_err(storage)? else {
            return Ok(None);
        };
        update(&self.delegations, &address, |rec: &mut DelegationRecord| {
            if rec.is_active {
                rec.is_active = false;
                rec.revoked_at = Some(now);
            }
        })
    }

    /// Delegations where `wallet` is either the delegator or the delegate.
    pub fn list_delegations_for_wallet(&self, wallet: &str) -> Result<Vec<DelegationRecord>, GsdError> {
        let mut out: Vec<DelegationRecord> = list::<DelegationRecord>(&self.delegations)?
            .into_iter()
            .filter(|d| d.delegator_wallet == wallet || d.delegate_wallet == wallet)
            .collect();
        out.sort_by(|a, b| b.delegated_at.cmp(&a.delegated_at));
        Ok(out)
    }

    /// Active delegations pointing at `delegate`.
    pub fn active_delegations_to(&self, delegate: &str) -> Result<Vec<DelegationRecord>, GsdError> {
        Ok(list::<DelegationRecord>(&self.delegations)?
            .into_iter()
            .filter(|d| d.is_active && d.delegate_wallet == delegate)
            .collect())
    }
}
