use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{
    Amount, IdeaStatus, QuorumType, ReportStatus, RevenueStatus, RevenueToken, ReviewerTier,
    RoundStatus, Timestamp, VerificationType, VoteChoice,
};

// ── Governance ───────────────────────────────────────────────────────────────

/// An idea round, keyed by its on-chain PDA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaRound {
    /// Locally assigned sequence number. Best-effort: the payload does not
    /// carry the on-chain index, so this reflects observation order.
    pub round_index: u64,
    pub on_chain_address: String,
    pub status: RoundStatus,
    pub submission_start: Timestamp,
    pub submission_end: Timestamp,
    pub voting_end: Timestamp,
    pub quorum_type: QuorumType,
    pub content_hash: String,
    pub idea_count: u64,
    pub transaction_signature: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub idea_index: u64,
    pub on_chain_address: String,
    /// On-chain address of the owning round.
    pub round_address: String,
    pub author_wallet: String,
    pub content_hash: String,
    pub status: IdeaStatus,
    pub yes_weight: u64,
    pub no_weight: u64,
    pub abstain_weight: u64,
    pub voter_count: u64,
    pub transaction_signature: String,
    pub created_at: Timestamp,
}

impl Idea {
    pub fn tally_mut(&mut self, choice: VoteChoice) -> &mut u64 {
        match choice {
            VoteChoice::Yes => &mut self.yes_weight,
            VoteChoice::No => &mut self.no_weight,
            VoteChoice::Abstain => &mut self.abstain_weight,
        }
    }
}

/// One wallet's vote on one idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub idea_address: String,
    pub voter_wallet: String,
    pub on_chain_address: String,
    pub vote: VoteChoice,
    pub weight: u64,
    pub transaction_signature: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteDeposit {
    pub wallet_address: String,
    pub deposited_amount: Amount,
    pub deposit_timestamp: Timestamp,
    pub eligible_at: Timestamp,
    pub active_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub on_chain_address: String,
    pub delegator_wallet: String,
    pub delegate_wallet: String,
    pub delegated_amount: Amount,
    pub is_active: bool,
    pub effective_from_round: u64,
    pub delegated_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub transaction_signature: String,
}

// ── Revenue ──────────────────────────────────────────────────────────────────

/// A revenue inflow and its four-way split.
///
/// `developer_pool + treasury_reserve + burn_amount + maintenance_amount`
/// always equals `total_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueEvent {
    pub event_index: u64,
    /// Set once the `record_revenue_event` instruction is observed.
    pub on_chain_address: Option<String>,
    pub origin_signature: String,
    pub token: RevenueToken,
    pub total_amount: Amount,
    pub developer_pool: Amount,
    pub treasury_reserve: Amount,
    pub burn_amount: Amount,
    pub maintenance_amount: Amount,
    pub status: RevenueStatus,
    pub gsd_burned: Amount,
    pub burn_signature: Option<String>,
    pub claimed_amount: Amount,
    pub recorded_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueClaim {
    pub event_address: String,
    pub claimant_wallet: String,
    pub on_chain_address: String,
    pub contribution_score: u64,
    pub total_score: u64,
    pub amount: Amount,
    pub transaction_signature: String,
    pub claimed_at: Timestamp,
}

/// Raw treasury inflow detected in a transaction, awaiting promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRevenue {
    pub transaction_signature: String,
    pub token: RevenueToken,
    pub amount: Amount,
    pub from_wallet: Option<String>,
    pub detected_at: Timestamp,
    pub promoted: bool,
}

// ── Verification ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// `None` for reports produced off-chain (backfill).
    pub transaction_signature: Option<String>,
    pub on_chain_address: Option<String>,
    pub wallet_address: String,
    pub task_ref: String,
    pub verification_type: VerificationType,
    pub overall_score: u16,
    pub confidence: u16,
    pub report_hash: String,
    pub status: ReportStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl VerificationReport {
    /// Storage key: the transaction signature, or `task:wallet` for
    /// off-chain reports.
    pub fn key(&self) -> String {
        match &self.transaction_signature {
            Some(sig) => sig.clone(),
            None => Self::task_key(&self.task_ref, &self.wallet_address),
        }
    }

    pub fn task_key(task_ref: &str, wallet: &str) -> String {
        format!("{task_ref}:{wallet}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerReview {
    /// `VerificationReport::key()` of the reviewed report.
    pub report_key: String,
    pub reviewer_wallet: String,
    pub on_chain_address: String,
    pub tier: ReviewerTier,
    pub score: u16,
    pub passed: bool,
    pub review_hash: String,
    pub transaction_signature: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerProfile {
    pub wallet_address: String,
    pub tier: ReviewerTier,
    pub total_reviews: u64,
    pub verified_contributions: u64,
    pub domain_reviews: BTreeMap<String, u64>,
    pub domain_contributions: BTreeMap<String, u64>,
    /// 0.0–1.0.
    pub review_quality_score: f64,
    pub updated_at: Timestamp,
}

impl ReviewerProfile {
    pub fn new(wallet: impl Into<String>, now: Timestamp) -> Self {
        Self {
            wallet_address: wallet.into(),
            tier: ReviewerTier::Explorer,
            total_reviews: 0,
            verified_contributions: 0,
            domain_reviews: BTreeMap::new(),
            domain_contributions: BTreeMap::new(),
            review_quality_score: 1.0,
            updated_at: now,
        }
    }

    /// Quality on the 0–10_000 scale used for ranking.
    pub fn quality_bps(&self) -> u32 {
        (self.review_quality_score.clamp(0.0, 1.0) * 10_000.0).round() as u32
    }
}

// ── Contributions ────────────────────────────────────────────────────────────

/// A contribution leaf appended to the compressed contribution tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub transaction_signature: String,
    pub wallet_address: String,
    pub task_ref: String,
    pub verification_score: u16,
    pub content_hash: String,
    pub leaf_hash: String,
    pub tree_address: String,
    pub timestamp: Timestamp,
}
