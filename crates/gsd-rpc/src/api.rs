use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use gsd_backfill::BackfillStatus;
use gsd_consensus::{ConsensusResult, ContributionScore};
use gsd_core::entities::{
    DelegationRecord, Idea, IdeaRound, PeerReview, PendingRevenue, RevenueEvent, VerificationReport, Vote,
    VoteDeposit,
};
use gsd_indexer::IndexerStats;
use gsd_revenue::Distribution;

use crate::types::{RpcAssignment, RpcDelegateStats};

/// GSD indexer JSON-RPC 2.0 API.
///
/// All method names are prefixed with "gsd_" via `namespace = "gsd"`.
#[rpc(server, namespace = "gsd")]
pub trait GsdApi {
    // ── Governance ────────────────────────────────────────────────────────────

    /// Round by on-chain address.
    #[method(name = "getRound")]
    async fn get_round(&self, address: String) -> RpcResult<Option<IdeaRound>>;

    /// All rounds, by round index.
    #[method(name = "listRounds")]
    async fn list_rounds(&self) -> RpcResult<Vec<IdeaRound>>;

    #[method(name = "getIdea")]
    async fn get_idea(&self, address: String) -> RpcResult<Option<Idea>>;

    /// Ideas of one round, by idea index.
    #[method(name = "listIdeas")]
    async fn list_ideas(&self, round: String) -> RpcResult<Vec<Idea>>;

    #[method(name = "getVote")]
    async fn get_vote(&self, idea: String, voter: String) -> RpcResult<Option<Vote>>;

    #[method(name = "getDeposit")]
    async fn get_deposit(&self, wallet: String) -> RpcResult<Option<VoteDeposit>>;

    // ── Delegation ────────────────────────────────────────────────────────────

    /// Records where `wallet` is the delegator or the delegate, newest first.
    #[method(name = "getDelegationsForWallet")]
    async fn get_delegations_for_wallet(&self, wallet: String) -> RpcResult<Vec<DelegationRecord>>;

    #[method(name = "getDelegateStats")]
    async fn get_delegate_stats(&self, delegate: String) -> RpcResult<RpcDelegateStats>;

    // ── Revenue ───────────────────────────────────────────────────────────────

    /// Event by origin signature or by on-chain address.
    #[method(name = "getRevenueEvent")]
    async fn get_revenue_event(&self, id: String) -> RpcResult<Option<RevenueEvent>>;

    #[method(name = "listRevenueEvents")]
    async fn list_revenue_events(&self) -> RpcResult<Vec<RevenueEvent>>;

    /// Treasury inflows detected but not yet promoted.
    #[method(name = "listPendingRevenue")]
    async fn list_pending_revenue(&self) -> RpcResult<Vec<PendingRevenue>>;

    /// Record a detected inflow as a revenue event and run buy-and-burn.
    /// Null for an unknown signature.
    #[method(name = "promotePendingRevenue")]
    async fn promote_pending_revenue(&self, signature: String) -> RpcResult<Option<Distribution>>;

    // ── Verification ──────────────────────────────────────────────────────────

    /// Report by storage key, on-chain address, or `task:wallet`.
    #[method(name = "getReport")]
    async fn get_report(&self, id: String) -> RpcResult<Option<VerificationReport>>;

    #[method(name = "listPeerReviews")]
    async fn list_peer_reviews(&self, report: String) -> RpcResult<Vec<PeerReview>>;

    #[method(name = "getConsensus")]
    async fn get_consensus(&self, report: String) -> RpcResult<ConsensusResult>;

    /// Pick a reviewer panel for a submission. `count` defaults to the
    /// minimum panel size.
    #[method(name = "assignReviewers")]
    async fn assign_reviewers(
        &self,
        domains: Vec<String>,
        author: String,
        count: Option<usize>,
    ) -> RpcResult<RpcAssignment>;

    // ── Backfill ──────────────────────────────────────────────────────────────

    /// Start a run. Fails while another run is in progress.
    #[method(name = "startBackfill")]
    async fn start_backfill(&self) -> RpcResult<BackfillStatus>;

    /// Returns false when nothing is running.
    #[method(name = "cancelBackfill")]
    async fn cancel_backfill(&self) -> RpcResult<bool>;

    #[method(name = "getBackfillStatus")]
    async fn get_backfill_status(&self) -> RpcResult<BackfillStatus>;

    // ── Scores & stats ────────────────────────────────────────────────────────

    #[method(name = "getContributionScore")]
    async fn get_contribution_score(&self, wallet: String) -> RpcResult<ContributionScore>;

    #[method(name = "getIndexerStats")]
    async fn get_indexer_stats(&self) -> RpcResult<IndexerStats>;
}
