use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tracing::{info, warn};

use gsd_backfill::{BackfillRunner, BackfillStatus};
use gsd_consensus::{
    assign_reviewers, consensus_for_report, contribution_score_for_wallet, review_deadline, ConsensusResult,
    ContributionScore,
};
use gsd_core::constants::MIN_REVIEWERS;
use gsd_core::entities::{
    DelegationRecord, Idea, IdeaRound, PeerReview, PendingRevenue, RevenueEvent, VerificationReport, Vote,
    VoteDeposit,
};
use gsd_core::error::GsdError;
use gsd_indexer::{Dispatcher, IndexerStats};
use gsd_revenue::{Distribution, RevenueDistributor};
use gsd_state::StateDb;

use crate::api::GsdApiServer;
use crate::types::{RpcAssignment, RpcDelegateStats};

/// Application error code for lookups of entities that are not indexed.
const NOT_FOUND: i32 = -32004;
/// Application error code for a rejected backfill start.
const CONFLICT: i32 = -32009;

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

fn internal(e: GsdError) -> ErrorObject<'static> {
    match e {
        GsdError::NotFound { .. } => rpc_err(NOT_FOUND, e.to_string()),
        GsdError::BackfillInProgress => rpc_err(CONFLICT, e.to_string()),
        other => rpc_err(-32603, other.to_string()),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub db: Arc<StateDb>,
    pub dispatcher: Arc<Dispatcher>,
    pub distributor: Arc<RevenueDistributor>,
    pub backfill: Arc<BackfillRunner>,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr`. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let server = Server::builder().build(addr).await?;
        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

#[async_trait]
impl GsdApiServer for RpcServer {
    async fn get_round(&self, address: String) -> RpcResult<Option<IdeaRound>> {
        self.state.db.get_round(&address).map_err(internal)
    }

    async fn list_rounds(&self) -> RpcResult<Vec<IdeaRound>> {
        self.state.db.list_rounds().map_err(internal)
    }

    async fn get_idea(&self, address: String) -> RpcResult<Option<Idea>> {
        self.state.db.get_idea(&address).map_err(internal)
    }

    async fn list_ideas(&self, round: String) -> RpcResult<Vec<Idea>> {
        self.state.db.list_ideas(&round).map_err(internal)
    }

    async fn get_vote(&self, idea: String, voter: String) -> RpcResult<Option<Vote>> {
        self.state.db.get_vote(&idea, &voter).map_err(internal)
    }

    async fn get_deposit(&self, wallet: String) -> RpcResult<Option<VoteDeposit>> {
        self.state.db.get_deposit(&wallet).map_err(internal)
    }

    async fn get_delegations_for_wallet(&self, wallet: String) -> RpcResult<Vec<DelegationRecord>> {
        self.state.db.list_delegations_for_wallet(&wallet).map_err(internal)
    }

    async fn get_delegate_stats(&self, delegate: String) -> RpcResult<RpcDelegateStats> {
        let active = self.state.db.active_delegations_to(&delegate).map_err(internal)?;
        Ok(RpcDelegateStats {
            delegator_count: active.len() as u64,
            total_delegated: active.iter().fold(0u64, |acc, d| acc.saturating_add(d.delegated_amount)),
        })
    }

    async fn get_revenue_event(&self, id: String) -> RpcResult<Option<RevenueEvent>> {
        let db = &self.state.db;
        match db.get_revenue_event(&id).map_err(internal)? {
            Some(event) => Ok(Some(event)),
            None => db.get_revenue_event_by_address(&id).map_err(internal),
        }
    }

    async fn list_revenue_events(&self) -> RpcResult<Vec<RevenueEvent>> {
        self.state.db.list_revenue_events().map_err(internal)
    }

    async fn list_pending_revenue(&self) -> RpcResult<Vec<PendingRevenue>> {
        self.state.db.list_pending_revenue().map_err(internal)
    }

    async fn promote_pending_revenue(&self, signature: String) -> RpcResult<Option<Distribution>> {
        let distribution = self
            .state
            .distributor
            .promote_pending(&signature, now())
            .await
            .map_err(internal)?;
        if distribution.is_none() {
            warn!(%signature, "promotion requested for unknown inflow");
        }
        Ok(distribution)
    }

    async fn get_report(&self, id: String) -> RpcResult<Option<VerificationReport>> {
        self.state.db.resolve_report(&id).map_err(internal)
    }

    async fn list_peer_reviews(&self, report: String) -> RpcResult<Vec<PeerReview>> {
        let db = &self.state.db;
        let key = match db.resolve_report(&report).map_err(internal)? {
            Some(r) => r.key(),
            None => report,
        };
        db.list_peer_reviews(&key).map_err(internal)
    }

    async fn get_consensus(&self, report: String) -> RpcResult<ConsensusResult> {
        consensus_for_report(&self.state.db, &report).map_err(internal)
    }

    async fn assign_reviewers(
        &self,
        domains: Vec<String>,
        author: String,
        count: Option<usize>,
    ) -> RpcResult<RpcAssignment> {
        let count = count.unwrap_or(MIN_REVIEWERS);
        if count == 0 {
            return Err(rpc_err(-32602, "count must be positive"));
        }
        let reviewers = assign_reviewers(&self.state.db, &domains, &author, count).map_err(internal)?;
        let assigned_at = now();
        info!(%author, requested = count, assigned = reviewers.len(), "reviewers assigned");
        Ok(RpcAssignment { reviewers, assigned_at, deadline: review_deadline(assigned_at) })
    }

    async fn start_backfill(&self) -> RpcResult<BackfillStatus> {
        // The run is detached; progress is read back through getBackfillStatus.
        let _handle = self.state.backfill.start().map_err(internal)?;
        Ok(self.state.backfill.status())
    }

    async fn cancel_backfill(&self) -> RpcResult<bool> {
        Ok(self.state.backfill.cancel())
    }

    async fn get_backfill_status(&self) -> RpcResult<BackfillStatus> {
        Ok(self.state.backfill.status())
    }

    async fn get_contribution_score(&self, wallet: String) -> RpcResult<ContributionScore> {
        contribution_score_for_wallet(&self.state.db, &wallet, now()).map_err(internal)
    }

    async fn get_indexer_stats(&self) -> RpcResult<IndexerStats> {
        self.state.dispatcher.stats().map_err(internal)
    }
}
