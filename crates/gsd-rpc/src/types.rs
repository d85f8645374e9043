use gsd_consensus::ReviewerCandidate;
use gsd_core::types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Aggregate of the active delegations pointing at one delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcDelegateStats {
    pub delegator_count: u64,
    pub total_delegated: Amount,
}

/// A reviewer panel returned by `gsd_assignReviewers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcAssignment {
    pub reviewers: Vec<ReviewerCandidate>,
    pub assigned_at: Timestamp,
    /// Reviews not submitted by this time lapse.
    pub deadline: Timestamp,
}
