use gsd_core::constants::{CONFIDENCE_PENALTY, CONSENSUS_THRESHOLD_BPS, MIN_REVIEWERS};
use gsd_core::entities::PeerReview;
use gsd_core::error::GsdError;
use gsd_core::types::ReviewerTier;
use gsd_state::StateDb;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One reviewer's verdict as seen by the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewVote {
    pub tier: ReviewerTier,
    /// 0–10_000.
    pub score: u16,
    pub passed: bool,
}

impl From<&PeerReview> for ReviewVote {
    fn from(review: &PeerReview) -> Self {
        Self { tier: review.tier, score: review.score, passed: review.passed }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub has_consensus: bool,
    pub passed: bool,
    /// Tier-weighted mean score, penalized on disagreement. Zero below the
    /// reviewer minimum.
    pub weighted_score: u32,
    pub total_weight: u64,
    /// Weight share of the larger side, in bps.
    pub agreement_bps: u32,
    pub review_count: usize,
}

/// Aggregation parameters. `Default` carries the protocol values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusConfig {
    pub min_reviewers: usize,
    /// Weight share one side needs, in bps.
    pub threshold_bps: u64,
    pub disagreement_penalty: u32,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_reviewers: MIN_REVIEWERS,
            threshold_bps: CONSENSUS_THRESHOLD_BPS,
            disagreement_penalty: CONFIDENCE_PENALTY,
        }
    }
}

impl ConsensusConfig {
    /// Tier-weighted verdict over `reviews`.
    ///
    /// All ratios are compared in integer form (`side × 10_000 ≥ total ×
    /// threshold`) so the 70% boundary is exact.
    pub fn evaluate(&self, reviews: &[ReviewVote]) -> ConsensusResult {
        if reviews.is_empty() || reviews.len() < self.min_reviewers {
            return ConsensusResult { review_count: reviews.len(), ..Default::default() };
        }

        let mut total_weight = 0u64;
        let mut pass_weight = 0u64;
        let mut score_sum = 0u64;
        for review in reviews {
            let weight = review.tier.weight();
            total_weight += weight;
            score_sum += review.score as u64 * weight;
            if review.passed {
                pass_weight += weight;
            }
        }
        let fail_weight = total_weight - pass_weight;

        let reaches = |side: u64| side * 10_000 >= total_weight * self.threshold_bps;
        let passed = reaches(pass_weight);
        let has_consensus = passed || reaches(fail_weight);

        // Rounded half up.
        let mean = ((score_sum * 2 + total_weight) / (total_weight * 2)) as u32;
        let weighted_score = if has_consensus { mean } else { mean.saturating_sub(self.disagreement_penalty) };

        ConsensusResult {
            has_consensus,
            passed,
            weighted_score,
            total_weight,
            agreement_bps: (pass_weight.max(fail_weight) * 10_000 / total_weight) as u32,
            review_count: reviews.len(),
        }
    }
}

/// Consensus over the peer reviews stored for a report, resolved by
/// report key or on-chain address.
pub fn consensus_for_report(db: &StateDb, report: &str) -> Result<ConsensusResult, GsdError> {
    let report = db
        .resolve_report(report)?
        .ok_or_else(|| GsdError::not_found("verification report", report.to_string()))?;
    let votes: Vec<ReviewVote> = db.list_peer_reviews(&report.key())?.iter().map(ReviewVote::from).collect();
    let result = ConsensusConfig::default().evaluate(&votes);
    debug!(
        report = %report.key(),
        reviews = result.review_count,
        has_consensus = result.has_consensus,
        passed = result.passed,
        "consensus evaluated"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsd_core::types::ReviewerTier::{Architect, Builder, Explorer};

    fn vote(tier: ReviewerTier, score: u16, passed: bool) -> ReviewVote {
        ReviewVote { tier, score, passed }
    }

    #[test]
    fn split_panel_has_no_consensus_and_is_penalized() {
        let result = ConsensusConfig::default().evaluate(&[
            vote(Explorer, 8_000, true),
            vote(Builder, 8_000, true),
            vote(Architect, 8_000, false),
        ]);
        assert!(!result.has_consensus);
        assert!(!result.passed);
        assert_eq!(result.total_weight, 6);
        assert_eq!(result.agreement_bps, 5_000);
        assert_eq!(result.weighted_score, 7_000);
    }

    #[test]
    fn unanimous_pass_reaches_consensus_without_penalty() {
        let result = ConsensusConfig::default().evaluate(&[
            vote(Builder, 9_000, true),
            vote(Builder, 8_000, true),
            vote(Architect, 7_000, true),
        ]);
        assert!(result.has_consensus);
        assert!(result.passed);
        assert_eq!(result.total_weight, 7);
        // (18_000 + 16_000 + 21_000) / 7 = 7_857.14
        assert_eq!(result.weighted_score, 7_857);
    }

    #[test]
    fn fail_side_consensus_is_not_passed() {
        let result = ConsensusConfig::default().evaluate(&[
            vote(Explorer, 9_000, true),
            vote(Architect, 2_000, false),
            vote(Architect, 3_000, false),
        ]);
        assert!(result.has_consensus);
        assert!(!result.passed);
        assert_eq!(result.agreement_bps, 8_571);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // pass 7 of 10 exactly.
        let config = ConsensusConfig { min_reviewers: 1, ..Default::default() };
        let result = config.evaluate(&[
            vote(Architect, 5_000, true),
            vote(Architect, 5_000, true),
            vote(Explorer, 5_000, true),
            vote(Architect, 5_000, false),
        ]);
        assert!(result.passed);
        assert_eq!(result.agreement_bps, 7_000);
    }

    #[test]
    fn below_minimum_reports_nothing() {
        let result = ConsensusConfig::default().evaluate(&[vote(Architect, 9_000, true), vote(Architect, 9_000, true)]);
        assert_eq!(result, ConsensusResult { review_count: 2, ..Default::default() });
        assert_eq!(ConsensusConfig::default().evaluate(&[]).review_count, 0);
    }

    #[test]
    fn penalty_saturates_at_zero() {
        let result = ConsensusConfig::default().evaluate(&[
            vote(Explorer, 500, true),
            vote(Explorer, 500, false),
            vote(Explorer, 500, true),
        ]);
        assert!(!result.has_consensus);
        assert_eq!(result.weighted_score, 0);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ConsensusResult::default()).unwrap();
        assert!(json.get("hasConsensus").is_some());
        assert!(json.get("weightedScore").is_some());
    }
}
