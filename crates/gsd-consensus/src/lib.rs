pub mod assignment;
pub mod consensus;
pub mod score;
pub mod tier;

pub use assignment::{assign_reviewers, domain_relevance, eligible_reviewers, select_panel, ReviewerCandidate};
pub use consensus::{consensus_for_report, ConsensusConfig, ConsensusResult, ReviewVote};
pub use score::{
    contribution_score, contribution_score_for_wallet, decay_multiplier, decayed_total, isqrt,
    ContributionScore,
};
pub use tier::{determine_tier, review_deadline, review_reward};
