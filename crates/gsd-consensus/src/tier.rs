use gsd_core::constants::{
    ARCHITECT_MIN_CONTRIBUTIONS, ARCHITECT_MIN_DOMAIN_CONTRIBUTIONS, BPS_DENOMINATOR, BUILDER_MIN_CONTRIBUTIONS,
    BUILDER_MIN_DOMAIN_CONTRIBUTIONS, REVIEW_TIMEOUT_DAYS,
};
use gsd_core::types::{ReviewerTier, Timestamp};

/// Highest tier whose thresholds are both met.
pub fn determine_tier(verified_contributions: u64, domain_contributions: u64) -> ReviewerTier {
    if verified_contributions >= ARCHITECT_MIN_CONTRIBUTIONS
        && domain_contributions >= ARCHITECT_MIN_DOMAIN_CONTRIBUTIONS
    {
        ReviewerTier::Architect
    } else if verified_contributions >= BUILDER_MIN_CONTRIBUTIONS
        && domain_contributions >= BUILDER_MIN_DOMAIN_CONTRIBUTIONS
    {
        ReviewerTier::Builder
    } else {
        ReviewerTier::Explorer
    }
}

/// Contribution credit earned for reviewing work scored `contribution_score`,
/// rounded to the nearest unit.
pub fn review_reward(tier: ReviewerTier, contribution_score: u64) -> u64 {
    let scaled = contribution_score as u128 * tier.reward_rate_bps() as u128;
    ((scaled + BPS_DENOMINATOR as u128 / 2) / BPS_DENOMINATOR as u128) as u64
}

/// When an assignment made at `assigned_at` lapses.
pub fn review_deadline(assigned_at: Timestamp) -> Timestamp {
    assigned_at + REVIEW_TIMEOUT_DAYS as i64 * 86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_need_both_thresholds() {
        assert_eq!(determine_tier(0, 0), ReviewerTier::Explorer);
        assert_eq!(determine_tier(10, 3), ReviewerTier::Builder);
        assert_eq!(determine_tier(49, 100), ReviewerTier::Builder);
        assert_eq!(determine_tier(50, 10), ReviewerTier::Architect);
        assert_eq!(determine_tier(500, 2), ReviewerTier::Explorer);
    }

    #[test]
    fn rewards_scale_with_tier() {
        assert_eq!(review_reward(ReviewerTier::Explorer, 8_000), 1_200);
        assert_eq!(review_reward(ReviewerTier::Builder, 8_000), 1_600);
        assert_eq!(review_reward(ReviewerTier::Architect, 8_000), 2_000);
        // 3 × 0.25 = 0.75 rounds up.
        assert_eq!(review_reward(ReviewerTier::Architect, 3), 1);
        assert_eq!(review_reward(ReviewerTier::Explorer, 0), 0);
    }

    #[test]
    fn deadline_is_a_week_out() {
        assert_eq!(review_deadline(1_000), 1_000 + 604_800);
    }
}
