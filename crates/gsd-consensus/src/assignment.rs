//! Reviewer eligibility and panel selection.

use std::cmp::Reverse;
use std::collections::HashSet;

use gsd_core::constants::MAX_CONSECUTIVE_REVIEWS;
use gsd_core::entities::ReviewerProfile;
use gsd_core::error::GsdError;
use gsd_state::StateDb;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An eligible reviewer with the relevance it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerCandidate {
    pub profile: ReviewerProfile,
    pub relevance: u32,
}

/// Two points per task domain the reviewer has contributed in, one per
/// domain they have reviewed in.
pub fn domain_relevance(profile: &ReviewerProfile, domains: &[String]) -> u32 {
    domains
        .iter()
        .map(|d| {
            let contributed = profile.domain_contributions.get(d).copied().unwrap_or(0) > 0;
            let reviewed = profile.domain_reviews.get(d).copied().unwrap_or(0) > 0;
            2 * contributed as u32 + reviewed as u32
        })
        .sum()
}

/// Filter and rank `profiles` for a submission by `author`.
///
/// `recent_panels` lists the reviewer wallets of the author's latest
/// reviewed submissions, newest first. A reviewer present on every one of
/// the last `MAX_CONSECUTIVE_REVIEWS` panels is excluded, as is the author.
/// Ranking is relevance, then tier, then quality, all descending.
pub fn eligible_reviewers(
    profiles: Vec<ReviewerProfile>,
    domains: &[String],
    author: &str,
    recent_panels: &[Vec<String>],
) -> Vec<ReviewerCandidate> {
    let streak = &recent_panels[..recent_panels.len().min(MAX_CONSECUTIVE_REVIEWS)];
    let on_streak = |wallet: &str| {
        streak.len() == MAX_CONSECUTIVE_REVIEWS && streak.iter().all(|panel| panel.iter().any(|w| w == wallet))
    };

    let mut candidates: Vec<ReviewerCandidate> = profiles
        .into_iter()
        .filter(|p| p.wallet_address != author && !on_streak(&p.wallet_address))
        .map(|profile| ReviewerCandidate { relevance: domain_relevance(&profile, domains), profile })
        .collect();
    candidates.sort_by_key(|c| (Reverse(c.relevance), Reverse(c.profile.tier), Reverse(c.profile.quality_bps())));
    candidates
}

/// Take the top `count` candidates. When they all share one tier, the
/// last pick is swapped for the best-ranked candidate of another tier.
pub fn select_panel(eligible: Vec<ReviewerCandidate>, count: usize) -> Vec<ReviewerCandidate> {
    if eligible.len() <= count {
        return eligible;
    }
    let mut selected: Vec<ReviewerCandidate> = eligible[..count].to_vec();
    let tiers: HashSet<_> = selected.iter().map(|c| c.profile.tier).collect();
    if tiers.len() == 1 && selected.len() >= 2 {
        let tier = selected[0].profile.tier;
        if let Some(other) = eligible[count..].iter().find(|c| c.profile.tier != tier) {
            let last = selected.len() - 1;
            selected[last] = other.clone();
        }
    }
    selected
}

/// Reviewer panels of the author's latest reviewed submissions, newest first.
fn recent_panels(db: &StateDb, author: &str, limit: usize) -> Result<Vec<Vec<String>>, GsdError> {
    let mut panels = Vec::with_capacity(limit);
    for report in db.reports_for_wallet(author)? {
        if panels.len() == limit {
            break;
        }
        let panel: Vec<String> = db
            .list_peer_reviews(&report.key())?
            .into_iter()
            .map(|r| r.reviewer_wallet)
            .collect();
        if !panel.is_empty() {
            panels.push(panel);
        }
    }
    Ok(panels)
}

/// Select a panel of `count` reviewers for a submission in `domains`.
/// Returns fewer when not enough reviewers are eligible.
pub fn assign_reviewers(
    db: &StateDb,
    domains: &[String],
    author: &str,
    count: usize,
) -> Result<Vec<ReviewerCandidate>, GsdError> {
    let panels = recent_panels(db, author, MAX_CONSECUTIVE_REVIEWS)?;
    let eligible = eligible_reviewers(db.list_reviewers()?, domains, author, &panels);
    let eligible_count = eligible.len();
    let panel = select_panel(eligible, count);
    debug!(author, eligible = eligible_count, selected = panel.len(), "reviewers assigned");
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsd_core::entities::{PeerReview, VerificationReport};
    use gsd_core::types::{ReportStatus, ReviewerTier, VerificationType};

    fn profile(wallet: &str, tier: ReviewerTier, quality: f64) -> ReviewerProfile {
        let mut p = ReviewerProfile::new(wallet, 0);
        p.tier = tier;
        p.review_quality_score = quality;
        p
    }

    fn wallets(candidates: &[ReviewerCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.profile.wallet_address.as_str()).collect()
    }

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn relevance_weights_contributions_over_reviews() {
        let mut p = profile("r", ReviewerTier::Explorer, 1.0);
        p.domain_contributions.insert("rust".into(), 4);
        p.domain_reviews.insert("rust".into(), 1);
        p.domain_reviews.insert("web".into(), 2);
        p.domain_contributions.insert("ops".into(), 0);
        assert_eq!(domain_relevance(&p, &domains(&["rust", "web", "ops", "ml"])), 4);
    }

    #[test]
    fn ranks_by_relevance_then_tier_then_quality() {
        let mut relevant = profile("relevant", ReviewerTier::Explorer, 0.1);
        relevant.domain_reviews.insert("rust".into(), 1);
        let profiles = vec![
            profile("builder_low", ReviewerTier::Builder, 0.4),
            profile("architect", ReviewerTier::Architect, 0.2),
            relevant,
            profile("builder_high", ReviewerTier::Builder, 0.9),
            profile("author", ReviewerTier::Architect, 1.0),
        ];
        let ranked = eligible_reviewers(profiles, &domains(&["rust"]), "author", &[]);
        assert_eq!(wallets(&ranked), vec!["relevant", "architect", "builder_high", "builder_low"]);
    }

    #[test]
    fn excludes_reviewer_on_every_recent_panel() {
        let profiles = vec![
            profile("regular", ReviewerTier::Architect, 1.0),
            profile("occasional", ReviewerTier::Builder, 1.0),
        ];
        let panel = |ws: &[&str]| ws.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let recent = vec![
            panel(&["regular", "occasional"]),
            panel(&["regular"]),
            panel(&["regular", "x"]),
            panel(&["occasional"]),
        ];
        let ranked = eligible_reviewers(profiles.clone(), &[], "author", &recent);
        assert_eq!(wallets(&ranked), vec!["occasional"]);

        // Fewer than three reviewed submissions: no streak yet.
        let ranked = eligible_reviewers(profiles, &[], "author", &recent[..2]);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn panel_swaps_in_a_different_tier() {
        let eligible = eligible_reviewers(
            vec![
                profile("a1", ReviewerTier::Architect, 0.9),
                profile("a2", ReviewerTier::Architect, 0.8),
                profile("a3", ReviewerTier::Architect, 0.7),
                profile("b1", ReviewerTier::Builder, 0.9),
                profile("e1", ReviewerTier::Explorer, 0.9),
            ],
            &[],
            "author",
            &[],
        );
        let panel = select_panel(eligible, 3);
        assert_eq!(wallets(&panel), vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn small_pool_is_returned_whole() {
        let eligible = eligible_reviewers(vec![profile("only", ReviewerTier::Builder, 1.0)], &[], "author", &[]);
        assert_eq!(select_panel(eligible, 3).len(), 1);
    }

    #[test]
    fn assigns_from_stored_profiles_and_reviews() {
        let db = StateDb::temporary().unwrap();
        for (wallet, tier) in [("r1", ReviewerTier::Architect), ("r2", ReviewerTier::Builder), ("r3", ReviewerTier::Explorer)] {
            db.upsert_reviewer(wallet, 0, |p| p.tier = tier).unwrap();
        }
        for i in 0..3i64 {
            let report = VerificationReport {
                transaction_signature: Some(format!("sig{i}")),
                on_chain_address: Some(format!("report{i}")),
                wallet_address: "dev".into(),
                task_ref: format!("task{i}"),
                verification_type: VerificationType::Ai,
                overall_score: 5_000,
                confidence: 5_000,
                report_hash: String::new(),
                status: ReportStatus::Pending,
                created_at: i,
                completed_at: None,
            };
            db.upsert_report(&report).unwrap();
            db.record_peer_review(&PeerReview {
                report_key: report.key(),
                reviewer_wallet: "r1".into(),
                on_chain_address: format!("review{i}"),
                tier: ReviewerTier::Architect,
                score: 5_000,
                passed: true,
                review_hash: String::new(),
                transaction_signature: format!("rsig{i}"),
                created_at: i,
            })
            .unwrap();
        }

        let panel = assign_reviewers(&db, &[], "dev", 3).unwrap();
        assert_eq!(wallets(&panel), vec!["r2", "r3"]);

        let panel = assign_reviewers(&db, &[], "someone_else", 2).unwrap();
        assert_eq!(wallets(&panel), vec!["r1", "r2"]);
    }
}
