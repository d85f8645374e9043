use gsd_core::constants::{DECAY_HALF_LIFE_DAYS, SCORE_PRECISION};
use gsd_core::error::GsdError;
use gsd_core::types::Timestamp;
use gsd_state::StateDb;
use serde::{Deserialize, Serialize};

const SECS_PER_DAY: i64 = 86_400;

/// Floor of the square root (Newton's method).
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// `isqrt(tasks·10⁶) · total · isqrt(days·10⁶) / 10⁶`, zero when any input
/// is zero. Saturates at `u64::MAX`.
pub fn contribution_score(tasks_completed: u64, total_verification_score: u64, time_active_days: u64) -> u64 {
    if tasks_completed == 0 || total_verification_score == 0 || time_active_days == 0 {
        return 0;
    }
    let task_factor = isqrt(tasks_completed as u128 * SCORE_PRECISION);
    let time_factor = isqrt(time_active_days as u128 * SCORE_PRECISION);
    let score = task_factor
        .saturating_mul(total_verification_score as u128)
        .saturating_mul(time_factor)
        / SCORE_PRECISION;
    u64::try_from(score).unwrap_or(u64::MAX)
}

/// `2^(−age/half_life)`; 1 for non-positive age or half-life.
pub fn decay_multiplier(age_days: f64, half_life_days: f64) -> f64 {
    if age_days <= 0.0 || half_life_days <= 0.0 {
        return 1.0;
    }
    (-age_days / half_life_days).exp2()
}

/// Sum of `score × decay_multiplier(age)` over `(score, age_days)` pairs,
/// rounded to the nearest unit.
pub fn decayed_total(contributions: &[(u16, f64)], half_life_days: f64) -> u64 {
    let total: f64 = contributions
        .iter()
        .map(|&(score, age)| score as f64 * decay_multiplier(age, half_life_days))
        .sum();
    total.round() as u64
}

/// Original and decayed contribution score of one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionScore {
    pub wallet: String,
    pub contribution_count: u64,
    pub time_active_days: u64,
    pub total_verification_score: u64,
    pub decayed_total: u64,
    pub original_score: u64,
    pub decayed_score: u64,
}

/// Score the wallet's indexed contributions as of `now`. Ages are whole
/// days; time active counts from the first contribution, at least one day.
pub fn contribution_score_for_wallet(db: &StateDb, wallet: &str, now: Timestamp) -> Result<ContributionScore, GsdError> {
    let contributions = db.contributions_for_wallet(wallet)?;
    let Some(first) = contributions.first() else {
        return Ok(ContributionScore {
            wallet: wallet.to_string(),
            contribution_count: 0,
            time_active_days: 0,
            total_verification_score: 0,
            decayed_total: 0,
            original_score: 0,
            decayed_score: 0,
        });
    };

    let age_days = |ts: Timestamp| ((now - ts).max(0) / SECS_PER_DAY) as u64;
    let time_active_days = age_days(first.timestamp).max(1);
    let tasks = contributions.len() as u64;
    let total: u64 = contributions.iter().map(|c| c.verification_score as u64).sum();
    let aged: Vec<(u16, f64)> = contributions
        .iter()
        .map(|c| (c.verification_score, age_days(c.timestamp) as f64))
        .collect();
    let decayed = decayed_total(&aged, DECAY_HALF_LIFE_DAYS);

    Ok(ContributionScore {
        wallet: wallet.to_string(),
        contribution_count: tasks,
        time_active_days,
        total_verification_score: total,
        decayed_total: decayed,
        original_score: contribution_score(tasks, total, time_active_days),
        decayed_score: contribution_score(tasks, decayed, time_active_days),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsd_core::entities::Contribution;

    #[test]
    fn isqrt_floors() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(1_000_000), 1_000);
        assert_eq!(isqrt(u64::MAX as u128), 4_294_967_295);
    }

    #[test]
    fn score_formula() {
        assert_eq!(contribution_score(1, 10_000, 1), 10_000);
        assert_eq!(contribution_score(4, 100, 9), 600);
        assert_eq!(contribution_score(0, 50_000, 30), 0);
        assert_eq!(contribution_score(10, 0, 30), 0);
        assert_eq!(contribution_score(10, 50_000, 0), 0);
        assert!(contribution_score(10, 100_000, 30) > contribution_score(5, 50_000, 30));
    }

    #[test]
    fn decay_halves_every_half_life() {
        assert_eq!(decay_multiplier(0.0, 180.0), 1.0);
        assert_eq!(decay_multiplier(-5.0, 180.0), 1.0);
        assert_eq!(decay_multiplier(90.0, 0.0), 1.0);
        assert!((decay_multiplier(180.0, 180.0) - 0.5).abs() < 1e-12);
        assert!((decay_multiplier(360.0, 180.0) - 0.25).abs() < 1e-12);
        assert_eq!(decayed_total(&[(8_000, 0.0), (8_000, 180.0)], 180.0), 12_000);
        assert_eq!(decayed_total(&[], 180.0), 0);
    }

    #[test]
    fn wallet_score_from_stored_contributions() {
        let db = StateDb::temporary().unwrap();
        let now = 400 * SECS_PER_DAY;
        for (sig, score, day) in [("s1", 8_000u16, 40i64), ("s2", 6_000, 400)] {
            db.insert_contribution(&Contribution {
                transaction_signature: sig.into(),
                wallet_address: "dev".into(),
                task_ref: sig.into(),
                verification_score: score,
                content_hash: String::new(),
                leaf_hash: String::new(),
                tree_address: "tree".into(),
                timestamp: day * SECS_PER_DAY,
            })
            .unwrap();
        }
        let score = contribution_score_for_wallet(&db, "dev", now).unwrap();
        assert_eq!(score.contribution_count, 2);
        assert_eq!(score.time_active_days, 360);
        assert_eq!(score.total_verification_score, 14_000);
        assert_eq!(score.decayed_total, 8_000);
        assert_eq!(score.original_score, contribution_score(2, 14_000, 360));
        assert!(score.decayed_score < score.original_score);

        let empty = contribution_score_for_wallet(&db, "nobody", now).unwrap();
        assert_eq!(empty.original_score, 0);
    }
}
