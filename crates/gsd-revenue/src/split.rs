use gsd_core::constants::{
    BPS_DENOMINATOR, BURN_BPS, DEVELOPER_POOL_BPS, MAINTENANCE_BPS, TREASURY_RESERVE_BPS,
};
use gsd_core::entities::RevenueEvent;
use gsd_core::types::{Amount, RevenueStatus, RevenueToken, Timestamp};
use serde::{Deserialize, Serialize};

/// Four-way split of a revenue amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSplit {
    pub developer_pool: Amount,
    pub treasury_reserve: Amount,
    pub burn_amount: Amount,
    pub maintenance_amount: Amount,
}

impl RevenueSplit {
    pub fn total(&self) -> u128 {
        self.developer_pool as u128
            + self.treasury_reserve as u128
            + self.burn_amount as u128
            + self.maintenance_amount as u128
    }
}

fn share(total: Amount, bps: u64) -> Amount {
    // Each share is at most `total`, so the narrowing is lossless.
    (total as u128 * bps as u128 / BPS_DENOMINATOR as u128) as Amount
}

/// Split `total` 60/20/10/10. Integer division remainders go to the
/// developer pool so the shares always add up to `total`.
pub fn compute_split(total: Amount) -> RevenueSplit {
    let treasury_reserve = share(total, TREASURY_RESERVE_BPS);
    let burn_amount = share(total, BURN_BPS);
    let maintenance_amount = share(total, MAINTENANCE_BPS);
    let developer_floor = share(total, DEVELOPER_POOL_BPS);
    let remainder = total - developer_floor - treasury_reserve - burn_amount - maintenance_amount;
    RevenueSplit {
        developer_pool: developer_floor + remainder,
        treasury_reserve,
        burn_amount,
        maintenance_amount,
    }
}

/// A freshly recorded revenue event for `total` with its split applied.
/// The event index is assigned by the store on insert.
pub fn recorded_event(
    origin_signature: &str,
    on_chain_address: Option<String>,
    token: RevenueToken,
    total: Amount,
    now: Timestamp,
) -> RevenueEvent {
    let split = compute_split(total);
    RevenueEvent {
        event_index: 0,
        on_chain_address,
        origin_signature: origin_signature.to_string(),
        token,
        total_amount: total,
        developer_pool: split.developer_pool,
        treasury_reserve: split.treasury_reserve,
        burn_amount: split.burn_amount,
        maintenance_amount: split.maintenance_amount,
        status: RevenueStatus::Recorded,
        gsd_burned: 0,
        burn_signature: None,
        claimed_amount: 0,
        recorded_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_sol_split() {
        let s = compute_split(10_000_000_000);
        assert_eq!(s.developer_pool, 6_000_000_000);
        assert_eq!(s.treasury_reserve, 2_000_000_000);
        assert_eq!(s.burn_amount, 1_000_000_000);
        assert_eq!(s.maintenance_amount, 1_000_000_000);
    }

    #[test]
    fn remainder_goes_to_developers() {
        let s = compute_split(9);
        assert_eq!((s.developer_pool, s.treasury_reserve, s.burn_amount, s.maintenance_amount), (8, 1, 0, 0));
        let s = compute_split(1);
        assert_eq!(s.developer_pool, 1);
    }

    #[test]
    fn shares_always_sum_to_total() {
        for total in [0, 1, 7, 99, 10_001, 123_456_789, 999_999_999_999, u64::MAX] {
            let s = compute_split(total);
            assert_eq!(s.total(), total as u128, "total {total}");
            assert!(s.developer_pool >= share(total, DEVELOPER_POOL_BPS));
        }
    }

    #[test]
    fn recorded_event_carries_split() {
        let e = recorded_event("origin", None, RevenueToken::Usdc, 1_000, 5);
        assert_eq!(e.status, RevenueStatus::Recorded);
        assert_eq!(e.developer_pool + e.treasury_reserve + e.burn_amount + e.maintenance_amount, 1_000);
        assert_eq!(e.burn_signature, None);
    }
}
