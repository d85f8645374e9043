use gsd_core::entities::{PendingRevenue, RevenueClaim, RevenueEvent};
use gsd_core::error::GsdError;
use sled::Transactional;

use crate::db::{
    abort, from_tx, get, insert_if_absent, list, list_prefix, pair_key, storage, tx_get,
    tx_next_seq, tx_put, update, StateDb,
};

impl StateDb {
    // ── Revenue events ────────────────────────────────────────────────────────

    /// Upsert by origin signature. A new event gets the next event index;
    /// an existing one only gains its on-chain address if it lacked one.
    /// Returns the stored event and whether it was created.
    pub fn upsert_revenue_event(&self, event: &RevenueEvent) -> Result<(RevenueEvent, bool), GsdError> {
        (&self.revenue_events, &self.revenue_addresses, &self.meta)
            .transaction(|(events, addresses, meta)| {
                let key = event.origin_signature.as_bytes();
                let (stored, created) = match tx_get::<RevenueEvent>(events, key)? {
                    Some(mut existing) => {
                        if existing.on_chain_address.is_none() && event.on_chain_address.is_some() {
                            existing.on_chain_address = event.on_chain_address.clone();
                            tx_put(events, key, &existing)?;
                        }
                        (existing, false)
                    }
                    None => {
                        let mut fresh = event.clone();
                        fresh.event_index = tx_next_seq(meta, "seq:revenue_events")?;
                        tx_put(events, key, &fresh)?;
                        (fresh, true)
                    }
                };
                if let Some(address) = &stored.on_chain_address {
                    addresses.insert(address.as_bytes(), key)?;
                }
                Ok((stored, created))
            })
            .map_err(from_tx)
    }

    pub fn get_revenue_event(&self, origin_signature: &str) -> Result<Option<RevenueEvent>, GsdError> {
        get(&self.revenue_events, origin_signature.as_bytes())
    }

    pub fn get_revenue_event_by_address(&self, address: &str) -> Result<Option<RevenueEvent>, GsdError> {
        match self.revenue_addresses.get(address.as_bytes()).map_err(storage)? {
            Some(origin) => get(&self.revenue_events, &origin),
            None => Ok(None),
        }
    }

    pub fn update_revenue_event<F: FnMut(&mut RevenueEvent)>(
        &self,
        origin_signature: &str,
        f: F,
    ) -> Result<Option<RevenueEvent>, GsdError> {
        update(&self.revenue_events, origin_signature.as_bytes(), f)
    }

    /// All events, newest index first.
    pub fn list_revenue_events(&self) -> Result<Vec<RevenueEvent>, GsdError> {
        let mut events: Vec<RevenueEvent> = list(&self.revenue_events)?;
        events.sort_by(|a, b| b.event_index.cmp(&a.event_index));
        Ok(events)
    }

    // ── Claims ────────────────────────────────────────────────────────────────

    /// Insert the claim keyed by (event address, claimant) and add its
    /// amount to the event's claimed total, capped at the developer pool.
    /// Returns `false` on redelivery.
    ///
    /// Fails with `NotFound` when the event address is not indexed.
    pub fn record_claim(&self, claim: &RevenueClaim) -> Result<bool, GsdError> {
        (&self.revenue_claims, &self.revenue_events, &self.revenue_addresses)
            .transaction(|(claims, events, addresses)| {
                let claim_key = pair_key(&claim.event_address, &claim.claimant_wallet);
                if claims.get(&claim_key)?.is_some() {
                    return Ok(false);
                }
                let Some(origin) = addresses.get(claim.event_address.as_bytes())? else {
                    return abort(GsdError::not_found("revenue event", claim.event_address.clone()));
                };
                let Some(mut event) = tx_get::<RevenueEvent>(events, &origin)? else {
                    return abort(GsdError::not_found("revenue event", claim.event_address.clone()));
                };
                event.claimed_amount = event
                    .claimed_amount
                    .saturating_add(claim.amount)
                    .min(event.developer_pool);
                tx_put(claims, &claim_key, claim)?;
                tx_put(events, &origin, &event)?;
                Ok(true)
            })
            .map_err(from_tx)
    }

    pub fn list_claims(&self, event_address: &str) -> Result<Vec<RevenueClaim>, GsdError> {
        list_prefix(&self.revenue_claims, event_address)
    }

    // ── Pending inflows ───────────────────────────────────────────────────────

    /// Returns `true` when the inflow was newly recorded.
    pub fn insert_pending_revenue(&self, pending: &PendingRevenue) -> Result<bool, GsdError> {
        insert_if_absent(&self.pending_revenue, pending.transaction_signature.as_bytes(), pending)
    }

    pub fn get_pending_revenue(&self, signature: &str) -> Result<Option<PendingRevenue>, GsdError> {
        get(&self.pending_revenue, signature.as_bytes())
    }

    /// Inflows not yet promoted, oldest first.
    pub fn list_pending_revenue(&self) -> Result<Vec<PendingRevenue>, GsdError> {
        let mut out: Vec<PendingRevenue> = list::<PendingRevenue>(&self.pending_revenue)?
            .into_iter()
            .filter(|p| !p.promoted)
            .collect();
        out.sort_by_key(|p| p.detected_at);
        Ok(out)
    }

    pub fn mark_pending_promoted(&self, signature: &str) -> Result<Option<PendingRevenue>, GsdError> {
        update(&self.pending_revenue, signature.as_bytes(), |p: &mut PendingRevenue| {
            p.promoted = true;
        })
    }
}
