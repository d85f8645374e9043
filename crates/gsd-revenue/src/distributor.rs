use std::sync::Arc;

use gsd_core::entities::RevenueEvent;
use gsd_core::error::GsdError;
use gsd_core::types::{Amount, RevenueToken, Timestamp};
use gsd_state::StateDb;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::settlement::{BurnResult, SettlementEngine};
use crate::split::recorded_event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub event: RevenueEvent,
    pub created: bool,
    pub burn: Option<BurnResult>,
}

/// Records revenue events and runs the follow-on buy-and-burn.
pub struct RevenueDistributor {
    db: Arc<StateDb>,
    settlement: Option<Arc<SettlementEngine>>,
}

impl RevenueDistributor {
    pub fn new(db: Arc<StateDb>, settlement: Option<Arc<SettlementEngine>>) -> Self {
        Self { db, settlement }
    }

    /// Persist the split event as `recorded`, then attempt the burn.
    ///
    /// The burn runs only while the event has no burn signature, so a
    /// repeated call re-drives a failed burn without burning twice. Burn
    /// failures never fail the distribution.
    pub async fn distribute(
        &self,
        origin_signature: &str,
        total: Amount,
        token: RevenueToken,
        now: Timestamp,
    ) -> Result<Distribution, GsdError> {
        let draft = recorded_event(origin_signature, None, token, total, now);
        let (mut event, created) = self.db.upsert_revenue_event(&draft)?;
        info!(
            origin = origin_signature,
            event_index = event.event_index,
            %token,
            total,
            created,
            "revenue event recorded"
        );

        let Some(engine) = &self.settlement else {
            debug!(origin = origin_signature, "buy-and-burn disabled");
            return Ok(Distribution { event, created, burn: None });
        };
        if event.burn_amount == 0 || event.burn_signature.is_some() {
            return Ok(Distribution { event, created, burn: None });
        }

        let burn = engine.buy_and_burn(event.token, event.burn_amount).await;
        match &burn {
            Some(result) => {
                let updated = self.db.update_revenue_event(origin_signature, |e| {
                    e.burn_signature = Some(result.signature.clone());
                    e.gsd_burned = result.gsd_burned;
                })?;
                if let Some(updated) = updated {
                    event = updated;
                }
            }
            None => warn!(
                origin = origin_signature,
                event_index = event.event_index,
                "burn failed; event stays recorded"
            ),
        }
        Ok(Distribution { event, created, burn })
    }

    /// Run a detected inflow through `distribute` and mark it promoted.
    /// Returns `None` for an unknown signature.
    pub async fn promote_pending(&self, signature: &str, now: Timestamp) -> Result<Option<Distribution>, GsdError> {
        let Some(pending) = self.db.get_pending_revenue(signature)? else {
            return Ok(None);
        };
        let distribution = self.distribute(signature, pending.amount, pending.token, now).await?;
        self.db.mark_pending_promoted(signature)?;
        Ok(Some(distribution))
    }
}
