use std::sync::Arc;

use gsd_codec::{decode_base58, name_of_bytes, Instruction};
use gsd_core::constants::DISCRIMINATOR_LEN;
use gsd_core::error::GsdError;
use gsd_core::notification::EnhancedTransaction;
use gsd_state::StateDb;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::IndexerConfig;
use crate::context::TxContext;
use crate::detection::record_inflow;
use crate::processors;

/// Outcome counts for one dispatched transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    /// Instructions addressed to the program.
    pub instructions: u64,
    pub processed: u64,
    /// Data that failed base58 or argument decoding.
    pub skipped_decode: u64,
    /// Discriminators outside the registry.
    pub unknown: u64,
    /// Events referencing an entity not indexed yet.
    pub referential_misses: u64,
    pub failed: u64,
    pub contributions: u64,
    pub inflows: u64,
}

impl DispatchStats {
    pub fn merge(&mut self, other: &DispatchStats) {
        self.instructions += other.instructions;
        self.processed += other.processed;
        self.skipped_decode += other.skipped_decode;
        self.unknown += other.unknown;
        self.referential_misses += other.referential_misses;
        self.failed += other.failed;
        self.contributions += other.contributions;
        self.inflows += other.inflows;
    }

    fn counters(&self) -> [(&'static str, u64); 8] {
        [
            ("stats:instructions", self.instructions),
            ("stats:processed", self.processed),
            ("stats:skipped_decode", self.skipped_decode),
            ("stats:unknown", self.unknown),
            ("stats:referential_misses", self.referential_misses),
            ("stats:failed", self.failed),
            ("stats:contributions", self.contributions),
            ("stats:inflows", self.inflows),
        ]
    }
}

/// Lifetime totals persisted in the meta tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerStats {
    pub transactions: u64,
    pub totals: DispatchStats,
}

/// Routes the program instructions of each notified transaction to their
/// processors.
pub struct Dispatcher {
    db: Arc<StateDb>,
    config: IndexerConfig,
}

impl Dispatcher {
    pub fn new(db: Arc<StateDb>, config: IndexerConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn db(&self) -> &Arc<StateDb> {
        &self.db
    }

    /// Dispatch every program instruction of `tx`, then record any
    /// contribution leaf and treasury inflow it carries.
    ///
    /// Per-instruction failures are logged and counted, never returned.
    /// Errors are limited to a missing signature and storage failures
    /// outside instruction processing.
    pub fn process_transaction(&self, tx: &EnhancedTransaction) -> Result<DispatchStats, GsdError> {
        let signature = match tx.signature.as_deref() {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Err(GsdError::Other("notification without a signature".into())),
        };
        let now = tx.timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
        let ctx = TxContext::new(signature, now, tx);
        let mut stats = DispatchStats::default();

        for (index, ix) in tx.instructions.iter().enumerate() {
            if ix.program_id != self.config.program_id {
                continue;
            }
            stats.instructions += 1;

            let data = match decode_base58(&ix.data) {
                Ok(data) if data.len() >= DISCRIMINATOR_LEN => data,
                Ok(data) => {
                    debug!(%signature, index, len = data.len(), "instruction data shorter than a discriminator");
                    stats.skipped_decode += 1;
                    continue;
                }
                Err(e) => {
                    debug!(%signature, index, error = %e, "instruction data not base58");
                    stats.skipped_decode += 1;
                    continue;
                }
            };

            let (discriminator, args) = data.split_at(DISCRIMINATOR_LEN);
            let Some(name) = name_of_bytes(discriminator) else {
                trace!(%signature, index, discriminator = %hex::encode(discriminator), "unmapped discriminator");
                stats.unknown += 1;
                continue;
            };

            let decoded = match Instruction::decode(name, args, &ix.accounts) {
                Ok(decoded) => decoded,
                Err(e) => {
                    debug!(%signature, instruction = name, error = %e, "instruction decode failed");
                    stats.skipped_decode += 1;
                    continue;
                }
            };

            match processors::apply(&self.db, &ctx, index, &decoded) {
                Ok(()) => stats.processed += 1,
                Err(e) if e.is_referential_miss() => {
                    warn!(%signature, instruction = name, error = %e, "referenced entity not indexed; skipping");
                    stats.referential_misses += 1;
                }
                Err(e) => {
                    warn!(%signature, instruction = name, error = %e, "instruction processing failed");
                    stats.failed += 1;
                }
            }
        }

        match processors::record_leaf(&self.db, &self.config, &ctx) {
            Ok(true) => stats.contributions += 1,
            Ok(false) => {}
            Err(e) => warn!(%signature, error = %e, "contribution leaf not recorded"),
        }
        match record_inflow(&self.db, &self.config, &ctx) {
            Ok(true) => stats.inflows += 1,
            Ok(false) => {}
            Err(e) => warn!(%signature, error = %e, "treasury inflow not recorded"),
        }

        self.db.increment_counter("stats:transactions", 1)?;
        for (name, by) in stats.counters() {
            if by > 0 {
                self.db.increment_counter(name, by)?;
            }
        }
        info!(
            %signature,
            instructions = stats.instructions,
            processed = stats.processed,
            skipped = stats.skipped_decode + stats.unknown,
            misses = stats.referential_misses,
            failed = stats.failed,
            "transaction dispatched"
        );
        Ok(stats)
    }

    pub fn stats(&self) -> Result<IndexerStats, GsdError> {
        let c = |name: &str| self.db.counter(name);
        Ok(IndexerStats {
            transactions: c("stats:transactions")?,
            totals: DispatchStats {
                instructions: c("stats:instructions")?,
                processed: c("stats:processed")?,
                skipped_decode: c("stats:skipped_decode")?,
                unknown: c("stats:unknown")?,
                referential_misses: c("stats:referential_misses")?,
                failed: c("stats:failed")?,
                contributions: c("stats:contributions")?,
                inflows: c("stats:inflows")?,
            },
        })
    }
}
