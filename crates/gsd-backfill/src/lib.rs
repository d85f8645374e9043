//! gsd-backfill: re-scores historical contributions that never went
//! through live verification.
//!
//! [`BackfillRunner`] owns the job state: one run at a time, fixed-size
//! batches with a pause between them, and cooperative cancellation checked
//! before every batch and every item.

pub mod runner;
pub mod scoring;

pub use runner::{BackfillConfig, BackfillRunner, BackfillState, BackfillStatus};
pub use scoring::{
    ai_report, legacy_report, report_hash, weighted_score, ArtifactSource, Artifacts, CategoryScores,
    NoArtifacts, NoScorer, ScoredReport, Scorer, ScoringWeights,
};
