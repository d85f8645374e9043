use gsd_codec::VerificationIx;
use gsd_core::entities::{PeerReview, VerificationReport};
use gsd_core::error::GsdError;
use gsd_core::types::{ReportStatus, ReviewerTier};
use gsd_state::StateDb;
use tracing::{debug, info};

use crate::context::TxContext;

pub(super) fn apply(db: &StateDb, ctx: &TxContext, ix: &VerificationIx) -> Result<(), GsdError> {
    match ix {
        VerificationIx::InitConfig => {
            info!(signature = ctx.signature, "verification config instruction observed");
            Ok(())
        }
        VerificationIx::SubmitVerification {
            report,
            developer,
            task_ref,
            score,
            confidence,
            report_hash,
            verification_type,
        } => {
            let status = ReportStatus::for_confidence(*confidence);
            let record = VerificationReport {
                transaction_signature: Some(ctx.signature.to_string()),
                on_chain_address: Some(report.clone()),
                wallet_address: developer.clone(),
                task_ref: hex::encode(task_ref),
                verification_type: *verification_type,
                overall_score: *score,
                confidence: *confidence,
                report_hash: hex::encode(report_hash),
                status,
                created_at: ctx.now,
                completed_at: (status == ReportStatus::Completed).then_some(ctx.now),
            };
            let (_, created) = db.upsert_report(&record)?;
            info!(
                signature = ctx.signature,
                developer = %developer,
                score,
                confidence,
                ?status,
                created,
                "verification report indexed"
            );
            Ok(())
        }
        VerificationIx::SubmitPeerReview { reviewer, report, review, score, passed, review_hash } => {
            let target = db
                .get_report_by_address(report)?
                .ok_or_else(|| GsdError::not_found("verification report", report.clone()))?;
            let tier = db.get_reviewer(reviewer)?.map(|p| p.tier).unwrap_or(ReviewerTier::Explorer);
            let record = PeerReview {
                report_key: target.key(),
                reviewer_wallet: reviewer.clone(),
                on_chain_address: review.clone(),
                tier,
                score: *score,
                passed: *passed,
                review_hash: hex::encode(review_hash),
                transaction_signature: ctx.signature.to_string(),
                created_at: ctx.now,
            };
            if db.record_peer_review(&record)? {
                info!(
                    signature = ctx.signature,
                    report = %report,
                    reviewer = %reviewer,
                    tier = tier.name(),
                    score,
                    passed,
                    "peer review indexed"
                );
            } else {
                debug!(report = %report, reviewer = %reviewer, "peer review already indexed");
            }
            Ok(())
        }
        VerificationIx::FinalizePeerVerification { report, final_score } => {
            let target = db
                .get_report_by_address(report)?
                .ok_or_else(|| GsdError::not_found("verification report", report.clone()))?;
            let now = ctx.now;
            db.update_report(&target.key(), |r| {
                r.overall_score = *final_score;
                r.status = ReportStatus::Completed;
                if r.completed_at.is_none() {
                    r.completed_at = Some(now);
                }
            })?;
            info!(signature = ctx.signature, report = %report, final_score, "peer verification finalized");
            Ok(())
        }
    }
}
