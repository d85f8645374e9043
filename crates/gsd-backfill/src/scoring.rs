use async_trait::async_trait;
use gsd_core::entities::{Contribution, VerificationReport};
use gsd_core::error::GsdError;
use gsd_core::types::{scale_to_on_chain, ReportStatus, Timestamp, VerificationType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Work products recovered for a historical contribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    pub plan: String,
    pub code_diff: String,
    pub test_results: String,
    pub file_list: Vec<String>,
}

/// Looks up whatever artifacts still exist for a contribution.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// `Ok(None)` when nothing is recoverable.
    async fn recover(&self, contribution: &Contribution) -> Result<Option<Artifacts>, GsdError>;
}

/// Source for deployments that kept no artifacts: every record is legacy.
pub struct NoArtifacts;

#[async_trait]
impl ArtifactSource for NoArtifacts {
    async fn recover(&self, _contribution: &Contribution) -> Result<Option<Artifacts>, GsdError> {
        Ok(None)
    }
}

/// Per-category scores, each 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub code_quality: f64,
    pub task_fulfillment: f64,
    pub test_coverage: f64,
    pub workflow_discipline: f64,
    pub plan_adherence: f64,
}

/// Structured output of the external scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredReport {
    pub categories: CategoryScores,
    /// 0–100.
    pub confidence: f64,
    #[serde(default)]
    pub summary: String,
}

/// The external model call, treated as a black box.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, task_ref: &str, artifacts: &Artifacts) -> Result<ScoredReport, GsdError>;
}

/// Scorer for deployments without a model endpoint. Every call fails, so
/// recoverable records are counted as failed and retried on the next run.
pub struct NoScorer;

#[async_trait]
impl Scorer for NoScorer {
    async fn score(&self, task_ref: &str, _artifacts: &Artifacts) -> Result<ScoredReport, GsdError> {
        Err(GsdError::Scoring(format!("no scorer configured for {task_ref}")))
    }
}

/// Category weights on the 0–10_000 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub code_quality: u32,
    pub task_fulfillment: u32,
    pub test_coverage: u32,
    pub workflow_discipline: u32,
    pub plan_adherence: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            code_quality: 2_500,
            task_fulfillment: 2_000,
            test_coverage: 1_500,
            workflow_discipline: 2_500,
            plan_adherence: 1_500,
        }
    }
}

/// Weighted mean of the clamped category scores, rounded to a whole 0–100.
pub fn weighted_score(scores: &CategoryScores, weights: &ScoringWeights) -> f64 {
    let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
    let pairs = [
        (scores.code_quality, weights.code_quality),
        (scores.task_fulfillment, weights.task_fulfillment),
        (scores.test_coverage, weights.test_coverage),
        (scores.workflow_discipline, weights.workflow_discipline),
        (scores.plan_adherence, weights.plan_adherence),
    ];
    let total: u32 = pairs.iter().map(|&(_, w)| w).sum();
    if total == 0 {
        return 0.0;
    }
    let sum: f64 = pairs.iter().map(|&(s, w)| clamp(s) * w as f64).sum();
    (sum / total as f64).round().clamp(0.0, 100.0)
}

/// Hex SHA-256 of the report JSON. Object keys serialize sorted, so equal
/// reports hash equally.
pub fn report_hash(report: &serde_json::Value) -> String {
    hex::encode(Sha256::digest(report.to_string().as_bytes()))
}

/// Off-chain report preserving the contribution's original score.
pub fn legacy_report(contribution: &Contribution, now: Timestamp) -> VerificationReport {
    let body = serde_json::json!({
        "type": "legacy",
        "reason": "contribution predates verification and has no recoverable artifacts",
        "originalScore": contribution.verification_score,
    });
    VerificationReport {
        transaction_signature: None,
        on_chain_address: None,
        wallet_address: contribution.wallet_address.clone(),
        task_ref: contribution.task_ref.clone(),
        verification_type: VerificationType::Legacy,
        overall_score: contribution.verification_score,
        confidence: 0,
        report_hash: report_hash(&body),
        status: ReportStatus::Completed,
        created_at: now,
        completed_at: Some(now),
    }
}

/// Off-chain `ai` report from a scorer result.
pub fn ai_report(
    contribution: &Contribution,
    scored: &ScoredReport,
    weights: &ScoringWeights,
    now: Timestamp,
) -> VerificationReport {
    let overall = scale_to_on_chain(weighted_score(&scored.categories, weights));
    let confidence = scale_to_on_chain(scored.confidence);
    let status = ReportStatus::for_confidence(confidence);
    let body = serde_json::to_value(scored).unwrap_or(serde_json::Value::Null);
    VerificationReport {
        transaction_signature: None,
        on_chain_address: None,
        wallet_address: contribution.wallet_address.clone(),
        task_ref: contribution.task_ref.clone(),
        verification_type: VerificationType::Ai,
        overall_score: overall,
        confidence,
        report_hash: report_hash(&body),
        status,
        created_at: now,
        completed_at: (status == ReportStatus::Completed).then_some(now),
    }
}
