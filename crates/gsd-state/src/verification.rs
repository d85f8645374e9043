use gsd_core::entities::{Contribution, PeerReview, ReviewerProfile, VerificationReport};
use gsd_core::error::GsdError;
use gsd_core::types::{ReportStatus, Timestamp};
use sled::Transactional;

use crate::db::{
    from_tx, get, insert_if_absent, list, list_prefix, pair_key, put, storage, tx_get, tx_put,
    update, upsert, StateDb,
};

impl StateDb {
    // ── Reports ───────────────────────────────────────────────────────────────

    /// Upsert by `VerificationReport::key()` and refresh the address and
    /// task indexes. On update only the scoring fields are replaced, and
    /// only while the stored report is not yet completed.
    pub fn upsert_report(&self, report: &VerificationReport) -> Result<(VerificationReport, bool), GsdError> {
        let key = report.key();
        (&self.reports, &self.report_addresses, &self.report_tasks)
            .transaction(|(reports, addresses, tasks)| {
                let (stored, created) = match tx_get::<VerificationReport>(reports, key.as_bytes())? {
                    Some(mut existing) => {
                        // A completed report is final; stale redeliveries never reopen it.
                        if existing.status != ReportStatus::Completed {
                            existing.overall_score = report.overall_score;
                            existing.confidence = report.confidence;
                            existing.report_hash = report.report_hash.clone();
                            existing.status = report.status;
                            existing.completed_at = report.completed_at;
                        }
                        if existing.on_chain_address.is_none() {
                            existing.on_chain_address = report.on_chain_address.clone();
                        }
                        tx_put(reports, key.as_bytes(), &existing)?;
                        (existing, false)
                    }
                    None => {
                        tx_put(reports, key.as_bytes(), report)?;
                        (report.clone(), true)
                    }
                };
                if let Some(address) = &stored.on_chain_address {
                    addresses.insert(address.as_bytes(), key.as_bytes())?;
                }
                let task_key = VerificationReport::task_key(&stored.task_ref, &stored.wallet_address);
                tasks.insert(task_key.as_bytes(), key.as_bytes())?;
                Ok((stored, created))
            })
            .map_err(from_tx)
    }

    pub fn get_report(&self, key: &str) -> Result<Option<VerificationReport>, GsdError> {
        get(&self.reports, key.as_bytes())
    }

    pub fn get_report_by_address(&self, address: &str) -> Result<Option<VerificationReport>, GsdError> {
        match self.report_addresses.get(address.as_bytes()).map_err(storage)? {
            Some(key) => get(&self.reports, &key),
            None => Ok(None),
        }
    }

    /// Resolve a report by signature key first, then by on-chain address.
    pub fn resolve_report(&self, key_or_address: &str) -> Result<Option<VerificationReport>, GsdError> {
        match self.get_report(key_or_address)? {
            Some(r) => Ok(Some(r)),
            None => self.get_report_by_address(key_or_address),
        }
    }

    pub fn find_report_for_task(&self, task_ref: &str, wallet: &str) -> Result<Option<VerificationReport>, GsdError> {
        let task_key = VerificationReport::task_key(task_ref, wallet);
        match self.report_tasks.get(task_key.as_bytes()).map_err(storage)? {
            Some(key) => get(&self.reports, &key),
            None => Ok(None),
        }
    }

    pub fn update_report<F: FnMut(&mut VerificationReport)>(
        &self,
        key: &str,
        f: F,
    ) -> Result<Option<VerificationReport>, GsdError> {
        update(&self.reports, key.as_bytes(), f)
    }

    pub fn list_reports(&self) -> Result<Vec<VerificationReport>, GsdError> {
        list(&self.reports)
    }

    /// Reports authored by `wallet`, newest first.
    pub fn reports_for_wallet(&self, wallet: &str) -> Result<Vec<VerificationReport>, GsdError> {
        let mut out: Vec<VerificationReport> = list::<VerificationReport>(&self.reports)?
            .into_iter()
            .filter(|r| r.wallet_address == wallet)
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    // ── Peer reviews ──────────────────────────────────────────────────────────

    /// Insert the review keyed by (report, reviewer) and bump the
    /// reviewer's `total_reviews`, creating an Explorer profile when the
    /// reviewer is new. Returns `false` on redelivery.
    pub fn record_peer_review(&self, review: &PeerReview) -> Result<bool, GsdError> {
        (&self.peer_reviews, &self.reviewers)
            .transaction(|(reviews, reviewers)| {
                let review_key = pair_key(&review.report_key, &review.reviewer_wallet);
                if reviews.get(&review_key)?.is_some() {
                    return Ok(false);
                }
                let wallet = review.reviewer_wallet.as_bytes();
                let mut profile = tx_get::<ReviewerProfile>(reviewers, wallet)?
                    .unwrap_or_else(|| ReviewerProfile::new(review.reviewer_wallet.clone(), review.created_at));
                profile.total_reviews += 1;
                profile.updated_at = review.created_at;
                tx_put(reviews, &review_key, review)?;
                tx_put(reviewers, wallet, &profile)?;
                Ok(true)
            })
            .map_err(from_tx)
    }

    pub fn list_peer_reviews(&self, report_key: &str) -> Result<Vec<PeerReview>, GsdError> {
        list_prefix(&self.peer_reviews, report_key)
    }

    // ── Reviewer profiles ─────────────────────────────────────────────────────

    pub fn get_reviewer(&self, wallet: &str) -> Result<Option<ReviewerProfile>, GsdError> {
        get(&self.reviewers, wallet.as_bytes())
    }

    pub fn put_reviewer(&self, profile: &ReviewerProfile) -> Result<(), GsdError> {
        put(&self.reviewers, profile.wallet_address.as_bytes(), profile)
    }

    /// Apply `f` to the reviewer's profile, creating a fresh one first.
    pub fn upsert_reviewer<F: FnMut(&mut ReviewerProfile)>(
        &self,
        wallet: &str,
        now: Timestamp,
        mut f: F,
    ) -> Result<ReviewerProfile, GsdError> {
        let (profile, _) = upsert(
            &self.reviewers,
            wallet.as_bytes(),
            || ReviewerProfile::new(wallet, now),
            |p: &mut ReviewerProfile| {
                f(p);
                p.updated_at = now;
            },
        )?;
        Ok(profile)
    }

    pub fn list_reviewers(&self) -> Result<Vec<ReviewerProfile>, GsdError> {
        list(&self.reviewers)
    }

    // ── Contributions ─────────────────────────────────────────────────────────

    /// Returns `true` when the contribution was newly recorded.
    pub fn insert_contribution(&self, contribution: &Contribution) -> Result<bool, GsdError> {
        insert_if_absent(
            &self.contributions,
            contribution.transaction_signature.as_bytes(),
            contribution,
        )
    }

    pub fn get_contribution(&self, signature: &str) -> Result<Option<Contribution>, GsdError> {
        get(&self.contributions, signature.as_bytes())
    }

    /// All contributions, oldest first.
    pub fn list_contributions(&self) -> Result<Vec<Contribution>, GsdError> {
        let mut out: Vec<Contribution> = list(&self.contributions)?;
        out.sort_by_key(|c| c.timestamp);
        Ok(out)
    }

    pub fn contributions_for_wallet(&self, wallet: &str) -> Result<Vec<Contribution>, GsdError> {
        Ok(self
            .list_contributions()?
            .into_iter()
            .filter(|c| c.wallet_address == wallet)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::temp_db;
    use gsd_core::types::{ReviewerTier, VerificationType};

    fn report(sig: Option<&str>, task: &str, wallet: &str, created_at: Timestamp) -> VerificationReport {
        VerificationReport {
            transaction_signature: sig.map(String::from),
            on_chain_address: sig.map(|s| format!("pda-{s}")),
            wallet_address: wallet.into(),
            task_ref: task.into(),
            verification_type: VerificationType::Ai,
            overall_score: 5_000,
            confidence: 4_000,
            report_hash: "aa".into(),
            status: ReportStatus::Pending,
            created_at,
            completed_at: None,
        }
    }

    fn review(report: &str, reviewer: &str) -> PeerReview {
        PeerReview {
            report_key: report.into(),
            reviewer_wallet: reviewer.into(),
            on_chain_address: format!("rv-{reviewer}"),
            tier: ReviewerTier::Explorer,
            score: 7_000,
            passed: true,
            review_hash: "bb".into(),
            transaction_signature: format!("sig-{reviewer}"),
            created_at: 9,
        }
    }

    #[test]
    fn report_indexes_resolve_every_key() {
        let db = temp_db("reports_index");
        let (_, created) = db.upsert_report(&report(Some("s1"), "t1", "dev", 1)).unwrap();
        assert!(created);
        assert_eq!(db.get_report_by_address("pda-s1").unwrap().unwrap().task_ref, "t1");
        assert_eq!(db.resolve_report("pda-s1").unwrap().unwrap().key(), "s1");
        assert!(db.find_report_for_task("t1", "dev").unwrap().is_some());

        let mut again = report(Some("s1"), "t1", "dev", 1);
        again.overall_score = 9_000;
        let (stored, created) = db.upsert_report(&again).unwrap();
        assert!(!created);
        assert_eq!(stored.overall_score, 9_000);
    }

    #[test]
    fn completed_report_survives_stale_update() {
        let db = temp_db("reports_completed");
        db.upsert_report(&report(Some("s1"), "t1", "dev", 1)).unwrap();
        db.update_report("s1", |r| {
            r.overall_score = 8_100;
            r.status = ReportStatus::Completed;
            r.completed_at = Some(7);
        })
        .unwrap();

        let (stored, created) = db.upsert_report(&report(Some("s1"), "t1", "dev", 1)).unwrap();
        assert!(!created);
        assert_eq!(stored.status, ReportStatus::Completed);
        assert_eq!((stored.overall_score, stored.completed_at), (8_100, Some(7)));
        assert_eq!(db.get_report("s1").unwrap().unwrap(), stored);
    }

    #[test]
    fn offchain_reports_key_by_task() {
        let db = temp_db("reports_offchain");
        db.upsert_report(&report(None, "t2", "dev", 1)).unwrap();
        assert!(db.get_report("t2:dev").unwrap().is_some());
        db.upsert_report(&report(Some("s3"), "t3", "dev", 5)).unwrap();
        let mine = db.reports_for_wallet("dev").unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].task_ref, "t3");
    }

    #[test]
    fn peer_review_counts_once() {
        let db = temp_db("peer_reviews");
        assert!(db.record_peer_review(&review("s1", "r1")).unwrap());
        assert!(!db.record_peer_review(&review("s1", "r1")).unwrap());
        assert!(db.record_peer_review(&review("s2", "r1")).unwrap());
        let profile = db.get_reviewer("r1").unwrap().unwrap();
        assert_eq!(profile.total_reviews, 2);
        assert_eq!(profile.tier, ReviewerTier::Explorer);
        assert_eq!(profile.review_quality_score, 1.0);
        assert_eq!(db.list_peer_reviews("s1").unwrap().len(), 1);
    }

    #[test]
    fn reviewer_upsert_applies_to_new_profiles() {
        let db = temp_db("reviewer_upsert");
        let p = db
            .upsert_reviewer("w", 3, |p| {
                p.verified_contributions += 1;
            })
            .unwrap();
        assert_eq!(p.verified_contributions, 1);
        let p = db.upsert_reviewer("w", 4, |p| p.verified_contributions += 1).unwrap();
        assert_eq!((p.verified_contributions, p.updated_at), (2, 4));
        assert_eq!(db.list_reviewers().unwrap().len(), 1);
    }

    #[test]
    fn contributions_insert_once() {
        let db = temp_db("contributions");
        let c = Contribution {
            transaction_signature: "s".into(),
            wallet_address: "dev".into(),
            task_ref: "ab".into(),
            verification_score: 8_000,
            content_hash: "cd".into(),
            leaf_hash: "ef".into(),
            tree_address: "tree".into(),
            timestamp: 1,
        };
        assert!(db.insert_contribution(&c).unwrap());
        assert!(!db.insert_contribution(&c).unwrap());
        assert_eq!(db.contributions_for_wallet("dev").unwrap().len(), 1);
        assert!(db.get_contribution("s").unwrap().is_some());
    }
}
