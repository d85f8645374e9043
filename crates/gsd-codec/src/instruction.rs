//! The gsd-hub instruction set as closed, typed enums.
//!
//! `Instruction::decode` turns a registry name, the argument bytes that
//! follow the discriminator, and the instruction's account list into a
//! variant carrying exactly the fields its processor needs. Account
//! positions follow the program's account structs.

use gsd_core::constants::{CONTRIBUTION_LEAF_LEN, MAX_ORIGIN_SIGNATURE_LEN};
use gsd_core::error::GsdError;
use gsd_core::types::{Pubkey, QuorumType, RevenueToken, VerificationType, VoteChoice};

use crate::discriminator::sha256;
use crate::reader::FieldReader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernanceIx {
    InitConfig,
    UpdateConfig,
    CreateRound {
        round: String,
        submission_start: i64,
        submission_end: i64,
        voting_end: i64,
        quorum_type: QuorumType,
        content_hash: [u8; 32],
    },
    SubmitIdea {
        round: String,
        idea: String,
        author: String,
        content_hash: [u8; 32],
    },
    TransitionRound {
        round: String,
    },
    CastVote {
        idea: String,
        vote_record: String,
        voter: String,
        vote: VoteChoice,
    },
    DepositTokens {
        wallet: String,
        amount: u64,
    },
    WithdrawTokens {
        wallet: String,
        amount: u64,
    },
    RelinquishVote {
        voter: String,
    },
    VetoIdea {
        idea: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegationIx {
    DelegateVote {
        record: String,
        delegator: String,
        delegate: String,
        amount: u64,
    },
    RevokeDelegation {
        delegator: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevenueIx {
    InitConfig,
    RecordEvent {
        event: String,
        origin_signature: String,
        amount: u64,
        token: RevenueToken,
    },
    ClaimShare {
        event: String,
        claim: String,
        claimant: String,
        vault: Option<String>,
    },
    ExecuteBurn {
        event: String,
        gsd_amount: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationIx {
    InitConfig,
    SubmitVerification {
        report: String,
        developer: String,
        task_ref: [u8; 32],
        score: u16,
        confidence: u16,
        report_hash: [u8; 32],
        verification_type: VerificationType,
    },
    SubmitPeerReview {
        reviewer: String,
        report: String,
        review: String,
        score: u16,
        passed: bool,
        review_hash: [u8; 32],
    },
    FinalizePeerVerification {
        report: String,
        final_score: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionIx {
    InitTree,
    /// The leaf itself travels in a noop inner instruction.
    Record { tree: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Governance(GovernanceIx),
    Delegation(DelegationIx),
    Revenue(RevenueIx),
    Verification(VerificationIx),
    Contribution(ContributionIx),
}

fn account(accounts: &[String], instruction: &'static str, index: usize) -> Result<String, GsdError> {
    accounts
        .get(index)
        .cloned()
        .ok_or(GsdError::MissingAccount { instruction, index })
}

impl Instruction {
    /// Decode the arguments of the instruction registered under `name`.
    pub fn decode(name: &str, args: &[u8], accounts: &[String]) -> Result<Self, GsdError> {
        let r = FieldReader::new(args);
        let ix = match name {
            // ── Governance ──────────────────────────────────────────────────
            "init_governance_config" => Instruction::Governance(GovernanceIx::InitConfig),
            "update_governance_config" => Instruction::Governance(GovernanceIx::UpdateConfig),
            "create_round" => Instruction::Governance(GovernanceIx::CreateRound {
                round: account(accounts, "create_round", 1)?,
                submission_start: r.i64(0)?,
                submission_end: r.i64(8)?,
                voting_end: r.i64(16)?,
                quorum_type: QuorumType::from_tag(r.u8(24)?)?,
                content_hash: r.hash32(25)?,
            }),
            "submit_idea" => Instruction::Governance(GovernanceIx::SubmitIdea {
                round: account(accounts, "submit_idea", 0)?,
                idea: account(accounts, "submit_idea", 1)?,
                author: account(accounts, "submit_idea", 2)?,
                content_hash: r.hash32(0)?,
            }),
            "transition_round" => Instruction::Governance(GovernanceIx::TransitionRound {
                round: account(accounts, "transition_round", 0)?,
            }),
            "cast_vote" => Instruction::Governance(GovernanceIx::CastVote {
                idea: account(accounts, "cast_vote", 0)?,
                vote_record: account(accounts, "cast_vote", 2)?,
                voter: account(accounts, "cast_vote", 4)?,
                vote: VoteChoice::from_tag(r.u8(0)?)?,
            }),
            "deposit_tokens" => Instruction::Governance(GovernanceIx::DepositTokens {
                wallet: account(accounts, "deposit_tokens", 2)?,
                amount: r.u64(0)?,
            }),
            "withdraw_tokens" => Instruction::Governance(GovernanceIx::WithdrawTokens {
                wallet: account(accounts, "withdraw_tokens", 2)?,
                amount: r.u64(0)?,
            }),
            "relinquish_vote" => Instruction::Governance(GovernanceIx::RelinquishVote {
                voter: account(accounts, "relinquish_vote", 3)?,
            }),
            "veto_idea" => Instruction::Governance(GovernanceIx::VetoIdea {
                idea: account(accounts, "veto_idea", 0)?,
            }),

            // ── Delegation ──────────────────────────────────────────────────
            "delegate_vote" => Instruction::Delegation(DelegationIx::DelegateVote {
                record: account(accounts, "delegate_vote", 2)?,
                delegator: account(accounts, "delegate_vote", 3)?,
                delegate: account(accounts, "delegate_vote", 4)?,
                amount: r.u64(0)?,
            }),
            "revoke_delegation" => Instruction::Delegation(DelegationIx::RevokeDelegation {
                delegator: account(accounts, "revoke_delegation", 1)?,
            }),

            // ── Revenue ─────────────────────────────────────────────────────
            "init_revenue_config" => Instruction::Revenue(RevenueIx::InitConfig),
            "record_revenue_event" => {
                let (origin_signature, next) = r.string(0, MAX_ORIGIN_SIGNATURE_LEN)?;
                Instruction::Revenue(RevenueIx::RecordEvent {
                    event: account(accounts, "record_revenue_event", 1)?,
                    origin_signature,
                    amount: r.u64(next)?,
                    token: RevenueToken::from_tag(r.u8(next + 8)?)?,
                })
            }
            "claim_revenue_share" => Instruction::Revenue(RevenueIx::ClaimShare {
                event: account(accounts, "claim_revenue_share", 0)?,
                claim: account(accounts, "claim_revenue_share", 1)?,
                claimant: account(accounts, "claim_revenue_share", 3)?,
                vault: accounts.get(4).cloned(),
            }),
            "execute_burn" => Instruction::Revenue(RevenueIx::ExecuteBurn {
                event: account(accounts, "execute_burn", 0)?,
                gsd_amount: r.u64(0).ok(),
            }),

            // ── Verification ────────────────────────────────────────────────
            "init_verification_config" => Instruction::Verification(VerificationIx::InitConfig),
            "submit_verification" => Instruction::Verification(VerificationIx::SubmitVerification {
                report: account(accounts, "submit_verification", 3)?,
                developer: account(accounts, "submit_verification", 1)?,
                task_ref: r.hash32(0)?,
                score: r.u16(32)?,
                confidence: r.u16(34)?,
                report_hash: r.hash32(36)?,
                verification_type: VerificationType::from_tag(r.u8(68)?)?,
            }),
            "submit_peer_review" => Instruction::Verification(VerificationIx::SubmitPeerReview {
                reviewer: account(accounts, "submit_peer_review", 0)?,
                report: account(accounts, "submit_peer_review", 1)?,
                review: account(accounts, "submit_peer_review", 2)?,
                score: r.u16(0)?,
                passed: r.bool(2)?,
                review_hash: r.hash32(3)?,
            }),
            "finalize_peer_verification" => {
                Instruction::Verification(VerificationIx::FinalizePeerVerification {
                    report: account(accounts, "finalize_peer_verification", 1)?,
                    final_score: r.u16(0)?,
                })
            }

            // ── Contributions ───────────────────────────────────────────────
            "init_contribution_tree" => Instruction::Contribution(ContributionIx::InitTree),
            "record_contribution" => Instruction::Contribution(ContributionIx::Record {
                tree: accounts.get(1).cloned(),
            }),

            other => return Err(GsdError::UnknownInstruction(other.to_string())),
        };
        Ok(ix)
    }

    /// Registry name of this instruction.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Governance(ix) => match ix {
                GovernanceIx::InitConfig => "init_governance_config",
                GovernanceIx::UpdateConfig => "update_governance_config",
                GovernanceIx::CreateRound { .. } => "create_round",
                GovernanceIx::SubmitIdea { .. } => "submit_idea",
                GovernanceIx::TransitionRound { .. } => "transition_round",
                GovernanceIx::CastVote { .. } => "cast_vote",
                GovernanceIx::DepositTokens { .. } => "deposit_tokens",
                GovernanceIx::WithdrawTokens { .. } => "withdraw_tokens",
                GovernanceIx::RelinquishVote { .. } => "relinquish_vote",
                GovernanceIx::VetoIdea { .. } => "veto_idea",
            },
            Instruction::Delegation(ix) => match ix {
                DelegationIx::DelegateVote { .. } => "delegate_vote",
                DelegationIx::RevokeDelegation { .. } => "revoke_delegation",
            },
            Instruction::Revenue(ix) => match ix {
                RevenueIx::InitConfig => "init_revenue_config",
                RevenueIx::RecordEvent { .. } => "record_revenue_event",
                RevenueIx::ClaimShare { .. } => "claim_revenue_share",
                RevenueIx::ExecuteBurn { .. } => "execute_burn",
            },
            Instruction::Verification(ix) => match ix {
                VerificationIx::InitConfig => "init_verification_config",
                VerificationIx::SubmitVerification { .. } => "submit_verification",
                VerificationIx::SubmitPeerReview { .. } => "submit_peer_review",
                VerificationIx::FinalizePeerVerification { .. } => "finalize_peer_verification",
            },
            Instruction::Contribution(ix) => match ix {
                ContributionIx::InitTree => "init_contribution_tree",
                ContributionIx::Record { .. } => "record_contribution",
            },
        }
    }
}

// ── Contribution leaves ───────────────────────────────────────────────────────

/// 106-byte leaf logged through the noop program when a contribution is
/// appended to the compressed tree.
///
/// Layout: developer `[0..32]`, task_ref `[32..64]`, score u16 @64,
/// timestamp i64 @66, content_hash `[74..106]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionLeaf {
    pub developer: Pubkey,
    pub task_ref: [u8; 32],
    pub verification_score: u16,
    pub timestamp: i64,
    pub content_hash: [u8; 32],
    /// SHA-256 of the serialized leaf.
    pub leaf_hash: [u8; 32],
}

impl ContributionLeaf {
    /// Parse a leaf; anything that is not exactly 106 bytes is not a leaf.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != CONTRIBUTION_LEAF_LEN {
            return None;
        }
        let r = FieldReader::new(bytes);
        Some(Self {
            developer: Pubkey::from_bytes(r.hash32(0).ok()?),
            task_ref: r.hash32(32).ok()?,
            verification_score: r.u16(64).ok()?,
            timestamp: r.i64(66).ok()?,
            content_hash: r.hash32(74).ok()?,
            leaf_hash: sha256(bytes),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CONTRIBUTION_LEAF_LEN);
        buf.extend_from_slice(self.developer.as_bytes());
        buf.extend_from_slice(&self.task_ref);
        buf.extend_from_slice(&self.verification_score.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.content_hash);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("acct{i}")).collect()
    }

    #[test]
    fn create_round_layout() {
        let mut args = Vec::new();
        args.extend_from_slice(&100i64.to_le_bytes());
        args.extend_from_slice(&200i64.to_le_bytes());
        args.extend_from_slice(&300i64.to_le_bytes());
        args.push(1);
        args.extend_from_slice(&[9u8; 32]);
        let ix = Instruction::decode("create_round", &args, &accounts(4)).unwrap();
        assert_eq!(
            ix,
            Instruction::Governance(GovernanceIx::CreateRound {
                round: "acct1".into(),
                submission_start: 100,
                submission_end: 200,
                voting_end: 300,
                quorum_type: QuorumType::Treasury,
                content_hash: [9u8; 32],
            })
        );
        assert_eq!(ix.name(), "create_round");
    }

    #[test]
    fn cast_vote_positions() {
        let ix = Instruction::decode("cast_vote", &[2], &accounts(6)).unwrap();
        match ix {
            Instruction::Governance(GovernanceIx::CastVote { idea, vote_record, voter, vote }) => {
                assert_eq!((idea.as_str(), vote_record.as_str(), voter.as_str()), ("acct0", "acct2", "acct4"));
                assert_eq!(vote, VoteChoice::Abstain);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn record_revenue_event_follows_string_prefix() {
        let origin = "5KtPn1origin";
        let mut args = Vec::new();
        args.extend_from_slice(&(origin.len() as u32).to_le_bytes());
        args.extend_from_slice(origin.as_bytes());
        args.extend_from_slice(&10_000_000_000u64.to_le_bytes());
        args.push(0);
        let ix = Instruction::decode("record_revenue_event", &args, &accounts(5)).unwrap();
        assert_eq!(
            ix,
            Instruction::Revenue(RevenueIx::RecordEvent {
                event: "acct1".into(),
                origin_signature: origin.into(),
                amount: 10_000_000_000,
                token: RevenueToken::Sol,
            })
        );
    }

    #[test]
    fn submit_verification_layout() {
        let mut args = vec![7u8; 32];
        args.extend_from_slice(&8_500u16.to_le_bytes());
        args.extend_from_slice(&5_000u16.to_le_bytes());
        args.extend_from_slice(&[3u8; 32]);
        args.push(1);
        let ix = Instruction::decode("submit_verification", &args, &accounts(5)).unwrap();
        match ix {
            Instruction::Verification(VerificationIx::SubmitVerification {
                report, developer, score, confidence, verification_type, ..
            }) => {
                assert_eq!(report, "acct3");
                assert_eq!(developer, "acct1");
                assert_eq!((score, confidence), (8_500, 5_000));
                assert_eq!(verification_type, VerificationType::Peer);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn submit_peer_review_layout() {
        let mut args = Vec::new();
        args.extend_from_slice(&7_200u16.to_le_bytes());
        args.push(1);
        args.extend_from_slice(&[4u8; 32]);
        let ix = Instruction::decode("submit_peer_review", &args, &accounts(4)).unwrap();
        assert_eq!(
            ix,
            Instruction::Verification(VerificationIx::SubmitPeerReview {
                reviewer: "acct0".into(),
                report: "acct1".into(),
                review: "acct2".into(),
                score: 7_200,
                passed: true,
                review_hash: [4u8; 32],
            })
        );
    }

    #[test]
    fn short_payloads_and_accounts_fail() {
        assert!(matches!(
            Instruction::decode("deposit_tokens", &[1, 2, 3], &accounts(3)),
            Err(GsdError::Truncated { .. })
        ));
        assert!(matches!(
            Instruction::decode("cast_vote", &[0], &accounts(2)),
            Err(GsdError::MissingAccount { instruction: "cast_vote", index: 2 })
        ));
        assert!(matches!(
            Instruction::decode("cast_vote", &[7], &accounts(6)),
            Err(GsdError::InvalidEnumTag { .. })
        ));
        assert!(matches!(
            Instruction::decode("mint_nft", &[], &[]),
            Err(GsdError::UnknownInstruction(_))
        ));
    }

    #[test]
    fn execute_burn_amount_is_optional() {
        let ix = Instruction::decode("execute_burn", &[], &accounts(1)).unwrap();
        assert_eq!(ix, Instruction::Revenue(RevenueIx::ExecuteBurn { event: "acct0".into(), gsd_amount: None }));
        let ix = Instruction::decode("execute_burn", &55u64.to_le_bytes(), &accounts(1)).unwrap();
        assert_eq!(ix, Instruction::Revenue(RevenueIx::ExecuteBurn { event: "acct0".into(), gsd_amount: Some(55) }));
    }

    #[test]
    fn every_registered_name_decodes_to_itself() {
        let args = vec![0u8; 128];
        for name in crate::discriminator::INSTRUCTION_NAMES {
            let payload: Vec<u8> = if *name == "record_revenue_event" {
                let mut p = 1u32.to_le_bytes().to_vec();
                p.push(b'x');
                p.extend_from_slice(&[0u8; 9]);
                p
            } else {
                args.clone()
            };
            let ix = Instruction::decode(name, &payload, &accounts(6)).unwrap();
            assert_eq!(ix.name(), *name);
        }
    }

    #[test]
    fn contribution_leaf_parse() {
        let leaf = ContributionLeaf {
            developer: Pubkey::from_bytes([1u8; 32]),
            task_ref: [2u8; 32],
            verification_score: 9_100,
            timestamp: 1_700_000_000,
            content_hash: [3u8; 32],
            leaf_hash: [0u8; 32],
        };
        let bytes = leaf.to_bytes();
        assert_eq!(bytes.len(), CONTRIBUTION_LEAF_LEN);
        let parsed = ContributionLeaf::parse(&bytes).unwrap();
        assert_eq!(parsed.developer, leaf.developer);
        assert_eq!(parsed.verification_score, 9_100);
        assert_eq!(parsed.timestamp, 1_700_000_000);
        assert_eq!(parsed.leaf_hash, sha256(&bytes));
        assert!(ContributionLeaf::parse(&bytes[..105]).is_none());
    }
}
