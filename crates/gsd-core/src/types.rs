use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{SCORE_SCALE, CONFIDENCE_THRESHOLD};
use crate::error::GsdError;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Token amount in base units (lamports or 10^-6 USDC).
pub type Amount = u64;

// ── Pubkey ───────────────────────────────────────────────────────────────────

/// 32-byte ed25519 public key / program-derived address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base-58 encoded string representation.
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Result<Self, GsdError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| GsdError::InvalidBase58(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| GsdError::InvalidKey(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_b58();
        write!(f, "Pubkey({})", &s[..s.len().min(8)])
    }
}

// ── Governance enums ─────────────────────────────────────────────────────────

/// Lifecycle of an idea round. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Open,
    Voting,
    Closed,
}

impl RoundStatus {
    /// Status reached by one `transition_round`, or `None` when the round
    /// cannot advance from here.
    pub fn next(self) -> Option<Self> {
        match self {
            RoundStatus::Open => Some(RoundStatus::Voting),
            RoundStatus::Voting => Some(RoundStatus::Closed),
            RoundStatus::Closed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumType {
    Small,
    Treasury,
    ParameterChange,
}

impl QuorumType {
    pub fn from_tag(tag: u8) -> Result<Self, GsdError> {
        match tag {
            0 => Ok(QuorumType::Small),
            1 => Ok(QuorumType::Treasury),
            2 => Ok(QuorumType::ParameterChange),
            _ => Err(GsdError::InvalidEnumTag { field: "quorum_type", tag }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Submitted,
    Approved,
    Rejected,
    Vetoed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

impl VoteChoice {
    pub fn from_tag(tag: u8) -> Result<Self, GsdError> {
        match tag {
            0 => Ok(VoteChoice::Yes),
            1 => Ok(VoteChoice::No),
            2 => Ok(VoteChoice::Abstain),
            _ => Err(GsdError::InvalidEnumTag { field: "vote", tag }),
        }
    }
}

// ── Revenue enums ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueToken {
    Sol,
    Usdc,
}

impl RevenueToken {
    pub fn from_tag(tag: u8) -> Result<Self, GsdError> {
        match tag {
            0 => Ok(RevenueToken::Sol),
            1 => Ok(RevenueToken::Usdc),
            _ => Err(GsdError::InvalidEnumTag { field: "token", tag }),
        }
    }
}

impl fmt::Display for RevenueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevenueToken::Sol => write!(f, "sol"),
            RevenueToken::Usdc => write!(f, "usdc"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueStatus {
    Recorded,
    Distributing,
    Completed,
}

// ── Verification enums ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    Ai,
    Peer,
    /// Historical record with no recoverable artifacts.
    Legacy,
}

impl VerificationType {
    /// Only `ai` and `peer` are encodable on-chain.
    pub fn from_tag(tag: u8) -> Result<Self, GsdError> {
        match tag {
            0 => Ok(VerificationType::Ai),
            1 => Ok(VerificationType::Peer),
            _ => Err(GsdError::InvalidEnumTag { field: "verification_type", tag }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Completed,
}

impl ReportStatus {
    /// Low-confidence reports stay pending so they can be peer reviewed.
    pub fn for_confidence(confidence: u16) -> Self {
        if confidence < CONFIDENCE_THRESHOLD {
            ReportStatus::Pending
        } else {
            ReportStatus::Completed
        }
    }
}

/// Reviewer seniority. The discriminant is the on-chain tier number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerTier {
    Explorer = 1,
    Builder = 2,
    Architect = 3,
}

impl ReviewerTier {
    pub fn from_u8(tier: u8) -> Result<Self, GsdError> {
        match tier {
            1 => Ok(ReviewerTier::Explorer),
            2 => Ok(ReviewerTier::Builder),
            3 => Ok(ReviewerTier::Architect),
            _ => Err(GsdError::InvalidEnumTag { field: "tier", tag: tier }),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Consensus weight: 1× / 2× / 3×.
    pub fn weight(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            ReviewerTier::Explorer => "Explorer",
            ReviewerTier::Builder => "Builder",
            ReviewerTier::Architect => "Architect",
        }
    }

    /// Share of the reviewed contribution's score credited to the reviewer, in bps.
    pub fn reward_rate_bps(self) -> u64 {
        match self {
            ReviewerTier::Explorer => 1_500,
            ReviewerTier::Builder => 2_000,
            ReviewerTier::Architect => 2_500,
        }
    }
}

/// Clamp a 0–100 score and scale it to the on-chain 0–10_000 range.
pub fn scale_to_on_chain(score: f64) -> u16 {
    let clamped = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
    (clamped * 100.0).round().min(SCORE_SCALE as f64) as u16
}
