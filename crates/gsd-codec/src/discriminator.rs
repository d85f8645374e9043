use std::collections::HashMap;

use gsd_core::constants::{DISCRIMINATOR_LEN, DISCRIMINATOR_NAMESPACE};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

/// Every gsd-hub instruction the indexer routes.
pub const INSTRUCTION_NAMES: &[&str] = &[
    // governance
    "init_governance_config",
    "update_governance_config",
    "create_round",
    "submit_idea",
    "transition_round",
    "cast_vote",
    "deposit_tokens",
    "withdraw_tokens",
    "relinquish_vote",
    "veto_idea",
    // delegation
    "delegate_vote",
    "revoke_delegation",
    // revenue
    "init_revenue_config",
    "record_revenue_event",
    "claim_revenue_share",
    "execute_burn",
    // verification
    "init_verification_config",
    "submit_verification",
    "submit_peer_review",
    "finalize_peer_verification",
    // contributions
    "init_contribution_tree",
    "record_contribution",
];

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

/// Compute SHA-256 of arbitrary bytes → 32-byte array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// First 8 bytes of SHA-256("global:" + name).
pub fn discriminator_of(name: &str) -> Discriminator {
    let digest = sha256(format!("{DISCRIMINATOR_NAMESPACE}{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

static REGISTRY: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    INSTRUCTION_NAMES
        .iter()
        .map(|name| (hex::encode(discriminator_of(name)), *name))
        .collect()
});

/// Look up an instruction name by its hex-encoded discriminator.
pub fn name_of(discriminator_hex: &str) -> Option<&'static str> {
    REGISTRY.get(&discriminator_hex.to_ascii_lowercase()).copied()
}

/// Look up an instruction name by raw discriminator bytes.
pub fn name_of_bytes(discriminator: &[u8]) -> Option<&'static str> {
    name_of(&hex::encode(discriminator))
}

/// Base58 instruction data for `name` with the given argument bytes, as it
/// appears in a relay notification.
pub fn encode_instruction_data(name: &str, args: &[u8]) -> String {
    let mut data = discriminator_of(name).to_vec();
    data.extend_from_slice(args);
    bs58::encode(data).into_string()
}
