//! Enhanced-transaction notifications as delivered by the relay webhook.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedTransaction {
    /// Missing signatures are rejected by the webhook before dispatch.
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub instructions: Vec<NotifiedInstruction>,
    #[serde(default)]
    pub native_transfers: Vec<NativeTransfer>,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedInstruction {
    pub program_id: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Base58-encoded instruction data.
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub inner_instructions: Vec<InnerInstruction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerInstruction {
    pub program_id: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransfer {
    #[serde(default)]
    pub from_user_account: Option<String>,
    #[serde(default)]
    pub to_user_account: Option<String>,
    /// Lamports.
    #[serde(default)]
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    #[serde(default)]
    pub from_user_account: Option<String>,
    #[serde(default)]
    pub to_user_account: Option<String>,
    #[serde(default)]
    pub mint: String,
    /// UI amount (already divided by the mint's decimals).
    #[serde(default)]
    pub token_amount: f64,
}

/// Webhook bodies are either a single transaction or an array of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NotificationBatch {
    Many(Vec<EnhancedTransaction>),
    One(Box<EnhancedTransaction>),
}

impl NotificationBatch {
    pub fn into_vec(self) -> Vec<EnhancedTransaction> {
        match self {
            NotificationBatch::Many(v) => v,
            NotificationBatch::One(tx) => vec![*tx],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relay_payload() {
        let json = r#"[{
            "signature": "5sig",
            "timestamp": 1700000000,
            "instructions": [{
                "programId": "Prog",
                "accounts": ["a", "b"],
                "data": "3Bxs4h24hBtQy9rw",
                "innerInstructions": [{"programId": "noop", "accounts": [], "data": ""}]
            }],
            "nativeTransfers": [{"fromUserAccount": "x", "toUserAccount": "y", "amount": 5}],
            "tokenTransfers": [{"fromUserAccount": null, "toUserAccount": "y", "mint": "m", "tokenAmount": 1.5}]
        }]"#;
        let batch: NotificationBatch = serde_json::from_str(json).unwrap();
        let txs = batch.into_vec();
        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert_eq!(tx.signature.as_deref(), Some("5sig"));
        assert_eq!(tx.instructions[0].accounts, vec!["a", "b"]);
        assert_eq!(tx.instructions[0].inner_instructions.len(), 1);
        assert_eq!(tx.native_transfers[0].amount, 5);
        assert!(tx.token_transfers[0].from_user_account.is_none());
    }

    #[test]
    fn single_object_body_is_accepted() {
        let batch: NotificationBatch =
            serde_json::from_str(r#"{"instructions": []}"#).unwrap();
        let txs = batch.into_vec();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].signature.is_none());
    }
}
