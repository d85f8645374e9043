use gsd_core::error::GsdError;

/// Decode base58 text (Bitcoin alphabet). Each leading `1` becomes a
/// leading zero byte.
pub fn decode_base58(s: &str) -> Result<Vec<u8>, GsdError> {
    bs58::decode(s)
        .into_vec()
        .map_err(|e| GsdError::InvalidBase58(e.to_string()))
}

/// Encode bytes as base58 text. Each leading zero byte becomes a `1`.
pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}
