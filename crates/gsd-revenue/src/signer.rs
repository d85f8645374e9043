use std::path::Path;

use ed25519_dalek::{Signer, SigningKey};
use gsd_core::error::GsdError;
use gsd_core::types::Pubkey;

use crate::settlement::TransactionSigner;

const SIGNATURE_LEN: usize = 64;

/// Ed25519 burn-authority key.
pub struct KeypairSigner {
    key: SigningKey,
}

impl KeypairSigner {
    pub fn from_signing_key(key: SigningKey) -> Self {
        Self { key }
    }

    /// Accepts a 64-byte keypair (secret followed by public key) or a bare
    /// 32-byte secret.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, GsdError> {
        let key = match bytes.len() {
            64 => {
                let mut pair = [0u8; 64];
                pair.copy_from_slice(bytes);
                SigningKey::from_keypair_bytes(&pair).map_err(|e| GsdError::InvalidKey(e.to_string()))?
            }
            32 => {
                let mut secret = [0u8; 32];
                secret.copy_from_slice(bytes);
                SigningKey::from_bytes(&secret)
            }
            n => return Err(GsdError::InvalidKey(format!("expected 32 or 64 key bytes, got {n}"))),
        };
        Ok(Self { key })
    }

    pub fn from_base58(secret: &str) -> Result<Self, GsdError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| GsdError::InvalidKey(e.to_string()))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Solana CLI key file: a JSON array of bytes.
    pub fn from_json_file(path: &Path) -> Result<Self, GsdError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GsdError::InvalidKey(format!("{}: {e}", path.display())))?;
        let bytes: Vec<u8> =
            serde_json::from_str(&text).map_err(|e| GsdError::InvalidKey(format!("{}: {e}", path.display())))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Load from either a key file path or a base58 secret.
    pub fn load(source: &str) -> Result<Self, GsdError> {
        let path = Path::new(source);
        if path.is_file() {
            Self::from_json_file(path)
        } else {
            Self::from_base58(source)
        }
    }
}

/// Solana compact-u16 length prefix. Returns (value, bytes consumed).
fn read_shortvec(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut value = 0usize;
    for (i, byte) in bytes.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        Pubkey::from_bytes(self.key.verifying_key().to_bytes())
    }

    /// The wire format is `shortvec(n) || n × 64-byte signatures || message`.
    /// The message is signed and the signature written to slot 0, which
    /// belongs to the fee payer.
    fn sign_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>, GsdError> {
        let (count, prefix) =
            read_shortvec(unsigned).ok_or_else(|| GsdError::Signing("bad signature count".into()))?;
        if count == 0 {
            return Err(GsdError::Signing("transaction has no signature slots".into()));
        }
        let message_start = prefix + count * SIGNATURE_LEN;
        if unsigned.len() <= message_start {
            return Err(GsdError::Signing(format!(
                "transaction too short: {} bytes, message starts at {message_start}",
                unsigned.len()
            )));
        }
        let signature = self.key.sign(&unsigned[message_start..]);
        let mut signed = unsigned.to_vec();
        signed[prefix..prefix + SIGNATURE_LEN].copy_from_slice(&signature.to_bytes());
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn signer() -> KeypairSigner {
        KeypairSigner::from_secret_bytes(&[3u8; 32]).unwrap()
    }

    #[test]
    fn keypair_and_secret_forms_agree() {
        let a = signer();
        let pair = a.key.to_keypair_bytes();
        let b = KeypairSigner::from_secret_bytes(&pair).unwrap();
        assert_eq!(a.pubkey(), b.pubkey());
        let c = KeypairSigner::from_base58(&bs58::encode(pair).into_string()).unwrap();
        assert_eq!(a.pubkey(), c.pubkey());
        assert!(KeypairSigner::from_secret_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn json_key_file_loads() {
        let path = std::env::temp_dir().join(format!("gsd_signer_key_{}.json", std::process::id()));
        let pair = signer().key.to_keypair_bytes().to_vec();
        std::fs::write(&path, serde_json::to_string(&pair).unwrap()).unwrap();
        let loaded = KeypairSigner::load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.pubkey(), signer().pubkey());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn signs_message_into_first_slot() {
        let message = b"versioned message bytes".to_vec();
        let mut tx = vec![2u8];
        tx.extend_from_slice(&[0u8; 128]);
        tx.extend_from_slice(&message);

        let s = signer();
        let signed = s.sign_transaction(&tx).unwrap();
        assert_eq!(signed.len(), tx.len());
        assert_eq!(&signed[65..129], &[0u8; 64]);

        let sig = Signature::from_slice(&signed[1..65]).unwrap();
        s.key.verifying_key().verify(&message, &sig).unwrap();
    }

    #[test]
    fn rejects_malformed_transactions() {
        let s = signer();
        assert!(s.sign_transaction(&[]).is_err());
        assert!(s.sign_transaction(&[0]).is_err());
        assert!(s.sign_transaction(&[1, 0, 0]).is_err());
    }

    #[test]
    fn shortvec_multibyte() {
        assert_eq!(read_shortvec(&[0x05]), Some((5, 1)));
        assert_eq!(read_shortvec(&[0x80, 0x01]), Some((128, 2)));
        assert_eq!(read_shortvec(&[0x80]), None);
    }
}
