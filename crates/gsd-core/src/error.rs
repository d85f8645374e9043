use thiserror::Error;

#[derive(Debug, Error)]
pub enum GsdError {
    // ── Decode errors ────────────────────────────────────────────────────────
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("instruction data truncated: need {needed} bytes at offset {offset}, have {len}")]
    Truncated { offset: usize, needed: usize, len: usize },

    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    #[error("string length {len} out of range (max {max})")]
    StringLength { len: usize, max: usize },

    #[error("invalid {field} tag: {tag}")]
    InvalidEnumTag { field: &'static str, tag: u8 },

    #[error("{instruction}: missing account at index {index}")]
    MissingAccount { instruction: &'static str, index: usize },

    #[error("unknown instruction discriminator: {0}")]
    UnknownInstruction(String),

    // ── Referential misses ───────────────────────────────────────────────────
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    // ── Settlement errors ────────────────────────────────────────────────────
    #[error("swap quote failed: {0}")]
    Quote(String),

    #[error("swap build failed: {0}")]
    SwapBuild(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("transaction submit failed: {0}")]
    Submit(String),

    #[error("confirmation failed: {0}")]
    Confirm(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    // ── Backfill errors ──────────────────────────────────────────────────────
    #[error("a backfill run is already in progress")]
    BackfillInProgress,

    #[error("scoring failed: {0}")]
    Scoring(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    // ── General ──────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl GsdError {
    /// Decode-class failures are expected when scanning a program's full
    /// instruction surface and are logged at debug level only.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            GsdError::InvalidBase58(_)
                | GsdError::Truncated { .. }
                | GsdError::InvalidUtf8
                | GsdError::StringLength { .. }
                | GsdError::InvalidEnumTag { .. }
                | GsdError::MissingAccount { .. }
        )
    }

    /// Entity referenced by an event is not indexed yet.
    pub fn is_referential_miss(&self) -> bool {
        matches!(self, GsdError::NotFound { .. })
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        GsdError::NotFound { entity, key: key.into() }
    }
}
