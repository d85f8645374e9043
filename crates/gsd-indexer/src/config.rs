use gsd_core::constants::{GSD_PROGRAM_ID, NOOP_PROGRAM_ID, USDC_MINT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Program whose instructions are decoded.
    pub program_id: String,
    /// Program carrying contribution leaves as inner instructions.
    pub noop_program_id: String,
    /// Inflow detection is off when unset.
    pub treasury_address: Option<String>,
    pub usdc_mint: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            program_id: GSD_PROGRAM_ID.to_string(),
            noop_program_id: NOOP_PROGRAM_ID.to_string(),
            treasury_address: None,
            usdc_mint: USDC_MINT.to_string(),
        }
    }
}
