use gsd_core::notification::EnhancedTransaction;
use gsd_core::types::Timestamp;

/// Per-transaction facts shared by every processor.
#[derive(Debug, Clone, Copy)]
pub struct TxContext<'a> {
    pub signature: &'a str,
    /// Block time when the relay supplied one, otherwise receive time.
    pub now: Timestamp,
    pub tx: &'a EnhancedTransaction,
}

impl<'a> TxContext<'a> {
    pub fn new(signature: &'a str, now: Timestamp, tx: &'a EnhancedTransaction) -> Self {
        Self { signature, now, tx }
    }

    /// Marker for a non-keyed increment applied by instruction `index`.
    pub fn receipt(&self, index: usize) -> String {
        format!("{}#{}", self.signature, index)
    }

    /// Sum of native transfers from `from` to `to`, in lamports.
    pub fn native_paid(&self, from: &str, to: &str) -> u64 {
        self.tx
            .native_transfers
            .iter()
            .filter(|t| t.from_user_account.as_deref() == Some(from) && t.to_user_account.as_deref() == Some(to))
            .fold(0u64, |acc, t| acc.saturating_add(t.amount))
    }
}
